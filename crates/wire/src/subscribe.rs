//! Subscribe response decoding
//!
//! A subscribe reply is a JSON array of two or three elements:
//!
//! ```text
//! [[msg, msg, ...],"time-token"]
//! [[msg, msg, ...],"time-token","channel,channel,..."]
//! ```
//!
//! The body is not fully parsed as JSON. It is split in place: every
//! top-level separator is overwritten with a NUL, and the caller gets index
//! ranges for the messages and channels. [`ItemCursor`] then walks a range
//! one NUL-terminated item at a time.

use pollsub_core::{TimeToken, TIME_TOKEN_MAX_LEN};
use std::ops::Range;
use thiserror::Error;

/// Shortest body that can hold a valid reply
pub const MIN_SUBSCRIBE_RESPONSE: usize = 5;

/// Why a subscribe body was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Body is shorter than [`MIN_SUBSCRIBE_RESPONSE`]
    #[error("subscribe body of {0} bytes is too short")]
    TooShort(usize),

    /// Body is not UTF-8
    #[error("subscribe body is not UTF-8")]
    NotUtf8,

    /// Body is not a `[...,"..."]` array
    #[error("subscribe body is not an array ending in a string")]
    BadEnvelope,

    /// No `,"` opening the time-token (or channel list) string
    #[error("no string start found before the closing quote")]
    MissingTimeToken,

    /// Time-token does not fit
    #[error("time-token of {0} bytes exceeds {max} bytes", max = TIME_TOKEN_MAX_LEN)]
    TimeTokenTooLong(usize),

    /// First element is not an array
    #[error("message list is not an array")]
    BadMessageArray,

    /// Message list has an open string, dangling escape or unbalanced brackets
    #[error("message list is not balanced")]
    Unbalanced,
}

/// Where the items of a parsed body live in the reply buffer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscribeLayout {
    /// NUL-separated messages
    pub messages: Range<usize>,
    /// NUL-separated channels, empty when the reply names none
    pub channels: Range<usize>,
}

/// Find the opening quote of the string whose closing quote is at `close`.
///
/// The quote must directly follow a comma.
fn find_string_start(body: &[u8], close: usize) -> Option<usize> {
    let i = (1..close).rev().find(|&i| body[i] == b'"')?;
    (body[i - 1] == b',').then_some(i)
}

/// Replace every top-level comma in `items` with a NUL.
///
/// Fails on an open string, a dangling escape or an unbalanced bracket.
fn split_top_level(items: &mut [u8]) -> Result<(), ParseError> {
    let mut escaped = false;
    let mut in_string = false;
    let mut depth: i32 = 0;

    for b in items.iter_mut() {
        if escaped {
            escaped = false;
        } else if *b == b'"' {
            in_string = !in_string;
        } else if in_string {
            escaped = *b == b'\\';
        } else {
            match *b {
                b'[' | b'{' => depth += 1,
                b']' | b'}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(ParseError::Unbalanced);
                    }
                }
                b',' if depth == 0 => *b = 0,
                _ => {}
            }
        }
    }

    if escaped || in_string || depth != 0 {
        return Err(ParseError::Unbalanced);
    }
    Ok(())
}

/// Decode a complete subscribe body in place.
///
/// On success the time-token is replaced with the one in the reply. On
/// failure it is left as it was; the body may have been partly rewritten
/// and must be discarded.
pub fn parse_subscribe_response(
    body: &mut [u8],
    time_token: &mut TimeToken,
) -> Result<SubscribeLayout, ParseError> {
    let len = body.len();
    if len < MIN_SUBSCRIBE_RESPONSE {
        return Err(ParseError::TooShort(len));
    }
    if std::str::from_utf8(body).is_err() {
        return Err(ParseError::NotUtf8);
    }

    // Some servers append two bytes after the closing bracket.
    let mut end = len;
    if body[len - 1] != b']' && len > 2 {
        end -= 2;
    }
    if body[0] != b'[' || body[end - 1] != b']' || body[end - 2] != b'"' {
        return Err(ParseError::BadEnvelope);
    }

    let mut close = end - 2;
    let mut open = find_string_start(body, close).ok_or(ParseError::MissingTimeToken)?;
    body[close] = 0;

    let mut channels = 0..0;
    if body[open - 2] == b'"' {
        for b in &mut body[open + 1..close] {
            if *b == b',' {
                *b = 0;
            }
        }
        channels = open + 1..close;
        close = open - 2;
        body[close] = 0;
        open = find_string_start(body, close).ok_or(ParseError::MissingTimeToken)?;
    }

    let token = open + 1..close;
    if token.len() > TIME_TOKEN_MAX_LEN {
        return Err(ParseError::TimeTokenTooLong(token.len()));
    }

    let list_close = open - 2;
    if list_close < 2 || body[1] != b'[' || body[list_close] != b']' {
        return Err(ParseError::BadMessageArray);
    }
    body[list_close] = 0;
    split_top_level(&mut body[2..list_close])?;

    let token = std::str::from_utf8(&body[token]).map_err(|_| ParseError::NotUtf8)?;
    time_token
        .set(token)
        .map_err(|e| ParseError::TimeTokenTooLong(e.0))?;
    Ok(SubscribeLayout {
        messages: 2..list_close,
        channels,
    })
}

/// Read position within a NUL-separated item range.
///
/// Only moves forward; once exhausted it stays exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemCursor {
    pos: usize,
    end: usize,
}

impl ItemCursor {
    /// Cursor at the start of `range`
    pub fn new(range: Range<usize>) -> Self {
        ItemCursor {
            pos: range.start,
            end: range.end,
        }
    }

    /// Cursor with nothing to read
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if every item has been read
    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    /// Return the item at the cursor and step past its NUL.
    pub fn next_item<'b>(&mut self, buf: &'b [u8]) -> Option<&'b str> {
        if self.is_empty() {
            return None;
        }
        let window = buf.get(self.pos..self.end)?;
        let len = window.iter().position(|&b| b == 0).unwrap_or(window.len());
        let start = self.pos;
        self.pos += len + 1;
        std::str::from_utf8(&buf[start..start + len]).ok()
    }
}
