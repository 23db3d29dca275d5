//! Resumable HTTP/1.1 response reader
//!
//! [`ResponseFramer`] turns a byte stream into a response body held in a
//! fixed reply buffer. It never blocks: [`ResponseFramer::feed`] consumes
//! what it is given, reports how much it used, and says whether the body is
//! complete. Feeding the same stream in any number of pieces gives the same
//! result.
//!
//! ```text
//! StatusLine ──▶ Headers ──┬──▶ FixedBody ─────────────────────────┬──▶ Done
//!                          │                                       │
//!                          └──▶ ChunkSize ──▶ ChunkData ──▶ ChunkEnd
//!                                   ▲                          │   │
//!                                   └──────────────────────────┘   │
//!                                   (size 0) ──────────────────────┘
//! ```
//!
//! Lines (status, headers, chunk sizes) are collected in the caller's line
//! buffer; body bytes go straight into the reply buffer. Nothing is ever
//! written past either buffer's capacity. A header line that does not fit
//! is skipped up to its newline, since the two headers the framer reads are
//! short. Any other oversized input fails with a [`FramingError`].

use crate::buf::FixedBuf;
use thiserror::Error;

/// Response framing violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FramingError {
    /// Status line does not start with `HTTP/1.<digit> `
    #[error("malformed status line")]
    BadStatusLine,

    /// Status line has no numeric status code
    #[error("malformed status code")]
    BadStatusCode,

    /// A status or chunk-size line did not fit in the line buffer
    #[error("line longer than {0} bytes")]
    LineTooLong(usize),

    /// `Content-Length` is not a number
    #[error("malformed Content-Length")]
    BadContentLength,

    /// Declared body length exceeds the reply buffer
    #[error("declared body of {declared} bytes exceeds the {capacity} byte reply buffer")]
    ContentTooLong {
        /// Declared length
        declared: usize,
        /// Reply buffer capacity
        capacity: usize,
    },

    /// Chunk size line is not hexadecimal
    #[error("malformed chunk size")]
    BadChunkSize,

    /// A single chunk is larger than allowed
    #[error("chunk of {size} bytes exceeds the {limit} byte limit")]
    ChunkTooLarge {
        /// Announced chunk size (saturated)
        size: usize,
        /// Largest accepted chunk
        limit: usize,
    },

    /// Chunks add up to more than the reply buffer holds
    #[error("chunked body exceeds the {capacity} byte reply buffer")]
    BodyOverflow {
        /// Reply buffer capacity
        capacity: usize,
    },

    /// Chunk payload is not followed by CRLF
    #[error("chunk not terminated by CRLF")]
    BadChunkTerminator,
}

/// Whether the body is complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// All input was consumed and more is needed
    NeedMore,
    /// The body is complete and NUL-terminated in the reply buffer
    Done,
}

/// Result of one [`ResponseFramer::feed`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fed {
    /// Input bytes consumed
    pub consumed: usize,
    /// Whether the body is complete
    pub progress: Progress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    StatusLine,
    Headers,
    SkipHeader,
    FixedBody,
    ChunkSize,
    ChunkData,
    ChunkEnd,
    Done,
}

/// Resumable response reader
#[derive(Debug, Clone)]
pub struct ResponseFramer {
    phase: Phase,
    status: u16,
    content_length: usize,
    chunked: bool,
    chunk_remaining: usize,
    chunk_end_seen: usize,
}

impl ResponseFramer {
    /// Create a framer waiting for a status line
    pub fn new() -> Self {
        ResponseFramer {
            phase: Phase::StatusLine,
            status: 0,
            content_length: 0,
            chunked: false,
            chunk_remaining: 0,
            chunk_end_seen: 0,
        }
    }

    /// Start reading a new response, emptying both buffers.
    pub fn begin(&mut self, line: &mut FixedBuf, reply: &mut FixedBuf) {
        *self = Self::new();
        line.clear();
        reply.clear();
    }

    /// HTTP status code, `0` until the status line has been read
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Declared `Content-Length` (for chunked bodies, the last chunk size)
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// Whether the body uses chunked transfer encoding
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// Whether the whole body has been read
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Consume response bytes.
    ///
    /// Returns the number of bytes used; bytes after the end of the body are
    /// left unconsumed. `line` must be the same buffer on every call of one
    /// response, as must `reply`.
    pub fn feed(
        &mut self,
        input: &[u8],
        line: &mut FixedBuf,
        reply: &mut FixedBuf,
    ) -> Result<Fed, FramingError> {
        let mut pos = 0;
        loop {
            if self.phase == Phase::Done {
                return Ok(Fed {
                    consumed: pos,
                    progress: Progress::Done,
                });
            }
            if pos == input.len() {
                return Ok(Fed {
                    consumed: pos,
                    progress: Progress::NeedMore,
                });
            }
            let rest = &input[pos..];
            match self.phase {
                Phase::StatusLine | Phase::ChunkSize => {
                    let (used, complete) = read_line(rest, line)?;
                    pos += used;
                    if complete {
                        self.on_line(line, reply)?;
                        line.clear();
                    }
                }
                Phase::Headers => match read_line(rest, line) {
                    Ok((used, complete)) => {
                        pos += used;
                        if complete {
                            self.on_line(line, reply)?;
                            line.clear();
                        }
                    }
                    Err(FramingError::LineTooLong(_)) => {
                        line.clear();
                        self.phase = Phase::SkipHeader;
                    }
                    Err(e) => return Err(e),
                },
                Phase::SkipHeader => match rest.iter().position(|&b| b == b'\n') {
                    Some(i) => {
                        pos += i + 1;
                        self.phase = Phase::Headers;
                    }
                    None => pos += rest.len(),
                },
                Phase::FixedBody => {
                    let take = (self.content_length - reply.len()).min(rest.len());
                    reply
                        .try_extend(&rest[..take])
                        .map_err(|_| FramingError::BodyOverflow {
                            capacity: reply.capacity(),
                        })?;
                    pos += take;
                    if reply.len() == self.content_length {
                        self.finish(reply);
                    }
                }
                Phase::ChunkData => {
                    let take = self.chunk_remaining.min(rest.len());
                    reply
                        .try_extend(&rest[..take])
                        .map_err(|_| FramingError::BodyOverflow {
                            capacity: reply.capacity(),
                        })?;
                    pos += take;
                    self.chunk_remaining -= take;
                    if self.chunk_remaining == 0 {
                        self.chunk_end_seen = 0;
                        self.phase = Phase::ChunkEnd;
                    }
                }
                Phase::ChunkEnd => {
                    let expected = b"\r\n"[self.chunk_end_seen];
                    if rest[0] != expected {
                        return Err(FramingError::BadChunkTerminator);
                    }
                    pos += 1;
                    self.chunk_end_seen += 1;
                    if self.chunk_end_seen == 2 {
                        self.phase = Phase::ChunkSize;
                    }
                }
                Phase::Done => {}
            }
        }
    }

    fn on_line(&mut self, line: &FixedBuf, reply: &mut FixedBuf) -> Result<(), FramingError> {
        match self.phase {
            Phase::StatusLine => {
                self.status = parse_status_line(line.as_bytes())?;
                self.phase = Phase::Headers;
            }
            Phase::Headers => {
                let text = trim_eol(line.as_bytes());
                if text.is_empty() {
                    self.end_of_headers(reply);
                } else {
                    self.on_header(text, reply.capacity())?;
                }
            }
            Phase::ChunkSize => {
                let size = parse_chunk_size(trim_eol(line.as_bytes()))?;
                if size == 0 {
                    self.finish(reply);
                    return Ok(());
                }
                if size > line.capacity() {
                    return Err(FramingError::ChunkTooLarge {
                        size,
                        limit: line.capacity(),
                    });
                }
                if size > reply.remaining() {
                    return Err(FramingError::BodyOverflow {
                        capacity: reply.capacity(),
                    });
                }
                self.content_length = size;
                self.chunk_remaining = size;
                self.phase = Phase::ChunkData;
            }
            _ => {}
        }
        Ok(())
    }

    fn on_header(&mut self, text: &[u8], reply_capacity: usize) -> Result<(), FramingError> {
        let Some(colon) = text.iter().position(|&b| b == b':') else {
            return Ok(());
        };
        let name = &text[..colon];
        let value = trim_spaces(&text[colon + 1..]);
        if name.eq_ignore_ascii_case(b"transfer-encoding") {
            if value.eq_ignore_ascii_case(b"chunked") {
                self.chunked = true;
            }
        } else if name.eq_ignore_ascii_case(b"content-length") {
            let declared = parse_decimal(value).ok_or(FramingError::BadContentLength)?;
            if declared > reply_capacity {
                return Err(FramingError::ContentTooLong {
                    declared,
                    capacity: reply_capacity,
                });
            }
            self.content_length = declared;
        }
        Ok(())
    }

    fn end_of_headers(&mut self, reply: &mut FixedBuf) {
        if self.chunked {
            self.phase = Phase::ChunkSize;
        } else if self.content_length == 0 {
            self.finish(reply);
        } else {
            self.phase = Phase::FixedBody;
        }
    }

    fn finish(&mut self, reply: &mut FixedBuf) {
        reply.terminate();
        self.phase = Phase::Done;
    }
}

impl Default for ResponseFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Append bytes up to and including the next `\n` to `line`.
///
/// Returns the bytes used and whether the line is complete.
fn read_line(input: &[u8], line: &mut FixedBuf) -> Result<(usize, bool), FramingError> {
    let (used, complete) = match input.iter().position(|&b| b == b'\n') {
        Some(i) => (i + 1, true),
        None => (input.len(), false),
    };
    line.try_extend(&input[..used])
        .map_err(|_| FramingError::LineTooLong(line.capacity()))?;
    Ok((used, complete))
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn trim_spaces(mut text: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = text {
        text = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = text {
        text = rest;
    }
    text
}

fn parse_status_line(line: &[u8]) -> Result<u16, FramingError> {
    if line.len() < 9 || !line.starts_with(b"HTTP/1.") || !line[7].is_ascii_digit() || line[8] != b' '
    {
        return Err(FramingError::BadStatusLine);
    }
    let digits = line[9..]
        .iter()
        .take(3)
        .take_while(|b| b.is_ascii_digit())
        .fold(0u16, |acc, &b| acc * 10 + u16::from(b - b'0'));
    if !line.get(9).is_some_and(u8::is_ascii_digit) {
        return Err(FramingError::BadStatusCode);
    }
    Ok(digits)
}

fn parse_decimal(text: &[u8]) -> Option<usize> {
    if text.is_empty() {
        return None;
    }
    text.iter().try_fold(0usize, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(usize::from(b - b'0'))
    })
}

fn parse_chunk_size(text: &[u8]) -> Result<usize, FramingError> {
    let size = match text.iter().position(|&b| b == b';') {
        Some(i) => &text[..i],
        None => text,
    };
    let size = trim_spaces(size);
    if size.is_empty() {
        return Err(FramingError::BadChunkSize);
    }
    size.iter().try_fold(0usize, |acc, &b| {
        let digit = (b as char).to_digit(16).ok_or(FramingError::BadChunkSize)?;
        acc.checked_mul(16)
            .and_then(|v| v.checked_add(digit as usize))
            .ok_or(FramingError::BadChunkSize)
    })
}
