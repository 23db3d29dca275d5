//! Request paths
//!
//! Builders write the path of an outgoing GET into the request buffer:
//!
//! | Operation | Path |
//! |-----------|------|
//! | publish   | `/publish/{pub}/{sub}/0/{channel}/0/{message}` |
//! | subscribe | `/subscribe/{sub}/{channel}/0/{time_token}?{query}&pnsdk={sdk}` |
//! | leave     | `/v2/presence/sub-key/{sub}/channel/{channel}/leave?{query}` |
//!
//! `{query}` is `uuid=U`, `auth=A`, `uuid=U&auth=A` or nothing, depending
//! on which of the two are set. Only the published message is
//! percent-encoded; keys and channels are sent as given.
//!
//! A builder either writes the whole path or leaves the buffer empty.

use crate::buf::{BufferFull, FixedBuf};
use pollsub_core::{KeyPair, TimeToken};

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Optional per-context identity sent as query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity<'a> {
    /// Client identity, sent as `uuid=`
    pub uuid: Option<&'a str>,
    /// Authorization token, sent as `auth=`
    pub auth: Option<&'a str>,
}

/// Check if a byte may appear verbatim in an encoded message.
///
/// RFC 3986 unreserved characters plus `,=:;@[]`.
pub fn is_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'_' | b'.' | b'~' | b',' | b'=' | b':' | b';' | b'@' | b'[' | b']'
        )
}

/// Append `message` percent-encoded.
///
/// Runs of safe bytes are copied in one piece; every other byte becomes a
/// `%XX` triplet. Stops at the first run or triplet that does not fit, with
/// whatever came before it already appended.
pub fn percent_encode_into(buf: &mut FixedBuf, message: &str) -> Result<(), BufferFull> {
    let mut rest = message.as_bytes();
    while !rest.is_empty() {
        let span = rest.iter().take_while(|&&b| is_safe(b)).count();
        if span > 0 {
            buf.try_extend(&rest[..span])?;
            rest = &rest[span..];
        }
        if let Some((&b, tail)) = rest.split_first() {
            buf.try_extend(&[b'%', HEX[(b >> 4) as usize], HEX[(b & 0x0f) as usize]])?;
            rest = tail;
        }
    }
    Ok(())
}

fn write_all<F>(buf: &mut FixedBuf, write: F) -> Result<(), BufferFull>
where
    F: FnOnce(&mut FixedBuf) -> Result<(), BufferFull>,
{
    buf.clear();
    let result = write(buf);
    if result.is_err() {
        buf.clear();
    }
    result
}

fn push_query(buf: &mut FixedBuf, identity: Identity<'_>) -> Result<(), BufferFull> {
    if let Some(uuid) = identity.uuid {
        buf.try_push_str("uuid=")?;
        buf.try_push_str(uuid)?;
    }
    if let Some(auth) = identity.auth {
        if identity.uuid.is_some() {
            buf.try_push_str("&")?;
        }
        buf.try_push_str("auth=")?;
        buf.try_push_str(auth)?;
    }
    Ok(())
}

/// Write a publish path.
pub fn build_publish(
    buf: &mut FixedBuf,
    keys: &KeyPair,
    channel: &str,
    message: &str,
) -> Result<(), BufferFull> {
    write_all(buf, |buf| {
        buf.try_push_str("/publish/")?;
        buf.try_push_str(&keys.publish_key)?;
        buf.try_push_str("/")?;
        buf.try_push_str(&keys.subscribe_key)?;
        buf.try_push_str("/0/")?;
        buf.try_push_str(channel)?;
        buf.try_push_str("/0/")?;
        percent_encode_into(buf, message)
    })
}

/// Write a subscribe path.
pub fn build_subscribe(
    buf: &mut FixedBuf,
    subscribe_key: &str,
    channel: &str,
    time_token: &TimeToken,
    identity: Identity<'_>,
    pnsdk: &str,
) -> Result<(), BufferFull> {
    write_all(buf, |buf| {
        buf.try_push_str("/subscribe/")?;
        buf.try_push_str(subscribe_key)?;
        buf.try_push_str("/")?;
        buf.try_push_str(channel)?;
        buf.try_push_str("/0/")?;
        buf.try_push_str(time_token.as_str())?;
        buf.try_push_str("?")?;
        push_query(buf, identity)?;
        buf.try_push_str("&pnsdk=")?;
        buf.try_push_str(pnsdk)
    })
}

/// Write a leave path.
pub fn build_leave(
    buf: &mut FixedBuf,
    subscribe_key: &str,
    channel: &str,
    identity: Identity<'_>,
) -> Result<(), BufferFull> {
    write_all(buf, |buf| {
        buf.try_push_str("/v2/presence/sub-key/")?;
        buf.try_push_str(subscribe_key)?;
        buf.try_push_str("/channel/")?;
        buf.try_push_str(channel)?;
        buf.try_push_str("/leave?")?;
        push_query(buf, identity)
    })
}

/// Pieces of an HTTP/1.1 GET for `path`, in sending order.
pub fn request_head<'a>(path: &'a [u8], origin: &'a str, user_agent: &'a str) -> [&'a [u8]; 7] {
    [
        b"GET ",
        path,
        b" HTTP/1.1\r\nHost: ",
        origin.as_bytes(),
        b"\r\nUser-Agent: ",
        user_agent.as_bytes(),
        b"\r\nConnection: Keep-Alive\r\n\r\n",
    ]
}
