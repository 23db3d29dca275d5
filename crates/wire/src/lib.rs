//! Wire codec for pollsub
//!
//! Everything here works on caller-owned fixed buffers and never performs
//! I/O:
//!
//! - [`request`]: request paths for publish, subscribe and leave, with
//!   percent-encoding of published messages
//! - [`http`]: a resumable HTTP/1.1 response reader handling both
//!   `Content-Length` and chunked bodies
//! - [`subscribe`]: in-place decoding of subscribe response bodies into a
//!   time-token, a message list and an optional channel list
//!
//! ## Example
//!
//! ```
//! use pollsub_core::TimeToken;
//! use pollsub_wire::{FixedBuf, ResponseFramer, Progress, parse_subscribe_response, ItemCursor};
//!
//! let mut line = FixedBuf::with_capacity(256);
//! let mut reply = FixedBuf::with_capacity(512);
//! let mut framer = ResponseFramer::new();
//! framer.begin(&mut line, &mut reply);
//!
//! let input = b"HTTP/1.1 200 OK\r\nContent-Length: 16\r\n\r\n[[\"hello\"],\"15\"]";
//! let fed = framer.feed(input, &mut line, &mut reply).unwrap();
//! assert_eq!(fed.progress, Progress::Done);
//! assert_eq!(framer.status(), 200);
//!
//! let mut tt = TimeToken::new();
//! let layout = parse_subscribe_response(reply.bytes_mut(), &mut tt).unwrap();
//! assert_eq!(tt.as_str(), "15");
//!
//! let mut messages = ItemCursor::new(layout.messages);
//! assert_eq!(messages.next_item(reply.as_bytes()), Some("\"hello\""));
//! assert_eq!(messages.next_item(reply.as_bytes()), None);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buf;
pub mod http;
pub mod request;
pub mod subscribe;

pub use buf::{BufferFull, FixedBuf};
pub use http::{Fed, FramingError, Progress, ResponseFramer};
pub use request::{
    build_leave, build_publish, build_subscribe, is_safe, percent_encode_into, request_head,
    Identity,
};
pub use subscribe::{parse_subscribe_response, ItemCursor, ParseError, SubscribeLayout};
