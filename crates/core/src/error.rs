//! Transaction outcomes and start errors
//!
//! Results come in two flavours. A transaction that cannot be started is
//! refused synchronously with a [`StartError`] and leaves the context as it
//! was. A transaction that did start always ends with exactly one
//! [`Outcome`], delivered through the notifier once the context is idle
//! again.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal result of a transaction that was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The transaction finished and the server answered with a 2xx status.
    Ok,
    /// The transport reported a timeout before the transaction completed.
    Timeout,
    /// The connection was aborted (reset) by the peer or the stack.
    Aborted,
    /// Transport failure, or an HTTP response that violates framing rules.
    IoError,
    /// The server answered with a non-2xx status.
    HttpError(u16),
    /// The subscribe response body could not be decoded.
    FormatError,
    /// The caller cancelled the transaction.
    Cancelled,
}

impl Outcome {
    /// Check if this outcome is a success.
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    /// Map a final HTTP status code to an outcome.
    ///
    /// ```
    /// use pollsub_core::Outcome;
    ///
    /// assert_eq!(Outcome::from_http_status(204), Outcome::Ok);
    /// assert_eq!(Outcome::from_http_status(403), Outcome::HttpError(403));
    /// ```
    pub fn from_http_status(status: u16) -> Self {
        if status / 100 == 2 {
            Outcome::Ok
        } else {
            Outcome::HttpError(status)
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Ok => write!(f, "ok"),
            Outcome::Timeout => write!(f, "timeout"),
            Outcome::Aborted => write!(f, "aborted"),
            Outcome::IoError => write!(f, "I/O error"),
            Outcome::HttpError(code) => write!(f, "HTTP error {}", code),
            Outcome::FormatError => write!(f, "format error"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Reasons a transaction is refused before anything is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartError {
    /// Another transaction is still in flight on this context.
    #[error("a transaction is already in progress on this context")]
    InProgress,

    /// Messages from the previous subscribe have not all been read.
    #[error("unread messages remain from the previous subscribe")]
    RxBufferNotEmpty,

    /// The request path does not fit in the request buffer.
    #[error("request does not fit in the request buffer")]
    TxBufferTooSmall,

    /// The context has no keys yet.
    #[error("context has not been initialized with keys")]
    NotInitialized,

    /// The context id does not belong to this pool.
    #[error("unknown context")]
    UnknownContext,
}
