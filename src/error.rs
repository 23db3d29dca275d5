//! Unified error type for pollsub.
//!
//! Wraps the per-crate errors so callers can use `?` across configuration
//! loading, transaction starts and direct use of the wire codec.

use thiserror::Error;

/// All synchronous pollsub errors.
///
/// Transactions that did start report their result as an
/// [`Outcome`](crate::Outcome) through the notifier, not through this type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error(transparent)]
    Config(#[from] pollsub_core::ConfigError),

    /// A transaction could not be started
    #[error(transparent)]
    Start(#[from] pollsub_core::StartError),

    /// An HTTP response violated framing rules
    #[error(transparent)]
    Framing(#[from] pollsub_wire::FramingError),

    /// A subscribe body could not be decoded
    #[error(transparent)]
    Parse(#[from] pollsub_wire::ParseError),

    /// The transport refused data
    #[error(transparent)]
    Transport(#[from] pollsub_engine::TransportError),
}

/// Result type for pollsub operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if retrying later may succeed.
    ///
    /// Only a busy context qualifies: it becomes free once its transaction
    /// completes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Start(pollsub_core::StartError::InProgress))
    }

    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
