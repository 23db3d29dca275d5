//! Core types for pollsub
//!
//! This crate defines the vocabulary shared by the wire codec and the
//! connection engine:
//! - [`Outcome`]: terminal result of a completed transaction
//! - [`StartError`]: synchronous refusal to start a transaction
//! - [`TransactionKind`] and [`ContextState`]: per-context lifecycle
//! - [`TimeToken`]: the subscribe continuation cursor
//! - [`ClientConfig`]: pool and buffer sizing, origin, recovery policy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ClientConfig, ConfigError};
pub use error::{Outcome, StartError};
pub use types::{
    random_identity, ContextState, Initiator, KeyPair, TimeToken, TimeTokenTooLong,
    TransactionKind, TIME_TOKEN_MAX_LEN,
};
