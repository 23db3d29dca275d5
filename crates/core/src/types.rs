//! Core types for the client engine
//!
//! This module defines the fundamental types used throughout the system:
//! - [`TransactionKind`]: which operation a context is running
//! - [`ContextState`]: where a context is in its connection lifecycle
//! - [`TimeToken`]: bounded subscribe continuation cursor
//! - [`KeyPair`]: publish/subscribe keys a context is initialized with

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Longest time-token the service may hand out, in bytes.
pub const TIME_TOKEN_MAX_LEN: usize = 63;

/// Kind of transaction running on a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Publish a message on a channel
    Publish,
    /// Fetch messages newer than the context's time-token
    Subscribe,
    /// Leave (unsubscribe from) a channel
    Leave,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Publish => write!(f, "publish"),
            TransactionKind::Subscribe => write!(f, "subscribe"),
            TransactionKind::Leave => write!(f, "leave"),
        }
    }
}

/// Connection lifecycle state of a context
///
/// ```text
/// Idle ──▶ WaitingForAddress ──▶ Connecting ──▶ InTransaction ──▶ WaitingForClose ──▶ Idle
///                │                   │               │                  │
///                ▼                   └───────────────┴──────────────────┘
///              Idle                               │ cancel
///          (cancelled)                            ▼
///                                     WaitingForCancel ──▶ WaitingForCancelClose ──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContextState {
    /// No transaction in flight
    #[default]
    Idle,
    /// Waiting for the origin's address to be resolved
    WaitingForAddress,
    /// Connection attempt issued, not yet established
    Connecting,
    /// Request sent, reading the response
    InTransaction,
    /// Response handled, waiting for the connection to close
    WaitingForClose,
    /// Cancel requested, waiting for the next network event
    WaitingForCancel,
    /// Cancel in progress, waiting for the connection to close
    WaitingForCancelClose,
}

impl ContextState {
    /// Check if no transaction is in flight.
    pub fn is_idle(&self) -> bool {
        matches!(self, ContextState::Idle)
    }

    /// Check if a cancel has been requested and not yet completed.
    pub fn is_cancelling(&self) -> bool {
        matches!(
            self,
            ContextState::WaitingForCancel | ContextState::WaitingForCancelClose
        )
    }
}

/// Opaque handle identifying who to notify when a transaction completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Initiator(pub u64);

/// Publish and subscribe keys a context is initialized with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    /// Key used when publishing
    pub publish_key: String,
    /// Key used when subscribing and leaving
    pub subscribe_key: String,
}

impl KeyPair {
    /// Create a key pair
    ///
    /// # Examples
    ///
    /// ```
    /// use pollsub_core::KeyPair;
    ///
    /// let keys = KeyPair::new("demo", "demo");
    /// assert_eq!(keys.subscribe_key, "demo");
    /// ```
    pub fn new(publish_key: impl Into<String>, subscribe_key: impl Into<String>) -> Self {
        KeyPair {
            publish_key: publish_key.into(),
            subscribe_key: subscribe_key.into(),
        }
    }
}

/// Generate a random client identity suitable for `uuid=` query parameters.
pub fn random_identity() -> String {
    Uuid::new_v4().to_string()
}

/// Time-token longer than [`TIME_TOKEN_MAX_LEN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("time-token of {0} bytes exceeds the {max} byte limit", max = TIME_TOKEN_MAX_LEN)]
pub struct TimeTokenTooLong(pub usize);

/// Subscribe continuation cursor
///
/// Starts at `"0"`, which the service treats as a fresh join. Storage is
/// reserved once and never grows past [`TIME_TOKEN_MAX_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeToken(String);

impl TimeToken {
    /// Create a time-token holding `"0"`
    pub fn new() -> Self {
        let mut s = String::with_capacity(TIME_TOKEN_MAX_LEN);
        s.push('0');
        TimeToken(s)
    }

    /// Replace the token, refusing anything longer than the limit.
    ///
    /// On error the previous token is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use pollsub_core::TimeToken;
    ///
    /// let mut tt = TimeToken::new();
    /// tt.set("14179836755957292").unwrap();
    /// assert_eq!(tt.as_str(), "14179836755957292");
    /// assert!(tt.set(&"9".repeat(64)).is_err());
    /// assert_eq!(tt.as_str(), "14179836755957292");
    /// ```
    pub fn set(&mut self, token: &str) -> Result<(), TimeTokenTooLong> {
        if token.len() > TIME_TOKEN_MAX_LEN {
            return Err(TimeTokenTooLong(token.len()));
        }
        self.0.clear();
        self.0.push_str(token);
        Ok(())
    }

    /// Reset to `"0"`
    pub fn reset(&mut self) {
        self.0.clear();
        self.0.push('0');
    }

    /// Check if the token is the initial `"0"`
    pub fn is_initial(&self) -> bool {
        self.0 == "0"
    }

    /// Token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TimeToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TimeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
