//! Client configuration
//!
//! [`ClientConfig`] sizes the context pool and the per-context buffers and
//! names the origin every request goes to. It can be built in code:
//!
//! ```
//! use pollsub_core::ClientConfig;
//!
//! let config = ClientConfig::new()
//!     .pool_capacity(4)
//!     .reply_buffer_capacity(1024)
//!     .accept_missed_messages(false);
//! assert!(config.validate().is_ok());
//! ```
//!
//! or read from TOML, where every key is optional:
//!
//! ```
//! use pollsub_core::ClientConfig;
//!
//! let config = ClientConfig::from_toml_str(r#"
//!     pool_capacity = 3
//!     origin = "pubsub.example.net"
//! "#).unwrap();
//! assert_eq!(config.pool_capacity, 3);
//! assert_eq!(config.request_buffer_capacity, 256);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Smallest request buffer that still holds a subscribe path with short keys.
pub const MIN_REQUEST_BUFFER: usize = 64;

/// Smallest reply buffer that can hold a minimal subscribe response.
pub const MIN_REPLY_BUFFER: usize = 8;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML document could not be parsed
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Number of contexts in the pool
    pub pool_capacity: usize,
    /// Bytes reserved for the request path (also the response line buffer)
    pub request_buffer_capacity: usize,
    /// Bytes reserved for a response body
    pub reply_buffer_capacity: usize,
    /// Reset the time-token on every failed transaction, not only on
    /// malformed subscribe responses. Messages published while the
    /// subscription was failing are then skipped.
    pub accept_missed_messages: bool,
    /// Host name every request goes to
    pub origin: String,
    /// TCP port of the origin
    pub port: u16,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Value of the `pnsdk` query parameter on subscribe, already
    /// percent-encoded
    pub pnsdk: String,
}

impl ClientConfig {
    /// Configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the pool capacity
    pub fn pool_capacity(mut self, n: usize) -> Self {
        self.pool_capacity = n;
        self
    }

    /// Set the request buffer capacity
    pub fn request_buffer_capacity(mut self, n: usize) -> Self {
        self.request_buffer_capacity = n;
        self
    }

    /// Set the reply buffer capacity
    pub fn reply_buffer_capacity(mut self, n: usize) -> Self {
        self.reply_buffer_capacity = n;
        self
    }

    /// Set the missed-messages recovery policy
    pub fn accept_missed_messages(mut self, accept: bool) -> Self {
        self.accept_missed_messages = accept;
        self
    }

    /// Set the origin host
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Set the origin port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "pool_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_buffer_capacity < MIN_REQUEST_BUFFER {
            return Err(ConfigError::Invalid {
                field: "request_buffer_capacity",
                reason: format!(
                    "{} is below the minimum of {}",
                    self.request_buffer_capacity, MIN_REQUEST_BUFFER
                ),
            });
        }
        if self.reply_buffer_capacity < MIN_REPLY_BUFFER {
            return Err(ConfigError::Invalid {
                field: "reply_buffer_capacity",
                reason: format!(
                    "{} is below the minimum of {}",
                    self.reply_buffer_capacity, MIN_REPLY_BUFFER
                ),
            });
        }
        if self.origin.is_empty() {
            return Err(ConfigError::Invalid {
                field: "origin",
                reason: "must not be empty".to_string(),
            });
        }
        if self.origin.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
            return Err(ConfigError::Invalid {
                field: "origin",
                reason: format!("{:?} is not a host name", self.origin),
            });
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 2,
            request_buffer_capacity: 256,
            reply_buffer_capacity: 512,
            accept_missed_messages: true,
            origin: "pubsub.pubnub.com".to_string(),
            port: 80,
            user_agent: concat!("pollsub/", env!("CARGO_PKG_VERSION")).to_string(),
            pnsdk: concat!("pollsub%2F", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
