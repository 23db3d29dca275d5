//! Convenient imports for pollsub.
//!
//! ```ignore
//! use pollsub::prelude::*;
//! ```

// Engine and seams
pub use crate::{Completion, ContextId, Engine, Lookup, NetEvent, Notifier, Resolver, Transport};

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use crate::{random_identity, ClientConfig, ContextState, Initiator, KeyPair, Outcome};

// Re-export serde_json for publish_json
pub use serde_json::json;
