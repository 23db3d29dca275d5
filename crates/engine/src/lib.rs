//! Transaction engine for pollsub
//!
//! This crate provides:
//! - [`ContextPool`]: a fixed set of transaction contexts, allocated once
//! - [`Engine`]: the per-context connection state machine
//! - [`transport`]: the resolver, transport and notifier seams the engine
//!   is driven through
//!
//! # Architecture
//!
//! The engine is single-threaded and never blocks. Callers start
//! transactions, the environment reports address resolution and connection
//! events, and each transaction ends with one [`Completion`]:
//!
//! ```text
//!   caller ── publish / subscribe / leave / cancel ──▶ Engine ──▶ Resolver
//!                                                        │   ──▶ Transport
//!   environment ── on_address_resolved / on_net_event ──▶│
//!                                                        └──▶ Notifier
//! ```
//!
//! Contexts are reset, not reallocated, when reused; request and reply
//! buffers keep their storage for the life of the engine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod machine;
pub mod pool;
pub mod transport;

pub use context::TransactionContext;
pub use machine::Engine;
pub use pool::{ContextId, ContextPool};
pub use transport::{
    Completion, Lookup, NetEvent, Notifier, Resolver, Transport, TransportError,
};
