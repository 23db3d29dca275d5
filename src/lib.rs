//! # pollsub
//!
//! Non-blocking publish/subscribe client over HTTP long-polling.
//!
//! A fixed pool of contexts each runs one transaction at a time (publish,
//! subscribe or leave). The engine never performs I/O: name resolution,
//! TCP and completion delivery are supplied by the caller, and network
//! events are fed back in. Memory is allocated once, when the engine is
//! built.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pollsub::prelude::*;
//!
//! let mut engine = Engine::new(ClientConfig::new(), resolver, transport, notifier)?;
//! let ctx = engine.context(0).unwrap();
//! engine.init(ctx, KeyPair::new("demo", "demo"))?;
//! engine.set_identity(ctx, Some(random_identity()))?;
//! engine.subscribe(ctx, "hello_world")?;
//!
//! // ... from the event loop:
//! engine.on_net_event(ctx, NetEvent::Connected);
//! engine.on_net_event(ctx, NetEvent::Data(bytes));
//!
//! // ... once the notifier reports the subscribe as complete:
//! while let Some(msg) = engine.next_message(ctx) {
//!     println!("{msg}");
//! }
//! ```
//!
//! ## Crates
//!
//! - `pollsub-core`: outcomes, context states, time-tokens and
//!   configuration, re-exported at the root
//! - [`wire`]: request paths, HTTP response framing, subscribe decoding
//! - [`engine`]: the context pool and connection state machine

#![warn(missing_docs)]

mod error;

pub mod prelude;

pub use error::{Error, Result};

pub use pollsub_engine as engine;
pub use pollsub_wire as wire;

pub use pollsub_core::{
    random_identity, ClientConfig, ConfigError, ContextState, Initiator, KeyPair, Outcome,
    StartError, TimeToken, TransactionKind,
};
pub use pollsub_engine::{
    Completion, ContextId, Engine, Lookup, NetEvent, Notifier, Resolver, Transport,
    TransportError,
};
