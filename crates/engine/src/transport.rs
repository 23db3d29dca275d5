//! Collaborator seams
//!
//! The engine performs no I/O itself. Name resolution, TCP and completion
//! delivery are injected through the traits here, and their results come
//! back through [`Engine::on_address_resolved`] and
//! [`Engine::on_net_event`].
//!
//! [`Engine::on_address_resolved`]: crate::Engine::on_address_resolved
//! [`Engine::on_net_event`]: crate::Engine::on_net_event

use crate::pool::ContextId;
use pollsub_core::{Initiator, Outcome, TransactionKind};
use std::net::{IpAddr, SocketAddr};
use std::sync::mpsc;
use thiserror::Error;

/// Result of an address lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Address known now
    Cached(IpAddr),
    /// Not known; ask for resolution and wait
    Pending,
}

/// Host name resolution
pub trait Resolver {
    /// Look `host` up in the cache without blocking.
    fn lookup(&mut self, host: &str) -> Lookup;

    /// Start resolving `host`. Completion is reported through
    /// `Engine::on_address_resolved`.
    fn request_resolution(&mut self, host: &str);
}

/// Failure to hand bytes to the transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is no longer usable
    #[error("connection closed")]
    Closed,

    /// The underlying stack reported an error
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// TCP connections, one per context
pub trait Transport {
    /// Open a connection for `ctx`. The outcome arrives as a [`NetEvent`].
    fn connect(&mut self, addr: SocketAddr, ctx: ContextId);

    /// Queue `data` on the connection of `ctx`.
    fn send(&mut self, ctx: ContextId, data: &[u8]) -> Result<(), TransportError>;

    /// Close the connection of `ctx`. Confirmed by a later
    /// [`NetEvent::Closed`].
    fn close(&mut self, ctx: ContextId);
}

/// Something that happened on a context's connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetEvent<'a> {
    /// Connection established
    Connected,
    /// Response bytes arrived
    Data(&'a [u8]),
    /// Connection closed (by either side)
    Closed,
    /// Connection reset or aborted
    Aborted,
    /// The transport gave up waiting
    TimedOut,
}

impl NetEvent<'_> {
    /// Check if the event says the connection is gone.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NetEvent::Closed | NetEvent::Aborted | NetEvent::TimedOut)
    }

    /// Outcome of a transaction cut short by this event
    pub(crate) fn interrupted_outcome(&self) -> Option<Outcome> {
        match self {
            NetEvent::Closed => Some(Outcome::IoError),
            NetEvent::Aborted => Some(Outcome::Aborted),
            NetEvent::TimedOut => Some(Outcome::Timeout),
            NetEvent::Connected | NetEvent::Data(_) => None,
        }
    }
}

/// A finished transaction, as reported to the initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Context the transaction ran on
    pub ctx: ContextId,
    /// What the transaction was
    pub kind: TransactionKind,
    /// Handle set with `Engine::set_initiator`
    pub initiator: Initiator,
    /// How it ended
    pub outcome: Outcome,
}

/// Receives completions
pub trait Notifier {
    /// Deliver one completion. Called once per started transaction.
    fn notify(&mut self, completion: Completion);
}

impl<F> Notifier for F
where
    F: FnMut(Completion),
{
    fn notify(&mut self, completion: Completion) {
        self(completion)
    }
}

impl Notifier for mpsc::Sender<Completion> {
    fn notify(&mut self, completion: Completion) {
        if self.send(completion).is_err() {
            tracing::warn!(ctx = %completion.ctx, "completion receiver dropped");
        }
    }
}
