//! Fixed pool of transaction contexts
//!
//! All contexts are allocated once, when the engine is built, with buffers
//! sized from [`ClientConfig`]. Slots are addressed by [`ContextId`] and are
//! reset between uses, never reallocated or dropped.

use crate::context::TransactionContext;
use pollsub_core::ClientConfig;
use std::fmt;

/// Handle to a pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(usize);

impl ContextId {
    pub(crate) fn new(index: usize) -> Self {
        ContextId(index)
    }

    /// Slot index
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Owner of every context slot
#[derive(Debug)]
pub struct ContextPool {
    slots: Vec<TransactionContext>,
}

impl ContextPool {
    /// Allocate `config.pool_capacity` contexts.
    pub fn new(config: &ClientConfig) -> Self {
        let slots = (0..config.pool_capacity)
            .map(|_| {
                TransactionContext::new(
                    config.request_buffer_capacity,
                    config.reply_buffer_capacity,
                )
            })
            .collect();
        ContextPool { slots }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Handle for slot `index`, if it exists
    pub fn id(&self, index: usize) -> Option<ContextId> {
        (index < self.slots.len()).then(|| ContextId(index))
    }

    /// Handles of every slot, in index order
    pub fn ids(&self) -> impl Iterator<Item = ContextId> {
        (0..self.slots.len()).map(ContextId)
    }

    /// Context in slot `id`
    pub fn get(&self, id: ContextId) -> Option<&TransactionContext> {
        self.slots.get(id.0)
    }

    /// Context in slot `id`, mutably
    pub fn get_mut(&mut self, id: ContextId) -> Option<&mut TransactionContext> {
        self.slots.get_mut(id.0)
    }
}
