//! Per-context transaction record
//!
//! A [`TransactionContext`] owns everything one transaction needs: keys and
//! identity, the subscribe time-token, the request buffer (which doubles as
//! the response line buffer once the request is sent), the reply buffer and
//! the cursors over decoded messages and channels.
//!
//! Contexts are reset between transactions, not reallocated: buffer storage
//! is fixed for the life of the pool.

use crate::pool::ContextId;
use crate::transport::Completion;
use pollsub_core::{ContextState, Initiator, KeyPair, Outcome, TimeToken, TransactionKind};
use pollsub_wire::{FixedBuf, ItemCursor, ResponseFramer, SubscribeLayout};

/// State of one pool slot
#[derive(Debug)]
pub struct TransactionContext {
    pub(crate) keys: Option<KeyPair>,
    pub(crate) uuid: Option<String>,
    pub(crate) auth: Option<String>,
    pub(crate) time_token: TimeToken,
    pub(crate) state: ContextState,
    pub(crate) kind: Option<TransactionKind>,
    pub(crate) initiator: Initiator,
    pub(crate) last_result: Option<Outcome>,
    pub(crate) last_http_status: u16,

    /// Outgoing path, then the response line buffer
    pub(crate) request: FixedBuf,
    /// Response body, NUL-terminated
    pub(crate) reply: FixedBuf,
    pub(crate) framer: ResponseFramer,
    pub(crate) messages: ItemCursor,
    pub(crate) channels: ItemCursor,

    /// Outcome decided while the connection is still closing
    pub(crate) pending: Option<Outcome>,
}

impl TransactionContext {
    pub(crate) fn new(request_capacity: usize, reply_capacity: usize) -> Self {
        TransactionContext {
            keys: None,
            uuid: None,
            auth: None,
            time_token: TimeToken::new(),
            state: ContextState::Idle,
            kind: None,
            initiator: Initiator::default(),
            last_result: None,
            last_http_status: 0,
            request: FixedBuf::with_capacity(request_capacity),
            reply: FixedBuf::with_capacity(reply_capacity),
            framer: ResponseFramer::new(),
            messages: ItemCursor::empty(),
            channels: ItemCursor::empty(),
            pending: None,
        }
    }

    /// Connection lifecycle state
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Kind of the current (or most recent) transaction
    pub fn kind(&self) -> Option<TransactionKind> {
        self.kind
    }

    /// Keys set by `init`
    pub fn keys(&self) -> Option<&KeyPair> {
        self.keys.as_ref()
    }

    /// Current subscribe time-token
    pub fn time_token(&self) -> &str {
        self.time_token.as_str()
    }

    /// Outcome of the most recent completed transaction
    pub fn last_result(&self) -> Option<Outcome> {
        self.last_result
    }

    /// HTTP status of the most recent completed transaction, `0` if none
    /// was received
    pub fn last_http_status(&self) -> u16 {
        self.last_http_status
    }

    /// Capacity of the reply buffer
    pub fn reply_capacity(&self) -> usize {
        self.reply.capacity()
    }

    /// Check if decoded messages remain unread.
    pub fn has_unread_messages(&self) -> bool {
        !self.messages.is_empty()
    }

    pub(crate) fn next_message(&mut self) -> Option<&str> {
        self.messages.next_item(self.reply.as_bytes())
    }

    pub(crate) fn next_channel(&mut self) -> Option<&str> {
        self.channels.next_item(self.reply.as_bytes())
    }

    pub(crate) fn clear_items(&mut self) {
        self.messages = ItemCursor::empty();
        self.channels = ItemCursor::empty();
    }

    pub(crate) fn set_items(&mut self, layout: SubscribeLayout) {
        self.messages = ItemCursor::new(layout.messages);
        self.channels = ItemCursor::new(layout.channels);
    }

    /// Mark a transaction of `kind` as started.
    pub(crate) fn start(&mut self, kind: TransactionKind) {
        self.kind = Some(kind);
        self.pending = None;
        self.framer = ResponseFramer::new();
    }

    /// Reset the framer for a new response. The request buffer becomes the
    /// line buffer, so the path it held is gone after this.
    pub(crate) fn begin_response(&mut self) {
        self.clear_items();
        self.framer.begin(&mut self.request, &mut self.reply);
    }

    /// Record `outcome`, apply the time-token policy and return to idle.
    ///
    /// Returns the completion to deliver, or `None` if no transaction was
    /// running.
    pub(crate) fn finish(
        &mut self,
        id: ContextId,
        outcome: Outcome,
        accept_missed_messages: bool,
    ) -> Option<Completion> {
        if self.state.is_idle() {
            return None;
        }
        self.last_result = Some(outcome);
        self.last_http_status = self.framer.status();
        if outcome == Outcome::Cancelled {
            self.messages = ItemCursor::empty();
        }
        if outcome == Outcome::FormatError || (accept_missed_messages && !outcome.is_ok()) {
            self.time_token.reset();
        }
        self.state = ContextState::Idle;
        self.pending = None;
        self.kind.map(|kind| Completion {
            ctx: id,
            kind,
            initiator: self.initiator,
            outcome,
        })
    }

    /// Forget keys, identity and time-token.
    pub(crate) fn reset_identity(&mut self) {
        self.keys = None;
        self.uuid = None;
        self.auth = None;
        self.time_token.reset();
        self.clear_items();
    }
}
