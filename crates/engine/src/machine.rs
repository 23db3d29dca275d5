//! Connection state machine
//!
//! [`Engine`] drives every context in the pool through
//!
//! ```text
//! start ──▶ resolve ──▶ connect ──▶ send ──▶ read ──▶ parse ──▶ close ──▶ notify
//! ```
//!
//! one non-blocking step at a time. Steps are triggered by the caller
//! (starting or cancelling a transaction) and by the collaborators, whose
//! events are fed back through [`Engine::on_address_resolved`] and
//! [`Engine::on_net_event`].
//!
//! Every started transaction ends with exactly one [`Completion`] handed to
//! the [`Notifier`], after the context is idle again.

use crate::context::TransactionContext;
use crate::pool::{ContextId, ContextPool};
use crate::transport::{Completion, Lookup, NetEvent, Notifier, Resolver, Transport};
use pollsub_core::{
    ClientConfig, ConfigError, ContextState, Initiator, KeyPair, Outcome, StartError,
    TransactionKind,
};
use pollsub_wire::{
    build_leave, build_publish, build_subscribe, parse_subscribe_response, request_head, Identity,
    Progress,
};
use std::net::SocketAddr;
use tracing::{debug, warn};

/// Client engine owning the context pool and its collaborators
pub struct Engine<R, T, N> {
    config: ClientConfig,
    pool: ContextPool,
    resolver: R,
    transport: T,
    notifier: N,
}

impl<R, T, N> Engine<R, T, N>
where
    R: Resolver,
    T: Transport,
    N: Notifier,
{
    /// Validate `config` and allocate the pool.
    pub fn new(
        config: ClientConfig,
        resolver: R,
        transport: T,
        notifier: N,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = ContextPool::new(&config);
        debug!(
            "Engine ready: {} contexts, origin {}:{}",
            pool.capacity(),
            config.origin,
            config.port
        );
        Ok(Engine {
            config,
            pool,
            resolver,
            transport,
            notifier,
        })
    }

    /// Configuration the engine was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Handle for pool slot `index`
    pub fn context(&self, index: usize) -> Option<ContextId> {
        self.pool.id(index)
    }

    /// Read-only view of a context
    pub fn context_ref(&self, ctx: ContextId) -> Option<&TransactionContext> {
        self.pool.get(ctx)
    }

    /// Name resolver
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Name resolver, mutably
    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Completion sink
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Completion sink, mutably
    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    fn slot(&mut self, ctx: ContextId) -> Result<&mut TransactionContext, StartError> {
        self.pool.get_mut(ctx).ok_or(StartError::UnknownContext)
    }

    fn idle_slot(&mut self, ctx: ContextId) -> Result<&mut TransactionContext, StartError> {
        let slot = self.slot(ctx)?;
        if !slot.state.is_idle() {
            return Err(StartError::InProgress);
        }
        Ok(slot)
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Set the keys of a context and reset its time-token and identity.
    pub fn init(&mut self, ctx: ContextId, keys: KeyPair) -> Result<(), StartError> {
        let slot = self.idle_slot(ctx)?;
        slot.reset_identity();
        slot.keys = Some(keys);
        slot.kind = None;
        debug!(ctx = %ctx, "context initialized");
        Ok(())
    }

    /// Set or clear the `uuid=` sent with subscribe and leave.
    pub fn set_identity(&mut self, ctx: ContextId, uuid: Option<String>) -> Result<(), StartError> {
        self.slot(ctx)?.uuid = uuid;
        Ok(())
    }

    /// Set or clear the `auth=` sent with subscribe and leave.
    pub fn set_auth(&mut self, ctx: ContextId, auth: Option<String>) -> Result<(), StartError> {
        self.slot(ctx)?.auth = auth;
        Ok(())
    }

    /// Set the handle reported in this context's completions.
    pub fn set_initiator(&mut self, ctx: ContextId, initiator: Initiator) -> Result<(), StartError> {
        self.slot(ctx)?.initiator = initiator;
        Ok(())
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Publish `message`, already serialized as JSON, on `channel`.
    ///
    /// Messages and channels still unread from the last subscribe are
    /// discarded once the response starts arriving; drain them first.
    pub fn publish(&mut self, ctx: ContextId, channel: &str, message: &str) -> Result<(), StartError> {
        let slot = self.idle_slot(ctx)?;
        let keys = slot.keys.as_ref().ok_or(StartError::NotInitialized)?;
        build_publish(&mut slot.request, keys, channel, message)
            .map_err(|_| StartError::TxBufferTooSmall)?;
        slot.start(TransactionKind::Publish);
        debug!(ctx = %ctx, channel, "publish started");
        self.connect_or_resolve(ctx);
        Ok(())
    }

    /// Serialize `message` and publish it on `channel`.
    pub fn publish_json(
        &mut self,
        ctx: ContextId,
        channel: &str,
        message: &serde_json::Value,
    ) -> Result<(), StartError> {
        self.publish(ctx, channel, &message.to_string())
    }

    /// Fetch messages newer than the context's time-token.
    ///
    /// Refused while messages from the previous subscribe are unread.
    pub fn subscribe(&mut self, ctx: ContextId, channel: &str) -> Result<(), StartError> {
        let pnsdk = self.config.pnsdk.as_str();
        let slot = self.pool.get_mut(ctx).ok_or(StartError::UnknownContext)?;
        if !slot.state.is_idle() {
            return Err(StartError::InProgress);
        }
        if slot.has_unread_messages() {
            return Err(StartError::RxBufferNotEmpty);
        }
        let keys = slot.keys.as_ref().ok_or(StartError::NotInitialized)?;
        let identity = Identity {
            uuid: slot.uuid.as_deref(),
            auth: slot.auth.as_deref(),
        };
        build_subscribe(
            &mut slot.request,
            &keys.subscribe_key,
            channel,
            &slot.time_token,
            identity,
            pnsdk,
        )
        .map_err(|_| StartError::TxBufferTooSmall)?;
        slot.clear_items();
        slot.start(TransactionKind::Subscribe);
        debug!(ctx = %ctx, channel, time_token = slot.time_token(), "subscribe started");
        self.connect_or_resolve(ctx);
        Ok(())
    }

    /// Leave `channel`. The next subscribe starts from time-token `"0"`.
    ///
    /// Like [`publish`](Self::publish), this discards messages and channels
    /// still unread from the last subscribe.
    pub fn leave(&mut self, ctx: ContextId, channel: &str) -> Result<(), StartError> {
        let slot = self.idle_slot(ctx)?;
        let keys = slot.keys.as_ref().ok_or(StartError::NotInitialized)?;
        let identity = Identity {
            uuid: slot.uuid.as_deref(),
            auth: slot.auth.as_deref(),
        };
        build_leave(&mut slot.request, &keys.subscribe_key, channel, identity)
            .map_err(|_| StartError::TxBufferTooSmall)?;
        slot.time_token.reset();
        slot.start(TransactionKind::Leave);
        debug!(ctx = %ctx, channel, "leave started");
        self.connect_or_resolve(ctx);
        Ok(())
    }

    /// Cancel the transaction in flight, if any.
    ///
    /// Without a connection the transaction completes with
    /// [`Outcome::Cancelled`] before this returns. Otherwise the connection
    /// is closed on its next event and the completion follows the close.
    pub fn cancel(&mut self, ctx: ContextId) {
        let accept_missed = self.config.accept_missed_messages;
        let Some(slot) = self.pool.get_mut(ctx) else {
            return;
        };
        match slot.state {
            ContextState::Idle
            | ContextState::WaitingForCancel
            | ContextState::WaitingForCancelClose => {}
            ContextState::WaitingForAddress => {
                debug!(ctx = %ctx, "cancelled before connecting");
                if let Some(done) = slot.finish(ctx, Outcome::Cancelled, accept_missed) {
                    self.notifier.notify(done);
                }
            }
            ContextState::Connecting
            | ContextState::InTransaction
            | ContextState::WaitingForClose => {
                debug!(ctx = %ctx, from = ?slot.state, "cancel requested");
                slot.state = ContextState::WaitingForCancel;
            }
        }
    }

    /// Cancel anything in flight and forget the context's keys, identity
    /// and time-token. The slot stays in the pool for reuse.
    pub fn release(&mut self, ctx: ContextId) {
        self.cancel(ctx);
        if let Some(slot) = self.pool.get_mut(ctx) {
            slot.reset_identity();
            debug!(ctx = %ctx, "context released");
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Next unread message of the last subscribe
    pub fn next_message(&mut self, ctx: ContextId) -> Option<&str> {
        self.pool.get_mut(ctx)?.next_message()
    }

    /// Next unread channel of the last subscribe
    pub fn next_channel(&mut self, ctx: ContextId) -> Option<&str> {
        self.pool.get_mut(ctx)?.next_channel()
    }

    /// Outcome of the most recent completed transaction
    pub fn last_result(&self, ctx: ContextId) -> Option<Outcome> {
        self.pool.get(ctx)?.last_result()
    }

    /// HTTP status of the most recent completed transaction
    pub fn last_http_status(&self, ctx: ContextId) -> Option<u16> {
        self.pool.get(ctx).map(TransactionContext::last_http_status)
    }

    /// Connection lifecycle state
    pub fn state(&self, ctx: ContextId) -> Option<ContextState> {
        self.pool.get(ctx).map(TransactionContext::state)
    }

    /// Current subscribe time-token
    pub fn time_token(&self, ctx: ContextId) -> Option<&str> {
        self.pool.get(ctx).map(TransactionContext::time_token)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Resolution of `host` finished. Contexts waiting for the origin
    /// retry their lookup; other names are ignored.
    pub fn on_address_resolved(&mut self, host: &str) {
        if host != self.config.origin {
            debug!("Ignoring resolution of {}", host);
            return;
        }
        let waiting: Vec<ContextId> = self
            .pool
            .ids()
            .filter(|&id| {
                self.pool
                    .get(id)
                    .is_some_and(|c| c.state == ContextState::WaitingForAddress)
            })
            .collect();
        for id in waiting {
            self.connect_or_resolve(id);
        }
    }

    /// Something happened on the connection of `ctx`.
    pub fn on_net_event(&mut self, ctx: ContextId, event: NetEvent<'_>) {
        let Some(state) = self.pool.get(ctx).map(TransactionContext::state) else {
            warn!(ctx = %ctx, "event for unknown context");
            return;
        };
        match state {
            ContextState::Idle | ContextState::WaitingForAddress => {
                debug!(ctx = %ctx, ?state, ?event, "unexpected network event");
            }
            ContextState::Connecting => self.on_connecting(ctx, event),
            ContextState::InTransaction => self.on_transaction(ctx, event),
            ContextState::WaitingForClose => {
                if event.is_terminal() {
                    let outcome = self
                        .pool
                        .get(ctx)
                        .and_then(|c| c.pending)
                        .unwrap_or(Outcome::IoError);
                    self.complete(ctx, outcome);
                }
            }
            ContextState::WaitingForCancel => {
                if event.is_terminal() {
                    self.complete(ctx, Outcome::Cancelled);
                } else {
                    self.transport.close(ctx);
                    self.set_state(ctx, ContextState::WaitingForCancelClose);
                }
            }
            ContextState::WaitingForCancelClose => {
                if event.is_terminal() {
                    self.complete(ctx, Outcome::Cancelled);
                }
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn set_state(&mut self, ctx: ContextId, state: ContextState) {
        if let Some(slot) = self.pool.get_mut(ctx) {
            debug!(ctx = %ctx, from = ?slot.state, to = ?state, "transition");
            slot.state = state;
        }
    }

    fn connect_or_resolve(&mut self, ctx: ContextId) {
        match self.resolver.lookup(&self.config.origin) {
            Lookup::Cached(ip) => {
                self.transport
                    .connect(SocketAddr::new(ip, self.config.port), ctx);
                self.set_state(ctx, ContextState::Connecting);
            }
            Lookup::Pending => {
                self.resolver.request_resolution(&self.config.origin);
                self.set_state(ctx, ContextState::WaitingForAddress);
            }
        }
    }

    fn on_connecting(&mut self, ctx: ContextId, event: NetEvent<'_>) {
        match event {
            NetEvent::Connected => self.send_request(ctx),
            NetEvent::Data(_) => debug!(ctx = %ctx, "data before connect, ignored"),
            _ => {
                if let Some(outcome) = event.interrupted_outcome() {
                    warn!(ctx = %ctx, %outcome, "connect failed");
                    self.complete(ctx, outcome);
                }
            }
        }
    }

    fn send_request(&mut self, ctx: ContextId) {
        let Some(slot) = self.pool.get_mut(ctx) else {
            return;
        };
        let head = request_head(
            slot.request.as_bytes(),
            &self.config.origin,
            &self.config.user_agent,
        );
        let sent = head
            .iter()
            .try_for_each(|piece| self.transport.send(ctx, piece));
        slot.begin_response();

        match sent {
            Ok(()) => {
                debug!(ctx = %ctx, "request sent");
                slot.state = ContextState::InTransaction;
            }
            Err(e) => {
                warn!(ctx = %ctx, error = %e, "sending request failed");
                slot.pending = Some(Outcome::IoError);
                slot.state = ContextState::WaitingForClose;
                self.transport.close(ctx);
            }
        }
    }

    fn on_transaction(&mut self, ctx: ContextId, event: NetEvent<'_>) {
        let data = match event {
            NetEvent::Data(data) => data,
            NetEvent::Connected => return,
            _ => {
                if let Some(outcome) = event.interrupted_outcome() {
                    warn!(ctx = %ctx, %outcome, "connection lost mid-response");
                    self.complete(ctx, outcome);
                }
                return;
            }
        };
        let Some(slot) = self.pool.get_mut(ctx) else {
            return;
        };

        let outcome = match slot.framer.feed(data, &mut slot.request, &mut slot.reply) {
            Ok(fed) if fed.progress == Progress::NeedMore => return,
            Ok(fed) => {
                if fed.consumed < data.len() {
                    debug!(ctx = %ctx, extra = data.len() - fed.consumed, "bytes after body ignored");
                }
                let status = slot.framer.status();
                if slot.kind == Some(TransactionKind::Subscribe) {
                    match parse_subscribe_response(slot.reply.bytes_mut(), &mut slot.time_token) {
                        Ok(layout) => {
                            slot.set_items(layout);
                            Outcome::from_http_status(status)
                        }
                        Err(e) => {
                            warn!(ctx = %ctx, status, error = %e, "bad subscribe response");
                            Outcome::FormatError
                        }
                    }
                } else {
                    Outcome::from_http_status(status)
                }
            }
            Err(e) => {
                warn!(ctx = %ctx, error = %e, "bad HTTP response");
                Outcome::IoError
            }
        };

        debug!(ctx = %ctx, %outcome, "response handled, closing");
        slot.pending = Some(outcome);
        slot.state = ContextState::WaitingForClose;
        self.transport.close(ctx);
    }

    fn complete(&mut self, ctx: ContextId, outcome: Outcome) {
        let accept_missed = self.config.accept_missed_messages;
        let Some(slot) = self.pool.get_mut(ctx) else {
            return;
        };
        if let Some(done) = slot.finish(ctx, outcome, accept_missed) {
            debug!(
                ctx = %ctx,
                kind = %done.kind,
                %outcome,
                status = slot.last_http_status,
                "transaction complete"
            );
            self.notifier.notify(done);
        }
    }
}
