//! Cancellation Tests
//!
//! Without a connection, cancel completes before it returns. With one, the
//! connection is closed on its next event and the completion follows the
//! confirmed close.

use crate::*;
use pollsub::{ContextState, StartError, TransactionKind};

#[test]
fn test_cancel_while_waiting_for_address() {
    let mut engine = create_engine();
    engine.resolver_mut().cached = false;
    let ctx = first_context(&mut engine, "pubkey", "subkey");

    engine.leave(ctx, "lamanche").unwrap();
    assert_eq!(engine.state(ctx), Some(ContextState::WaitingForAddress));

    engine.cancel(ctx);
    assert_eq!(engine.state(ctx), Some(ContextState::Idle));
    assert_eq!(engine.last_result(ctx), Some(Outcome::Cancelled));
    let done = completions(&engine);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].kind, TransactionKind::Leave);
    assert_eq!(done[0].outcome, Outcome::Cancelled);
    assert!(engine.transport().connects.is_empty());
}

#[test]
fn test_cancel_while_connecting_closes_on_next_event() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "pubkey", "subkey");

    engine.publish(ctx, "nishava", "10987654321").unwrap();
    engine.cancel(ctx);
    assert_eq!(engine.state(ctx), Some(ContextState::WaitingForCancel));
    assert!(completions(&engine).is_empty());

    engine.on_net_event(ctx, NetEvent::Connected);
    assert_eq!(engine.state(ctx), Some(ContextState::WaitingForCancelClose));
    assert_eq!(engine.transport().closes, vec![ctx]);
    assert!(engine.transport().sent.is_empty());
    assert!(completions(&engine).is_empty());

    engine.on_net_event(ctx, NetEvent::Closed);
    assert_eq!(engine.state(ctx), Some(ContextState::Idle));
    assert_eq!(last_outcome(&engine), Some(Outcome::Cancelled));
    assert_eq!(completions(&engine).len(), 1);
}

#[test]
fn test_cancel_when_connection_already_gone() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "pubkey", "subkey");

    engine.subscribe(ctx, "morava").unwrap();
    engine.on_net_event(ctx, NetEvent::Connected);
    engine.cancel(ctx);

    engine.on_net_event(ctx, NetEvent::TimedOut);
    assert_eq!(engine.state(ctx), Some(ContextState::Idle));
    assert_eq!(last_outcome(&engine), Some(Outcome::Cancelled));
    assert!(engine.transport().closes.is_empty());
}

#[test]
fn test_cancel_mid_response_discards_body() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "pubkey", "subkey");

    engine.subscribe(ctx, "morava").unwrap();
    engine.on_net_event(ctx, NetEvent::Connected);
    engine.on_net_event(ctx, NetEvent::Data(b"HTTP/1.1 200\r\nContent-Length: 33\r\n\r\n[[\"Hi\""));
    engine.cancel(ctx);

    engine.on_net_event(ctx, NetEvent::Data(b",\"Fi\"],\"14179836755957292\"]"));
    assert_eq!(engine.state(ctx), Some(ContextState::WaitingForCancelClose));
    engine.on_net_event(ctx, NetEvent::Closed);

    assert_eq!(last_outcome(&engine), Some(Outcome::Cancelled));
    assert_eq!(engine.next_message(ctx), None);
    assert_eq!(engine.time_token(ctx), Some("0"));
}

#[test]
fn test_cancel_is_noop_when_idle_or_cancelling() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "pubkey", "subkey");

    engine.cancel(ctx);
    assert!(completions(&engine).is_empty());
    assert_eq!(engine.last_result(ctx), None);

    engine.publish(ctx, "x", "1").unwrap();
    engine.cancel(ctx);
    engine.cancel(ctx);
    assert_eq!(engine.state(ctx), Some(ContextState::WaitingForCancel));
    engine.on_net_event(ctx, NetEvent::Connected);
    engine.cancel(ctx);
    assert_eq!(engine.state(ctx), Some(ContextState::WaitingForCancelClose));
    engine.on_net_event(ctx, NetEvent::Closed);

    assert_eq!(completions(&engine).len(), 1);
}

#[test]
fn test_start_refused_until_cancel_completes() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "pubkey", "subkey");

    engine.publish(ctx, "x", "1").unwrap();
    engine.cancel(ctx);
    assert_eq!(engine.publish(ctx, "x", "2"), Err(StartError::InProgress));
    engine.on_net_event(ctx, NetEvent::Aborted);
    assert!(engine.publish(ctx, "x", "2").is_ok());
}

#[test]
fn test_release_cancels_and_forgets_keys() {
    let mut engine = create_engine();
    engine.resolver_mut().cached = false;
    let ctx = first_context(&mut engine, "pubkey", "subkey");
    engine.set_identity(ctx, Some("u-1".to_string())).unwrap();

    engine.subscribe(ctx, "morava").unwrap();
    engine.release(ctx);

    assert_eq!(last_outcome(&engine), Some(Outcome::Cancelled));
    assert_eq!(engine.state(ctx), Some(ContextState::Idle));
    assert_eq!(engine.subscribe(ctx, "morava"), Err(StartError::NotInitialized));
    assert!(engine.context_ref(ctx).unwrap().keys().is_none());
}
