//! Context Pool Tests
//!
//! Slot addressing, per-context independence and reuse across
//! transactions.

use crate::*;
use pollsub::{ContextState, StartError};

#[test]
fn test_context_indices_bounded_by_capacity() {
    let engine = create_engine_with(ClientConfig::new().pool_capacity(3));
    assert!(engine.context(0).is_some());
    assert!(engine.context(2).is_some());
    assert!(engine.context(3).is_none());
}

#[test]
fn test_foreign_context_id_is_unknown() {
    let big = create_engine_with(ClientConfig::new().pool_capacity(4));
    let foreign = big.context(3).unwrap();

    let mut small = create_engine();
    assert_eq!(
        small.init(foreign, KeyPair::new("p", "s")),
        Err(StartError::UnknownContext)
    );
    assert_eq!(small.state(foreign), None);
    assert_eq!(small.next_message(foreign), None);
}

#[test]
fn test_contexts_run_independently() {
    let mut engine = create_engine();
    let a = first_context(&mut engine, "publkey", "subkey");
    let b = engine.context(1).unwrap();
    engine.init(b, KeyPair::new("publkey", "subkey")).unwrap();

    engine.subscribe(a, "morava").unwrap();
    engine.publish(b, "jarak", "1").unwrap();

    engine.on_net_event(a, NetEvent::Connected);
    engine.on_net_event(b, NetEvent::Connected);
    engine.on_net_event(b, NetEvent::Data(b"HTTP/1.1 200\r\nContent-Length: 2\r\n\r\n[]"));
    engine.on_net_event(a, NetEvent::Data(b"HTTP/1.1 200\r\nContent-Length: 33\r\n\r\n"));
    engine.on_net_event(b, NetEvent::Closed);

    assert_eq!(engine.state(a), Some(ContextState::InTransaction));
    assert_eq!(engine.state(b), Some(ContextState::Idle));
    assert_eq!(completions(&engine).len(), 1);
    assert_eq!(completions(&engine)[0].ctx, b);

    engine.on_net_event(a, NetEvent::Data(b"[[\"Hi\",\"Fi\"],\"14179836755957292\"]"));
    engine.on_net_event(a, NetEvent::Closed);
    assert_eq!(drain_messages(&mut engine, a), ["\"Hi\"", "\"Fi\""]);
    assert_eq!(engine.time_token(b), Some("0"));
}

#[test]
fn test_context_reused_across_transactions() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "publkey", "subkey");

    for i in 0..5 {
        let message = i.to_string();
        engine.publish(ctx, "jarak", &message).unwrap();
        exchange_and_close(
            &mut engine,
            ctx,
            &format!("/publish/publkey/subkey/0/jarak/0/{i}"),
            &fixed_response("HTTP/1.1 200", "[1,\"Sent\",\"1\"]"),
        );
    }
    assert_eq!(completions(&engine).len(), 5);
    assert!(completions(&engine).iter().all(|c| c.outcome == Outcome::Ok));
}

#[test]
fn test_init_refused_while_busy() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "publkey", "subkey");
    engine.publish(ctx, "jarak", "1").unwrap();
    assert_eq!(
        engine.init(ctx, KeyPair::new("a", "b")),
        Err(StartError::InProgress)
    );
}
