//! Transport Failure Tests
//!
//! Timeouts, aborts and closes at each stage, send failures, and the
//! missed-messages time-token policy.

use crate::*;
use pollsub::ContextState;

fn subscribed_engine(config: ClientConfig) -> (TestEngine, ContextId) {
    let mut engine = create_engine_with(config);
    let ctx = first_context(&mut engine, "publkey", "drina");
    engine.subscribe(ctx, "morava").unwrap();
    let path = subscribe_path(&engine, "drina", "morava", "0", "");
    exchange_and_close(
        &mut engine,
        ctx,
        &path,
        &fixed_response("HTTP/1.1 200", "[[],\"14179857817724547\"]"),
    );
    assert_eq!(engine.time_token(ctx), Some("14179857817724547"));
    (engine, ctx)
}

#[test]
fn test_failures_while_connecting() {
    let cases = [
        (NetEvent::TimedOut, Outcome::Timeout),
        (NetEvent::Aborted, Outcome::Aborted),
        (NetEvent::Closed, Outcome::IoError),
    ];
    for (event, outcome) in cases {
        let mut engine = create_engine();
        let ctx = first_context(&mut engine, "publkey", "drina");
        engine.subscribe(ctx, "morava").unwrap();

        engine.on_net_event(ctx, event);
        assert_eq!(engine.state(ctx), Some(ContextState::Idle));
        assert_eq!(engine.last_result(ctx), Some(outcome));
        assert_eq!(engine.next_message(ctx), None);
        assert_eq!(engine.next_channel(ctx), None);
        assert_eq!(completions(&engine).len(), 1);
    }
}

#[test]
fn test_failures_while_reading() {
    let cases = [
        (NetEvent::TimedOut, Outcome::Timeout),
        (NetEvent::Aborted, Outcome::Aborted),
        (NetEvent::Closed, Outcome::IoError),
    ];
    for (event, outcome) in cases {
        let mut engine = create_engine();
        let ctx = first_context(&mut engine, "publkey", "tisa");
        engine.subscribe(ctx, "tamish").unwrap();
        let path = subscribe_path(&engine, "tisa", "tamish", "0", "");
        exchange(&mut engine, ctx, &path, "HTTP/1.1 200\r\nContent-Length: 30\r\n\r\n[[");

        engine.on_net_event(ctx, event);
        assert_eq!(engine.state(ctx), Some(ContextState::Idle));
        assert_eq!(engine.last_result(ctx), Some(outcome));
        assert_eq!(engine.next_message(ctx), None);
    }
}

#[test]
fn test_pending_outcome_survives_any_close() {
    for event in [NetEvent::Closed, NetEvent::Aborted, NetEvent::TimedOut] {
        let mut engine = create_engine();
        let ctx = first_context(&mut engine, "publkey", "subkey");
        engine.publish(ctx, "jarak", "1").unwrap();
        exchange(
            &mut engine,
            ctx,
            "/publish/publkey/subkey/0/jarak/0/1",
            &fixed_response("HTTP/1.1 200", "[1,\"Sent\",\"1\"]"),
        );
        assert_eq!(engine.state(ctx), Some(ContextState::WaitingForClose));

        engine.on_net_event(ctx, NetEvent::Data(b"stray"));
        assert_eq!(engine.state(ctx), Some(ContextState::WaitingForClose));

        engine.on_net_event(ctx, event);
        assert_eq!(engine.last_result(ctx), Some(Outcome::Ok));
    }
}

#[test]
fn test_send_failure_closes_with_io_error() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "publkey", "subkey");
    engine.publish(ctx, "jarak", "1").unwrap();

    engine.transport_mut().refuse_sends = true;
    engine.on_net_event(ctx, NetEvent::Connected);
    assert_eq!(engine.state(ctx), Some(ContextState::WaitingForClose));
    assert_eq!(engine.transport().closes, vec![ctx]);
    assert!(completions(&engine).is_empty());

    engine.on_net_event(ctx, NetEvent::Closed);
    assert_eq!(engine.last_result(ctx), Some(Outcome::IoError));
}

#[test]
fn test_failure_resets_time_token_when_accepting_missed_messages() {
    let (mut engine, ctx) = subscribed_engine(ClientConfig::new());

    engine.subscribe(ctx, "morava").unwrap();
    engine.on_net_event(ctx, NetEvent::TimedOut);
    assert_eq!(engine.last_result(ctx), Some(Outcome::Timeout));
    assert_eq!(engine.time_token(ctx), Some("0"));
}

#[test]
fn test_failure_keeps_time_token_otherwise() {
    let config = ClientConfig::new().accept_missed_messages(false);
    let (mut engine, ctx) = subscribed_engine(config);

    engine.subscribe(ctx, "morava").unwrap();
    engine.on_net_event(ctx, NetEvent::TimedOut);
    assert_eq!(engine.time_token(ctx), Some("14179857817724547"));

    engine.subscribe(ctx, "morava").unwrap();
    let path = subscribe_path(&engine, "drina", "morava", "14179857817724547", "");
    exchange_and_close(
        &mut engine,
        ctx,
        &path,
        &fixed_response("HTTP/1.1 500", "[[],\"14179857817724999\"]"),
    );
    assert_eq!(engine.last_result(ctx), Some(Outcome::HttpError(500)));
    assert_eq!(engine.time_token(ctx), Some("14179857817724999"));
}

#[test]
fn test_events_for_idle_context_are_ignored() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "publkey", "subkey");
    engine.on_net_event(ctx, NetEvent::Connected);
    engine.on_net_event(ctx, NetEvent::Data(b"HTTP/1.1 200\r\n"));
    engine.on_net_event(ctx, NetEvent::Closed);
    assert_eq!(engine.state(ctx), Some(ContextState::Idle));
    assert!(completions(&engine).is_empty());
}

#[test]
fn test_long_ignored_header_does_not_fail_transaction() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "publkey", "subkey");
    engine.publish(ctx, "jarak", "1").unwrap();

    let response = format!(
        "HTTP/1.1 200 OK\r\nAccess-Control-Allow-Headers: {}\r\nContent-Length: 3\r\n\r\n[1]",
        "x".repeat(300)
    );
    exchange_and_close(&mut engine, ctx, "/publish/publkey/subkey/0/jarak/0/1", &response);
    assert_eq!(engine.last_result(ctx), Some(Outcome::Ok));
    assert_eq!(engine.last_http_status(ctx), Some(200));
}

#[test]
fn test_long_status_line_is_io_error() {
    let mut engine = create_engine();
    let ctx = first_context(&mut engine, "publkey", "subkey");
    engine.publish(ctx, "jarak", "1").unwrap();

    let response = format!("HTTP/1.1 200 {}\r\nContent-Length: 3\r\n\r\n[1]", "O".repeat(300));
    exchange_and_close(&mut engine, ctx, "/publish/publkey/subkey/0/jarak/0/1", &response);
    assert_eq!(engine.last_result(ctx), Some(Outcome::IoError));
}
