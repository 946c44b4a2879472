#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Tests for message parsing, handler routing and synchronous replies
//!
//! # Test Coverage
//!
//! - Malformed payloads never reach a handler and never produce output
//! - Unregistered functions are reported as not handled
//! - Synchronous replies are written as `[callback_id, ...result]`
//! - Empty callback ids suppress the reply
//! - Registry bookkeeping (replacement, removal, listing)
//! - Handler panics are contained

mod common;

use callrouter::{MessageError, MessageOutcome};
use common::{register_add, router_fixture};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_add_replies_with_sum() {
    let (home, instance, mut router) = router_fixture();
    register_add(&mut router);

    let outcome = home.enter(|| router.handle_message(json!(["add", "cb-42", 3, 4])));

    assert!(matches!(outcome, MessageOutcome::Dispatched));
    assert_eq!(instance.values(), vec![json!(["cb-42", 7])]);
    assert_eq!(instance.posted()[0].text, r#"["cb-42",7]"#);
    assert_eq!(instance.posted()[0].runner, Some(home.handle().id()));
}

#[test]
fn test_raw_message_is_decoded() {
    let (home, instance, mut router) = router_fixture();
    register_add(&mut router);

    home.enter(|| router.handle_raw_message(r#"["add", "cb-1", 10, 20, 30]"#));

    assert_eq!(instance.values(), vec![json!(["cb-1", 60])]);
}

#[test]
fn test_raw_message_with_invalid_json_is_rejected() {
    let (home, instance, mut router) = router_fixture();
    register_add(&mut router);

    let outcome = home.enter(|| router.handle_raw_message("[\"add\", \"cb-1\""));

    assert!(matches!(
        outcome,
        MessageOutcome::Rejected(MessageError::Decode(_))
    ));
    assert_eq!(instance.count(), 0);
    assert_eq!(router.metrics().snapshot().rejected, 1);
}

#[test]
fn test_malformed_messages_reach_no_handler() {
    let (home, instance, mut router) = router_fixture();
    let invoked = Arc::new(AtomicUsize::new(0));
    for name in ["add", "1"] {
        let invoked = Arc::clone(&invoked);
        router.register(name, move |call| {
            invoked.fetch_add(1, Ordering::SeqCst);
            call.post_result(vec![]);
        });
    }

    let payloads = [
        json!(["add"]),
        json!([]),
        json!("add"),
        json!(42),
        json!(null),
        json!({"0": "add", "1": "cb"}),
        json!([1, "cb-1"]),
        json!(["add", 1]),
        json!(["add", null, 3]),
    ];
    for payload in payloads {
        let outcome = home.enter(|| router.handle_message(payload.clone()));
        assert!(
            matches!(outcome, MessageOutcome::Rejected(_)),
            "payload {payload} should be rejected"
        );
    }

    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    assert_eq!(instance.count(), 0);
    let metrics = router.metrics().snapshot();
    assert_eq!(metrics.received, 9);
    assert_eq!(metrics.rejected, 9);
    assert_eq!(metrics.dispatched, 0);
}

#[test]
fn test_rejection_reasons() {
    let (home, _instance, router) = router_fixture();

    let short = home.enter(|| router.handle_message(json!(["add"])));
    assert!(matches!(
        short,
        MessageOutcome::Rejected(MessageError::InvalidArgumentCount)
    ));

    let bad_name = home.enter(|| router.handle_message(json!([false, "cb"])));
    assert!(matches!(
        bad_name,
        MessageOutcome::Rejected(MessageError::FunctionNameNotString)
    ));

    let bad_id = home.enter(|| router.handle_message(json!(["add", ["cb"]])));
    assert!(matches!(
        bad_id,
        MessageOutcome::Rejected(MessageError::CallbackIdNotString)
    ));
}

#[test]
fn test_unregistered_function_is_not_handled() {
    let (home, instance, mut router) = router_fixture();
    register_add(&mut router);

    let outcome = home.enter(|| router.handle_message(json!(["missing", "cb-1"])));

    assert!(matches!(outcome, MessageOutcome::NotFound));
    assert!(!outcome.is_handled());
    assert_eq!(instance.count(), 0);
    assert_eq!(router.metrics().snapshot().not_found, 1);
}

#[test]
fn test_empty_callback_id_never_replies() {
    let (home, instance, mut router) = router_fixture();
    register_add(&mut router);

    let outcome = home.enter(|| router.handle_message(json!(["add", "", 1, 2])));

    assert!(matches!(outcome, MessageOutcome::Dispatched));
    assert_eq!(instance.count(), 0);
    assert_eq!(router.metrics().snapshot().replies_dropped, 1);
}

#[test]
fn test_handler_sees_arguments_in_order() {
    let (home, instance, mut router) = router_fixture();
    router.register("echo", |mut call| {
        assert_eq!(call.name(), "echo");
        assert_eq!(call.callback_id(), "cb-echo");
        let args = std::mem::take(call.arguments_mut());
        call.post_result(args);
    });

    let trailing = vec![
        json!({"nested": [1, 2]}),
        json!(null),
        json!("text"),
        json!(1.5),
        json!([true, false]),
    ];
    let mut message = vec![json!("echo"), json!("cb-echo")];
    message.extend(trailing.iter().cloned());
    home.enter(|| router.handle_message(Value::Array(message)));

    let mut expected = vec![json!("cb-echo")];
    expected.extend(trailing);
    assert_eq!(instance.values(), vec![Value::Array(expected)]);
}

#[test]
fn test_handler_without_reply_sends_nothing() {
    let (home, instance, mut router) = router_fixture();
    router.register("notify", |_call| {});

    let outcome = home.enter(|| router.handle_message(json!(["notify", "cb-9", "x"])));

    assert!(outcome.is_handled());
    assert_eq!(instance.count(), 0);
}

#[test]
fn test_multiple_result_values() {
    let (home, instance, mut router) = router_fixture();
    router.register("divmod", |call| {
        let a = call.argument(0).and_then(Value::as_i64).unwrap_or(0);
        let b = call.argument(1).and_then(Value::as_i64).unwrap_or(1);
        call.post_result(vec![json!(a / b), json!(a % b)]);
    });

    home.enter(|| router.handle_message(json!(["divmod", "q", 17, 5])));

    assert_eq!(instance.values(), vec![json!(["q", 3, 2])]);
}

#[test]
fn test_last_registration_wins() {
    let (home, instance, mut router) = router_fixture();
    assert!(!router.register("version", |call| call.post_result(vec![json!(1)])));
    assert!(router.register("version", |call| call.post_result(vec![json!(2)])));
    assert_eq!(router.handler_count(), 1);

    home.enter(|| router.handle_message(json!(["version", "v"])));

    assert_eq!(instance.values(), vec![json!(["v", 2])]);
}

#[test]
fn test_registry_bookkeeping() {
    let (home, instance, mut router) = router_fixture();
    register_add(&mut router);
    router.register("sub", |_call| {});

    assert_eq!(router.handler_names(), vec!["add", "sub"]);
    assert!(router.is_registered("add"));
    assert!(router.unregister("add"));
    assert!(!router.unregister("add"));
    assert!(!router.is_registered("add"));

    let outcome = home.enter(|| router.handle_message(json!(["add", "cb", 1])));
    assert!(matches!(outcome, MessageOutcome::NotFound));
    assert_eq!(instance.count(), 0);
}

#[test]
fn test_handler_panic_is_contained() {
    let (home, instance, mut router) = router_fixture();
    router.register("explode", |_call| panic!("handler bug"));
    register_add(&mut router);

    let outcome = home.enter(|| router.handle_message(json!(["explode", "cb-x"])));
    assert!(matches!(outcome, MessageOutcome::HandlerPanicked));

    home.enter(|| router.handle_message(json!(["add", "cb-y", 2, 2])));
    assert_eq!(instance.values(), vec![json!(["cb-y", 4])]);
    assert_eq!(router.metrics().snapshot().handler_panics, 1);
}

#[test]
fn test_each_call_gets_a_distinct_call_id() {
    let (home, _instance, mut router) = router_fixture();
    let ids = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = Arc::clone(&ids);
    router.register("noop", move |call| seen.lock().push(call.call_id()));

    home.enter(|| {
        router.handle_message(json!(["noop", "a"]));
        router.handle_message(json!(["noop", "a"]));
    });

    let ids = ids.lock();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn test_message_outside_any_runner_is_delivered_on_home() {
    let (home, instance, mut router) = router_fixture();
    register_add(&mut router);

    // No runner is current here, so the reply is routed via the home runner.
    router.handle_message(json!(["add", "cb-home", 1, 1]));
    assert_eq!(instance.count(), 0);

    assert_eq!(home.run_until_idle(), 1);
    let posted = instance.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].value(), json!(["cb-home", 2]));
    assert_eq!(posted[0].runner, Some(home.handle().id()));
}

#[test]
fn test_dispatch_call_forwards_into_another_router() {
    let (home, first_instance, mut first) = router_fixture();
    let (forwarded_tx, forwarded_rx) = std::sync::mpsc::channel();
    for name in ["add", "stray"] {
        let forwarded_tx = forwarded_tx.clone();
        first.register(name, move |call| forwarded_tx.send(call).unwrap());
    }

    home.enter(|| {
        first.handle_message(json!(["add", "cb-fwd", 5, 6]));
        first.handle_message(json!(["stray", "cb-stray"]));
    });
    let add_call = forwarded_rx.recv().unwrap();
    let stray_call = forwarded_rx.recv().unwrap();
    assert_eq!(add_call.name(), "add");
    assert_eq!(stray_call.name(), "stray");

    let (_second_home, second_instance, mut second) = router_fixture();
    register_add(&mut second);

    assert!(!second.dispatch_call(stray_call));
    assert!(home.enter(|| second.dispatch_call(add_call)));

    // The reply belongs to the router that parsed the request.
    assert_eq!(first_instance.values(), vec![json!(["cb-fwd", 11])]);
    assert_eq!(second_instance.count(), 0);
    let second_metrics = second.metrics().snapshot();
    assert_eq!(second_metrics.not_found, 1);
    assert_eq!(second_metrics.dispatched, 1);
    assert_eq!(first.metrics().snapshot().replies_delivered, 1);
}
