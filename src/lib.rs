//! # callrouter
//!
//! **callrouter** is a function-call dispatch router: it sits between an untrusted message
//! channel and a set of locally registered handlers, and correlates asynchronous replies
//! with the requests that caused them.
//!
//! ## Overview
//!
//! Inbound messages are JSON lists `[function, callback_id, ...args]`. The router parses
//! them, hands each call to the handler registered under `function`, and later writes the
//! handler's reply back to the host instance as `[callback_id, ...result]`. An empty
//! `callback_id` marks a fire-and-forget call whose reply is discarded.
//!
//! Handlers may reply from any thread or runner. Replies are always delivered on the runner
//! the request arrived on, and are silently discarded if the router has been dropped in the
//! meantime.
//!
//! ## Architecture
//!
//! - **[`dispatcher`]** - [`DispatchRouter`], [`CallInfo`] and reply delivery
//! - **[`runner`]** - single-threaded execution contexts ([`LocalRunner`], [`RunnerThread`])
//! - **[`event_target`]** - listener-style calls built on the dispatcher
//! - **[`instance`]** - the host-side outbound channel
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`runtime_config`]** - environment configuration for runner threads
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Channel
//!     participant Router as DispatchRouter<br/>(home runner)
//!     participant Handler
//!     participant Worker as Worker runner
//!     participant Instance
//!
//!     Channel->>Router: ["add", "cb-42", 3, 4]
//!     Router->>Router: Validate shape,<br/>strip name and id
//!     Router->>Handler: CallInfo("add", [3, 4])
//!     Handler->>Worker: move Reply
//!     Worker->>Worker: compute 7
//!     Worker->>Router: Reply::send([7])<br/>(re-posted to home runner)
//!     Router->>Instance: post_message("[\"cb-42\",7]")
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use callrouter::{DispatchRouter, LocalRunner};
//! use serde_json::{json, Value};
//! use std::sync::{Arc, Mutex};
//!
//! let home = LocalRunner::new("home");
//! let sent = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&sent);
//! let mut router = DispatchRouter::new(
//!     Arc::new(move |msg: &str| sink.lock().unwrap().push(msg.to_string())),
//!     home.handle(),
//! );
//!
//! router.register("add", |call| {
//!     let sum: i64 = call.arguments().iter().filter_map(Value::as_i64).sum();
//!     call.post_result(vec![json!(sum)]);
//! });
//!
//! home.enter(|| router.handle_raw_message(r#"["add", "cb-42", 3, 4]"#));
//! assert_eq!(sent.lock().unwrap().as_slice(), [r#"["cb-42",7]"#]);
//! ```

pub mod dispatcher;
pub mod error;
pub mod event_target;
pub mod ids;
pub mod instance;
pub mod logging;
pub mod runner;
pub mod runtime_config;

pub use dispatcher::{
    parse_message, CallInfo, DispatchRouter, EventSink, Handler, MessageOutcome,
    MetricsSnapshot, Reply, RouterMetrics,
};
pub use error::{DeliveryError, MessageError, RunnerError};
pub use event_target::{EventHooks, EventTarget};
pub use ids::CallId;
pub use instance::Instance;
pub use runner::{LocalRunner, RunnerId, RunnerThread, TaskRunner};
pub use runtime_config::RuntimeConfig;
