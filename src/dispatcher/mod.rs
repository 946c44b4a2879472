//! # Dispatcher Module
//!
//! The dispatcher connects an untrusted message channel to locally registered handlers.
//!
//! ## Overview
//!
//! Messages arrive as decoded JSON lists of the form `[function, callback_id, ...args]`.
//! The [`DispatchRouter`]:
//! - validates the shape of the message before touching any field
//! - strips the function name and callback id, leaving the arguments in order
//! - hands a [`CallInfo`] to the handler registered under the function name
//! - carries the handler's reply back to the sender as `[callback_id, ...result]`
//!
//! ## Replies Across Runners
//!
//! A handler may answer synchronously, or move its [`Reply`] to another runner or thread
//! and answer later. Replies are always written to the host instance on the runner the
//! request arrived on: a reply sent from anywhere else re-posts itself onto that runner
//! first. Replies hold only a weak reference to the router, so a reply that arrives after
//! the router was dropped is discarded.
//!
//! ```text
//! handle_message ──► CallInfo ──► handler ──► Reply::send
//!                                                 │
//!                         ┌── not on origin ◄─────┤
//!                         ▼                       │ on origin
//!                  origin.post(retry)             ▼
//!                                      empty id? drop : [id, ...result]
//!                                                 │
//!                                      router alive? Instance::post_message
//! ```
//!
//! ## Error Handling
//!
//! - Malformed messages are logged at warn level and dropped
//! - Unregistered functions are logged at debug level and dropped
//! - Handler panics are caught and logged; the call is dropped
//! - Replies with an empty callback id are discarded
//!
//! None of these affect later messages.

mod call_info;
mod core;
mod metrics;

pub use self::call_info::{CallInfo, EventSink, Reply};
pub use self::core::{parse_message, DispatchRouter, Handler, MessageOutcome};
pub use self::metrics::{MetricsSnapshot, RouterMetrics};
