//! Dispatcher core - registry, message parsing and reply delivery.

use super::call_info::{CallInfo, Reply, ReplyTarget};
use super::metrics::RouterMetrics;
use crate::error::{DeliveryError, MessageError};
use crate::ids::CallId;
use crate::instance::Instance;
use crate::runner::TaskRunner;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// A registered function implementation.
pub type Handler = Box<dyn Fn(CallInfo) + Send + 'static>;

/// What became of one inbound message.
#[derive(Debug)]
pub enum MessageOutcome {
    /// A handler received the call
    Dispatched,
    /// Well-formed, but no handler is registered under the function name
    NotFound,
    /// The handler panicked while being invoked
    HandlerPanicked,
    /// The payload was malformed and dropped
    Rejected(MessageError),
}

impl MessageOutcome {
    /// Whether a handler took the call (the "handled" signal of `dispatch_call`).
    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(self, MessageOutcome::Dispatched | MessageOutcome::HandlerPanicked)
    }
}

/// The part of a router that outstanding replies refer to.
///
/// Replies hold it through a `Weak`, which stops resolving once the owning
/// [`DispatchRouter`] is dropped.
pub(crate) struct RouterCore {
    instance: Arc<dyn Instance>,
    metrics: RouterMetrics,
}

impl RouterCore {
    /// Serialize `message` to wire text and hand it to the host instance.
    fn post_message_to_instance(&self, message: &Value) -> Result<(), DeliveryError> {
        let text = serde_json::to_string(message)?;
        self.instance.post_message(&text);
        Ok(())
    }
}

/// Routes inbound `[function, callback_id, ...args]` messages to registered handlers
/// and carries their replies back to the sender.
///
/// Register handlers first, then feed messages from the router's home runner:
///
/// ```rust
/// use callrouter::{DispatchRouter, LocalRunner};
/// use serde_json::json;
/// use std::sync::{Arc, Mutex};
///
/// let home = LocalRunner::new("home");
/// let sent = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&sent);
/// let instance = Arc::new(move |msg: &str| sink.lock().unwrap().push(msg.to_string()));
///
/// let mut router = DispatchRouter::new(instance, home.handle());
/// router.register("echo", |call| {
///     let args = call.arguments().to_vec();
///     call.post_result(args);
/// });
///
/// home.enter(|| router.handle_message(json!(["echo", "cb-1", "hi"])));
/// assert_eq!(sent.lock().unwrap().as_slice(), [r#"["cb-1","hi"]"#]);
/// ```
pub struct DispatchRouter {
    handlers: HashMap<String, Handler>,
    core: Arc<RouterCore>,
    home: TaskRunner,
}

impl DispatchRouter {
    /// Create a router delivering through `instance`.
    ///
    /// `home` is the runner used as the originating context for messages handled
    /// outside of any runner.
    #[must_use]
    pub fn new(instance: Arc<dyn Instance>, home: TaskRunner) -> Self {
        DispatchRouter {
            handlers: HashMap::new(),
            core: Arc::new(RouterCore {
                instance,
                metrics: RouterMetrics::new(),
            }),
            home,
        }
    }

    /// Register `handler` under `name`.
    ///
    /// The last registration for a name wins. Returns `true` when an earlier handler
    /// was replaced.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> bool
    where
        F: Fn(CallInfo) + Send + 'static,
    {
        let name = name.into();
        let replaced = self.handlers.insert(name.clone(), Box::new(handler)).is_some();
        if replaced {
            warn!(
                function = %name,
                total_handlers = self.handlers.len(),
                "Replaced existing handler"
            );
        } else {
            info!(
                function = %name,
                total_handlers = self.handlers.len(),
                "Handler registered"
            );
        }
        replaced
    }

    /// Remove the handler registered under `name`.
    pub fn unregister(&mut self, name: &str) -> bool {
        let removed = self.handlers.remove(name).is_some();
        if removed {
            info!(function = %name, "Handler unregistered");
        }
        removed
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered function names, sorted.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn metrics(&self) -> &RouterMetrics {
        &self.core.metrics
    }

    #[must_use]
    pub fn home(&self) -> &TaskRunner {
        &self.home
    }

    /// Decode wire text and handle the resulting message.
    pub fn handle_raw_message(&self, text: &str) -> MessageOutcome {
        match serde_json::from_str::<Value>(text) {
            Ok(message) => self.handle_message(message),
            Err(e) => {
                self.core.metrics.record_received();
                self.reject(MessageError::from(e))
            }
        }
    }

    /// Parse one decoded message and route it to its handler.
    ///
    /// Never fails: malformed messages are logged and dropped, and the outcome is
    /// returned for the caller's information only.
    pub fn handle_message(&self, message: Value) -> MessageOutcome {
        self.core.metrics.record_received();

        let (name, callback_id, arguments) = match parse_message(message) {
            Ok(parts) => parts,
            Err(e) => return self.reject(e),
        };

        let call_id = CallId::new();
        let origin = TaskRunner::current().unwrap_or_else(|| self.home.clone());

        debug!(
            call_id = %call_id,
            function = %name,
            callback_id = %callback_id,
            argument_count = arguments.len(),
            runner = %origin.name(),
            "Message received"
        );

        let reply = Reply::new(ReplyTarget {
            router: Arc::downgrade(&self.core),
            origin,
            callback_id,
            call_id,
            hops: 0,
        });
        let info = CallInfo::new(call_id, name.clone(), arguments, reply);

        let outcome = self.route(info);
        if matches!(outcome, MessageOutcome::NotFound) {
            debug!(call_id = %call_id, function = %name, "Function not registered");
        }
        outcome
    }

    /// Hand `info` to the handler registered under its name.
    ///
    /// Returns `false` when no handler is registered. The handler's eventual reply is not
    /// awaited.
    pub fn dispatch_call(&self, info: CallInfo) -> bool {
        self.route(info).is_handled()
    }

    fn route(&self, info: CallInfo) -> MessageOutcome {
        let Some(handler) = self.handlers.get(info.name()) else {
            self.core.metrics.record_not_found();
            return MessageOutcome::NotFound;
        };

        let call_id = info.call_id();
        self.core.metrics.record_dispatched();
        trace!(call_id = %call_id, function = %info.name(), "Invoking handler");

        if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(info)))
        {
            self.core.metrics.record_handler_panic();
            error!(
                call_id = %call_id,
                panic_message = ?panic,
                "Handler panicked - call dropped"
            );
            return MessageOutcome::HandlerPanicked;
        }
        MessageOutcome::Dispatched
    }

    fn reject(&self, e: MessageError) -> MessageOutcome {
        self.core.metrics.record_rejected();
        warn!(error = %e, "Dropping malformed message");
        MessageOutcome::Rejected(e)
    }
}

impl Drop for DispatchRouter {
    fn drop(&mut self) {
        debug!(
            handlers = self.handlers.len(),
            "Router dropped - outstanding replies will be discarded"
        );
    }
}

/// Split a decoded `[function, callback_id, ...args]` message into its parts.
///
/// The trailing arguments keep their order.
pub fn parse_message(message: Value) -> Result<(String, String, Vec<Value>), MessageError> {
    let Value::Array(mut args) = message else {
        return Err(MessageError::InvalidArgumentCount);
    };
    if args.len() < 2 {
        return Err(MessageError::InvalidArgumentCount);
    }

    let arguments = args.split_off(2);
    let mut head = args.into_iter();
    let Some(Value::String(name)) = head.next() else {
        return Err(MessageError::FunctionNameNotString);
    };
    let Some(Value::String(callback_id)) = head.next() else {
        return Err(MessageError::CallbackIdNotString);
    };
    Ok((name, callback_id, arguments))
}

/// Deliver a handler's result for the call described by `target`.
///
/// Runs wherever the handler replied from. Off the originating runner it only re-posts
/// itself there; router state is touched exclusively on that runner.
pub(crate) fn dispatch_result(mut target: ReplyTarget, result: Vec<Value>) {
    if !target.origin.is_current() {
        let origin = target.origin.clone();
        let call_id = target.call_id;
        target.hops += 1;
        if let Err(e) = origin.post(move || dispatch_result(target, result)) {
            debug!(
                call_id = %call_id,
                runner = %origin.name(),
                error = %e,
                "Originating runner is gone - reply dropped"
            );
        }
        return;
    }

    let router = target.router.upgrade();
    if target.hops > 0 {
        if let Some(core) = &router {
            core.metrics.record_redirect();
        }
    }

    if target.callback_id.is_empty() {
        debug!(
            call_id = %target.call_id,
            "Sending a reply with an empty callback id has no effect"
        );
        if let Some(core) = &router {
            core.metrics.record_reply_dropped();
        }
        return;
    }

    let Some(core) = router else {
        return;
    };

    let mut payload = Vec::with_capacity(result.len() + 1);
    payload.push(Value::String(target.callback_id));
    payload.extend(result);

    match core.post_message_to_instance(&Value::Array(payload)) {
        Ok(()) => {
            core.metrics.record_reply_delivered();
            trace!(call_id = %target.call_id, hops = target.hops, "Reply delivered");
        }
        Err(e) => {
            core.metrics.record_reply_dropped();
            error!(call_id = %target.call_id, error = %e, "Failed to deliver reply");
        }
    }
}
