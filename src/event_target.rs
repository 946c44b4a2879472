//! # Event Target
//!
//! Listener-style calls on top of the dispatcher. The sender subscribes with
//! `["addEventListener", callback_id, type]`; from then on every
//! [`EventTarget::dispatch_event`] for that type is delivered as
//! `[callback_id]` or `[callback_id, data]`, until
//! `["removeEventListener", "", type]` unsubscribes it.
//!
//! Only one listener is kept per event type. Adding a type twice, removing a type that
//! was never added, and dispatching to a type nobody listens to are logged and ignored.

use crate::dispatcher::{CallInfo, DispatchRouter, EventSink};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Function name used to subscribe to an event type.
pub const ADD_EVENT_LISTENER: &str = "addEventListener";
/// Function name used to unsubscribe from an event type.
pub const REMOVE_EVENT_LISTENER: &str = "removeEventListener";

/// Hooks invoked when an event type gains or loses its listener.
///
/// Typical use is starting and stopping the source that produces the events.
pub trait EventHooks: Send + Sync {
    fn start_event(&self, _event_type: &str) {}
    fn stop_event(&self, _event_type: &str) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl EventHooks for NoHooks {}

struct Inner {
    events: Mutex<HashMap<String, EventSink>>,
    hooks: Box<dyn EventHooks>,
}

/// Registry of event listeners, shared between the router's handlers and event producers.
#[derive(Clone)]
pub struct EventTarget {
    inner: Arc<Inner>,
}

impl Default for EventTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::with_hooks(NoHooks)
    }

    #[must_use]
    pub fn with_hooks(hooks: impl EventHooks + 'static) -> Self {
        EventTarget {
            inner: Arc::new(Inner {
                events: Mutex::new(HashMap::new()),
                hooks: Box::new(hooks),
            }),
        }
    }

    /// Register the listener functions on `router`.
    pub fn attach(&self, router: &mut DispatchRouter) {
        let target = self.clone();
        router.register(ADD_EVENT_LISTENER, move |info| {
            target.on_add_event_listener(info);
        });
        let target = self.clone();
        router.register(REMOVE_EVENT_LISTENER, move |info| {
            target.on_remove_event_listener(info);
        });
    }

    #[must_use]
    pub fn is_event_active(&self, event_type: &str) -> bool {
        self.events().contains_key(event_type)
    }

    /// Event types that currently have a listener, sorted.
    #[must_use]
    pub fn active_events(&self) -> Vec<String> {
        let mut types: Vec<String> = self.events().keys().cloned().collect();
        types.sort_unstable();
        types
    }

    /// Deliver an event to the listener of `event_type`. Returns `false` if nobody listens.
    pub fn dispatch_event(&self, event_type: &str, data: Option<Value>) -> bool {
        let Some(sink) = self.events().get(event_type).cloned() else {
            warn!(event_type = %event_type, "Attempt to dispatch to non-existing event");
            return false;
        };
        sink.post(data.into_iter().collect());
        true
    }

    fn on_add_event_listener(&self, info: CallInfo) {
        let Some(event_type) = event_type_argument(&info) else {
            return;
        };
        {
            let mut events = self.events();
            if events.contains_key(&event_type) {
                warn!(event_type = %event_type, "Trying to re-add the event");
                return;
            }
            events.insert(event_type.clone(), info.into_reply().into_event_sink());
        }
        debug!(event_type = %event_type, "Event listener added");
        self.inner.hooks.start_event(&event_type);
    }

    fn on_remove_event_listener(&self, info: CallInfo) {
        let Some(event_type) = event_type_argument(&info) else {
            return;
        };
        if !self.events().contains_key(&event_type) {
            warn!(event_type = %event_type, "Attempt to remove non-existing event");
            return;
        }
        self.inner.hooks.stop_event(&event_type);
        self.events().remove(&event_type);
        debug!(event_type = %event_type, "Event listener removed");
    }

    fn events(&self) -> MutexGuard<'_, HashMap<String, EventSink>> {
        self.inner
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn event_type_argument(info: &CallInfo) -> Option<String> {
    match info.argument(0) {
        Some(Value::String(event_type)) => Some(event_type.clone()),
        _ => {
            warn!(
                call_id = %info.call_id(),
                function = %info.name(),
                "Event type argument is missing or not a string"
            );
            None
        }
    }
}
