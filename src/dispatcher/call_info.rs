//! One inbound call and the means to answer it.

use super::core::{dispatch_result, RouterCore};
use crate::ids::CallId;
use crate::runner::TaskRunner;
use serde_json::Value;
use std::fmt;
use std::sync::Weak;

/// Everything needed to route a reply back to where its request came from.
#[derive(Clone)]
pub(crate) struct ReplyTarget {
    pub(crate) router: Weak<RouterCore>,
    pub(crate) origin: TaskRunner,
    pub(crate) callback_id: String,
    pub(crate) call_id: CallId,
    /// Times this reply has been re-posted towards `origin`
    pub(crate) hops: u32,
}

/// Single-shot completion callback of a call.
///
/// [`send`](Reply::send) consumes the reply, so a handler can answer a call at most once.
/// The reply is `Send` and may be moved to, and sent from, any thread or runner; delivery
/// always happens on the runner that received the request.
pub struct Reply {
    target: ReplyTarget,
}

impl Reply {
    pub(crate) fn new(target: ReplyTarget) -> Self {
        Reply { target }
    }

    /// The correlation token the sender attached to the request.
    #[must_use]
    pub fn callback_id(&self) -> &str {
        &self.target.callback_id
    }

    /// False for fire-and-forget calls, whose replies are discarded.
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        !self.target.callback_id.is_empty()
    }

    /// Deliver `result` to the sender as `[callback_id, ...result]`.
    pub fn send(self, result: Vec<Value>) {
        dispatch_result(self.target, result);
    }

    /// Turn this reply into a sink that may post any number of results.
    #[must_use]
    pub fn into_event_sink(self) -> EventSink {
        EventSink {
            target: self.target,
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("callback_id", &self.target.callback_id)
            .field("call_id", &self.target.call_id)
            .field("origin", &self.target.origin)
            .finish()
    }
}

/// Multi-shot reply channel for listener-style calls that keep answering.
///
/// Each [`post`](EventSink::post) follows the same routing rules as [`Reply::send`].
#[derive(Clone)]
pub struct EventSink {
    target: ReplyTarget,
}

impl EventSink {
    #[must_use]
    pub fn callback_id(&self) -> &str {
        &self.target.callback_id
    }

    pub fn post(&self, result: Vec<Value>) {
        dispatch_result(self.target.clone(), result);
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("callback_id", &self.target.callback_id)
            .field("origin", &self.target.origin)
            .finish()
    }
}

/// A parsed inbound call, owned by the handler it is routed to.
#[derive(Debug)]
pub struct CallInfo {
    call_id: CallId,
    name: String,
    arguments: Vec<Value>,
    reply: Reply,
}

impl CallInfo {
    pub(crate) fn new(call_id: CallId, name: String, arguments: Vec<Value>, reply: Reply) -> Self {
        CallInfo {
            call_id,
            name,
            arguments,
            reply,
        }
    }

    /// Registered handler name this call was routed by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    #[must_use]
    pub fn callback_id(&self) -> &str {
        self.reply.callback_id()
    }

    /// Arguments in the order the sender listed them.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut Vec<Value> {
        &mut self.arguments
    }

    /// Get an argument by position.
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    /// Answer the call. Consumes the call, so it can be answered at most once.
    pub fn post_result(self, result: Vec<Value>) {
        self.reply.send(result);
    }

    /// Split the call so the reply can travel separately, e.g. to a worker runner.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Value>, Reply) {
        (self.name, self.arguments, self.reply)
    }

    #[must_use]
    pub fn into_reply(self) -> Reply {
        self.reply
    }
}
