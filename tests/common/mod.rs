#![allow(dead_code)]

use callrouter::{DispatchRouter, Instance, LocalRunner, RunnerId, TaskRunner};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// One message written to the host instance, with the runner it was written from.
#[derive(Debug, Clone)]
pub struct Posted {
    pub text: String,
    pub runner: Option<RunnerId>,
}

impl Posted {
    pub fn value(&self) -> Value {
        serde_json::from_str(&self.text).expect("posted text is valid JSON")
    }
}

/// Host instance that records every outbound message.
#[derive(Default)]
pub struct RecordingInstance {
    posted: Mutex<Vec<Posted>>,
}

impl RecordingInstance {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.posted.lock().clone()
    }

    pub fn values(&self) -> Vec<Value> {
        self.posted().iter().map(Posted::value).collect()
    }

    pub fn count(&self) -> usize {
        self.posted.lock().len()
    }
}

impl Instance for RecordingInstance {
    fn post_message(&self, message: &str) {
        self.posted.lock().push(Posted {
            text: message.to_string(),
            runner: TaskRunner::current().map(|r| r.id()),
        });
    }
}

/// A router on a fresh home runner, recording its output.
pub fn router_fixture() -> (LocalRunner, Arc<RecordingInstance>, DispatchRouter) {
    let home = LocalRunner::new("home");
    let instance = RecordingInstance::new();
    let router = DispatchRouter::new(instance.clone(), home.handle());
    (home, instance, router)
}

/// Handler replying with the sum of its integer arguments.
pub fn register_add(router: &mut DispatchRouter) {
    router.register("add", |call| {
        let sum: i64 = call.arguments().iter().filter_map(Value::as_i64).sum();
        call.post_result(vec![Value::from(sum)]);
    });
}
