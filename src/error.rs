//! Error types for message parsing, reply delivery and task runners.
//!
//! None of these escape [`DispatchRouter::handle_message`](crate::DispatchRouter::handle_message):
//! every failure is terminal for the single message in question, gets logged, and is
//! surfaced to callers only as part of a [`MessageOutcome`](crate::MessageOutcome).

use thiserror::Error;

/// Reasons an inbound payload is rejected before any handler runs.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Invalid number of arguments")]
    InvalidArgumentCount,

    #[error("The function name is not a string")]
    FunctionNameNotString,

    #[error("The callback id is not a string")]
    CallbackIdNotString,

    #[error("Payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure while pushing a reply through the host instance.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to serialize reply: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure while posting to or starting a task runner.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Runner '{runner}' is no longer accepting tasks")]
    Closed { runner: String },

    #[error("Failed to spawn runner thread: {0}")]
    Spawn(#[from] std::io::Error),
}
