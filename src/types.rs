//! Core types for the store.

use crate::error::{Result, StoreError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Handle identifying one entry in the transition queue.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub u64);

impl fmt::Debug for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransitionId({})", self.0)
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolution status of a queued transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Applied optimistically, not yet resolved.
    Pending,
    /// Resolved as accepted; folded into canonical state once it reaches the head.
    Committed,
    /// Resolved as discarded; contributes nothing.
    Rejected,
}

/// How a pending transition is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Commit,
    Reject,
}

impl From<Outcome> for Status {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Commit => Status::Committed,
            Outcome::Reject => Status::Rejected,
        }
    }
}

/// An inbound event routed to a registered handler.
///
/// The completion signal is only meaningful for actions whose handler
/// performs an asynchronous operation; it is detached before the action is
/// forwarded on the pass-through stream.
#[derive(Debug)]
pub struct Action<P = serde_json::Value> {
    pub name: String,
    pub payload: P,
    pub completion: Option<Completion>,
}

impl<P> Action<P> {
    /// Create an action without a completion signal.
    pub fn new(name: impl Into<String>, payload: P) -> Self {
        Self {
            name: name.into(),
            payload,
            completion: None,
        }
    }

    /// Attach a completion signal.
    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Detach the completion signal from the action.
    pub fn split(mut self) -> (Self, Option<Completion>) {
        let completion = self.completion.take();
        (self, completion)
    }
}

/// Create a linked completion pair.
///
/// The [`Completer`] side is kept by whoever runs the asynchronous
/// operation; the [`Completion`] side travels with the action.
pub fn completion() -> (Completer, Completion) {
    let (sender, receiver) = bounded(1);
    (Completer { sender }, Completion { receiver })
}

/// Resolving side of a completion signal.
#[derive(Debug)]
pub struct Completer {
    sender: Sender<std::result::Result<(), String>>,
}

impl Completer {
    /// Signal that the asynchronous operation succeeded.
    pub fn succeed(self) {
        let _ = self.sender.send(Ok(()));
    }

    /// Signal that the asynchronous operation failed.
    pub fn fail(self, error: impl fmt::Display) {
        let _ = self.sender.send(Err(error.to_string()));
    }
}

/// Awaitable side of a completion signal.
pub struct Completion {
    receiver: Receiver<std::result::Result<(), String>>,
}

impl Completion {
    /// A completion that has already succeeded.
    pub fn succeeded() -> Self {
        let (completer, completion) = completion();
        completer.succeed();
        completion
    }

    /// A completion that has already failed.
    pub fn failed(error: impl fmt::Display) -> Self {
        let (completer, completion) = completion();
        completer.fail(error);
        completion
    }

    /// Block until the signal resolves.
    pub fn wait(self) -> Result<()> {
        match self.receiver.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(StoreError::HandlerFailed(message)),
            Err(_) => Err(StoreError::CompletionDropped),
        }
    }

    /// Block until the signal resolves or the timeout elapses.
    pub fn wait_timeout(self, timeout: Duration) -> Result<()> {
        match self.receiver.recv_timeout(timeout) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(StoreError::HandlerFailed(message)),
            Err(RecvTimeoutError::Timeout) => Err(StoreError::CompletionTimedOut(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(StoreError::CompletionDropped),
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("ready", &!self.receiver.is_empty())
            .finish()
    }
}
