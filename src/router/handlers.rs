//! Handler registration.

use crate::types::{Action, Completion};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::controls::Controls;

/// Handler driving the apply/commit/reject cycle itself.
///
/// Receives the control surface, the payload, and the action's completion
/// signal if one was attached.
pub type SyncHandler<S, P> = Arc<dyn Fn(Controls<S, P>, &P, Option<Completion>) + Send + Sync>;

/// Pure transform applied optimistically while the action's completion
/// signal is outstanding.
pub type AsyncTransform<S, P> = Arc<dyn Fn(S, &Action<P>) -> S + Send + Sync>;

/// A registered handler.
pub enum Handler<S, P> {
    Sync(SyncHandler<S, P>),
    Async(AsyncTransform<S, P>),
}

impl<S, P> Clone for Handler<S, P> {
    fn clone(&self) -> Self {
        match self {
            Handler::Sync(f) => Handler::Sync(Arc::clone(f)),
            Handler::Async(f) => Handler::Async(Arc::clone(f)),
        }
    }
}

impl<S, P> fmt::Debug for Handler<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Sync(..)"),
            Handler::Async(_) => f.write_str("Async(..)"),
        }
    }
}

/// Mapping from action name to handler, fixed once the store is built.
///
/// Registering a name twice keeps the last registration.
pub struct Handlers<S, P = serde_json::Value> {
    by_name: HashMap<String, Handler<S, P>>,
}

impl<S, P> Handlers<S, P> {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    /// Register a handler that calls `apply`/`commit`/`reject` itself.
    pub fn on_sync<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Controls<S, P>, &P, Option<Completion>) + Send + Sync + 'static,
    {
        self.register(name.into(), Handler::Sync(Arc::new(handler)))
    }

    /// Register a transform resolved by the action's completion signal.
    pub fn on_async<F>(self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(S, &Action<P>) -> S + Send + Sync + 'static,
    {
        self.register(name.into(), Handler::Async(Arc::new(transform)))
    }

    fn register(mut self, name: String, handler: Handler<S, P>) -> Self {
        if let Some(previous) = self.by_name.insert(name.clone(), handler) {
            debug!(action = %name, ?previous, "handler replaced");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Handler<S, P>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl<S, P> Default for Handlers<S, P> {
    fn default() -> Self {
        Self::new()
    }
}
