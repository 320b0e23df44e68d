//! Action dispatch to registered handlers.
//!
//! Each dispatched action takes one of three routes:
//! - **Sync**: the handler gets a [`Controls`] surface and drives
//!   `apply` → `commit`/`reject` itself
//! - **Async**: the registered transform is applied immediately and resolved
//!   by the action's completion signal (success commits, failure rejects)
//! - **Pass-through**: no handler; the action is only forwarded
//!
//! Every resolved or unhandled action is forwarded on the pass-through
//! stream for observers interested in raw actions.

mod controls;
mod handlers;
pub(crate) mod producer;

pub use controls::Controls;
pub use handlers::{AsyncTransform, Handler, Handlers, SyncHandler};

use crate::broadcast::Broadcaster;
use crate::error::{Result, StoreError};
use crate::transitions::Transition;
use crate::types::{Action, Completion, Outcome, TransitionId};
use parking_lot::Mutex;
use producer::SharedProducer;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, trace, warn};

/// How a dispatched action was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Handed to a sync handler.
    Sync,
    /// Applied as this transition, awaiting its completion signal.
    Async(TransitionId),
    /// No handler registered; forwarded unchanged.
    PassThrough,
}

/// Routes actions to handlers against a shared producer.
pub struct ActionRouter<S, P> {
    handlers: Handlers<S, P>,
    producer: SharedProducer<S>,
    actions: Arc<Broadcaster<Arc<Action<P>>>>,
    completion_timeout: Option<Duration>,
}

impl<S, P> ActionRouter<S, P>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub(crate) fn new(
        handlers: Handlers<S, P>,
        producer: SharedProducer<S>,
        actions: Arc<Broadcaster<Arc<Action<P>>>>,
        completion_timeout: Option<Duration>,
    ) -> Self {
        Self {
            handlers,
            producer,
            actions,
            completion_timeout,
        }
    }

    /// Route one action.
    ///
    /// Only fails if the thread watching an async completion cannot be
    /// started; the transition is rejected and the action forwarded first.
    pub fn dispatch(&self, action: Action<P>) -> Result<Route> {
        let (action, completion) = action.split();
        let action = Arc::new(action);

        match self.handlers.get(&action.name) {
            Some(Handler::Sync(handler)) => {
                trace!(action = %action.name, "sync dispatch");
                let controls = Controls::new(
                    Arc::clone(&self.producer),
                    Arc::clone(&self.actions),
                    Arc::clone(&action),
                );
                handler(controls, &action.payload, completion);
                Ok(Route::Sync)
            }
            Some(Handler::Async(transform)) => {
                let id = self.apply_transform(Arc::clone(transform), Arc::clone(&action));
                trace!(action = %action.name, transition = %id, "async dispatch");
                self.await_completion(id, action, completion)?;
                Ok(Route::Async(id))
            }
            None => {
                trace!(action = %action.name, "pass-through");
                self.actions.publish(action);
                Ok(Route::PassThrough)
            }
        }
    }

    fn apply_transform(&self, transform: AsyncTransform<S, P>, action: Arc<Action<P>>) -> TransitionId {
        let transition = Transition::new(move |state: S| transform(state, &action));
        self.producer.lock().apply(transition)
    }

    fn await_completion(
        &self,
        id: TransitionId,
        action: Arc<Action<P>>,
        completion: Option<Completion>,
    ) -> Result<()> {
        let completion = match completion {
            Some(completion) => completion,
            None => {
                settle(&self.producer, &self.actions, action, id, Ok(()));
                return Ok(());
            }
        };

        let producer = Arc::clone(&self.producer);
        let actions = Arc::clone(&self.actions);
        let watched = Arc::clone(&action);
        let timeout = self.completion_timeout;

        let spawned = thread::Builder::new()
            .name(format!("provisional-completion-{}", id))
            .spawn(move || {
                let result = match timeout {
                    Some(timeout) => completion.wait_timeout(timeout),
                    None => completion.wait(),
                };
                settle(&producer, &actions, watched, id, result);
            });

        if let Err(e) = spawned {
            error!(action = %action.name, transition = %id, error = %e, "failed to watch completion");
            let reason = StoreError::HandlerFailed(format!("completion watcher not started: {}", e));
            settle(&self.producer, &self.actions, action, id, Err(reason));
            return Err(StoreError::Io(e));
        }
        Ok(())
    }

    pub fn handlers(&self) -> &Handlers<S, P> {
        &self.handlers
    }
}

/// Resolve an async transition from its completion result and forward the
/// action. Failures are logged, never propagated.
fn settle<S, P>(
    producer: &Mutex<producer::Producer<S>>,
    actions: &Broadcaster<Arc<Action<P>>>,
    action: Arc<Action<P>>,
    id: TransitionId,
    result: Result<()>,
) where
    S: Clone + PartialEq + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    let outcome = match result {
        Ok(()) => Outcome::Commit,
        Err(error) => {
            warn!(action = %action.name, transition = %id, %error, "async handler failed, rolling back");
            Outcome::Reject
        }
    };

    producer.lock().resolve(id, outcome);
    actions.publish(action);
}
