//! Per-dispatch control surface handed to sync handlers.

use crate::broadcast::Broadcaster;
use crate::transitions::Transition;
use crate::types::{Action, Outcome, TransitionId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use super::producer::SharedProducer;

/// `apply`/`commit`/`reject` for one dispatched action.
///
/// Clones share the same remembered transition, so a handler can move a
/// clone into whatever finishes its operation and commit from there.
pub struct Controls<S, P> {
    producer: SharedProducer<S>,
    actions: Arc<Broadcaster<Arc<Action<P>>>>,
    action: Arc<Action<P>>,
    cached: Arc<Mutex<Option<TransitionId>>>,
}

impl<S, P> Clone for Controls<S, P> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            actions: Arc::clone(&self.actions),
            action: Arc::clone(&self.action),
            cached: Arc::clone(&self.cached),
        }
    }
}

impl<S, P> Controls<S, P>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub(crate) fn new(
        producer: SharedProducer<S>,
        actions: Arc<Broadcaster<Arc<Action<P>>>>,
        action: Arc<Action<P>>,
    ) -> Self {
        Self {
            producer,
            actions,
            action,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Apply a transition optimistically.
    ///
    /// A second call retargets later `commit`/`reject` at the new
    /// transition; the earlier one stays queued unresolved.
    pub fn apply<F>(&self, f: F) -> TransitionId
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        let id = self.producer.lock().apply(Transition::new(f));
        if let Some(previous) = self.cached.lock().replace(id) {
            debug!(action = %self.action.name, %previous, transition = %id, "apply retargeted");
        }
        id
    }

    /// Commit the applied transition. False if nothing was applied or the
    /// transition was already resolved elsewhere.
    pub fn commit(&self) -> bool {
        self.resolve(Outcome::Commit)
    }

    /// Reject the applied transition. False if nothing was applied or the
    /// transition was already resolved elsewhere.
    pub fn reject(&self) -> bool {
        self.resolve(Outcome::Reject)
    }

    fn resolve(&self, outcome: Outcome) -> bool {
        let id = match self.cached.lock().take() {
            Some(id) => id,
            None => {
                debug!(action = %self.action.name, ?outcome, "resolution without apply");
                return false;
            }
        };

        let resolved = self.producer.lock().resolve(id, outcome);
        if resolved {
            self.actions.publish(Arc::clone(&self.action));
        } else {
            debug!(action = %self.action.name, transition = %id, ?outcome, "transition already resolved");
        }
        resolved
    }

    /// The transition later resolutions will target, if any.
    pub fn applied(&self) -> Option<TransitionId> {
        *self.cached.lock()
    }

    /// The action being handled, without its completion signal.
    pub fn action(&self) -> &Action<P> {
        &self.action
    }
}
