//! Transition queue coupled to its snapshot broadcaster.

use crate::broadcast::Broadcaster;
use crate::transitions::{QueueStats, Transition, TransitionQueue};
use crate::types::{Outcome, Status, TransitionId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Shared handle to a producer. All queue mutation goes through this lock.
pub(crate) type SharedProducer<S> = Arc<Mutex<Producer<S>>>;

/// Owns the canonical/preview pair and republishes the preview after every
/// queue mutation. Publishing happens under the producer lock, so snapshots
/// leave in the same order the queue produced them.
pub(crate) struct Producer<S> {
    queue: TransitionQueue<S>,
    states: Arc<Broadcaster<Arc<S>>>,
}

impl<S> Producer<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new(initial: S, states: Arc<Broadcaster<Arc<S>>>) -> Self {
        Self {
            queue: TransitionQueue::new(initial),
            states,
        }
    }

    pub(crate) fn apply(&mut self, transition: Transition<S>) -> TransitionId {
        let id = self.queue.apply(transition);
        debug!(transition = %id, queued = self.queue.len(), "transition applied");
        self.publish();
        id
    }

    pub(crate) fn resolve(&mut self, id: TransitionId, outcome: Outcome) -> bool {
        if !self.queue.resolve(id, outcome) {
            debug!(transition = %id, ?outcome, "stale resolution ignored");
            return false;
        }
        debug!(transition = %id, ?outcome, queued = self.queue.len(), "transition resolved");
        self.publish();
        true
    }

    fn publish(&self) {
        self.states.publish(self.queue.preview());
    }

    pub(crate) fn canonical(&self) -> &S {
        self.queue.canonical()
    }

    pub(crate) fn preview(&self) -> Arc<S> {
        self.queue.preview()
    }

    pub(crate) fn status(&self, id: TransitionId) -> Option<Status> {
        self.queue.status(id)
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn stats(&self) -> QueueStats {
        self.queue.stats()
    }
}
