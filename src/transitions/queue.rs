//! Ordered queue of optimistic transitions.

use crate::types::{Outcome, Status, TransitionId};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// A pure state transform.
pub struct Transition<S> {
    f: Arc<dyn Fn(S) -> S + Send + Sync>,
}

impl<S> Transition<S> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Apply the transform to a state value.
    pub fn apply(&self, state: S) -> S {
        (self.f)(state)
    }
}

impl<S> Clone for Transition<S> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<S> fmt::Debug for Transition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transition(..)")
    }
}

struct Entry<S> {
    id: TransitionId,
    status: Status,
    transition: Transition<S>,
}

/// Counters describing queue activity since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Transitions folded into canonical state.
    pub promoted: u64,
    /// Transitions discarded after rejection.
    pub discarded: u64,
}

/// FIFO of status-tagged transitions over a canonical state.
///
/// Canonical state only advances through the contiguous run of committed
/// entries at the head of the queue. A pending entry at the head blocks
/// everything behind it, committed or not. Rejected entries are dropped
/// wherever they sit. The preview is canonical state with every remaining
/// entry folded on top, in insertion order.
pub struct TransitionQueue<S> {
    canonical: S,
    preview: Arc<S>,
    entries: VecDeque<Entry<S>>,
    next_id: u64,
    stats: QueueStats,
}

impl<S: Clone> TransitionQueue<S> {
    pub fn new(initial: S) -> Self {
        Self {
            preview: Arc::new(initial.clone()),
            canonical: initial,
            entries: VecDeque::new(),
            next_id: 1,
            stats: QueueStats::default(),
        }
    }

    /// Append a pending transition at the tail and recompute.
    pub fn apply(&mut self, transition: Transition<S>) -> TransitionId {
        let id = TransitionId(self.next_id);
        self.next_id += 1;

        self.entries.push_back(Entry {
            id,
            status: Status::Pending,
            transition,
        });
        self.recompute();

        id
    }

    /// Resolve a pending transition and recompute.
    ///
    /// Returns false, leaving the queue untouched, if the entry was already
    /// resolved or is no longer queued.
    pub fn resolve(&mut self, id: TransitionId, outcome: Outcome) -> bool {
        let entry = match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) if entry.status == Status::Pending => entry,
            _ => return false,
        };

        entry.status = outcome.into();
        self.recompute();
        true
    }

    fn recompute(&mut self) {
        let promotable = self
            .entries
            .iter()
            .take_while(|e| e.status == Status::Committed)
            .count();
        if promotable > 0 {
            // Fold before draining so a panicking transition leaves the queue intact.
            let canonical = self
                .entries
                .iter()
                .take(promotable)
                .fold(self.canonical.clone(), |state, e| e.transition.apply(state));
            self.entries.drain(..promotable);
            self.canonical = canonical;
        }

        let before = self.entries.len();
        self.entries.retain(|e| e.status != Status::Rejected);

        self.stats.promoted += promotable as u64;
        self.stats.discarded += (before - self.entries.len()) as u64;

        let preview = self
            .entries
            .iter()
            .fold(self.canonical.clone(), |state, e| e.transition.apply(state));
        self.preview = Arc::new(preview);
    }

    /// Current canonical state.
    pub fn canonical(&self) -> &S {
        &self.canonical
    }

    /// Current preview state.
    pub fn preview(&self) -> Arc<S> {
        Arc::clone(&self.preview)
    }

    /// Status of a queued transition, or None once it has left the queue.
    pub fn status(&self, id: TransitionId) -> Option<Status> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.status)
    }

    /// Number of transitions still queued.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }
}
