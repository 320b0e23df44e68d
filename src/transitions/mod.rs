//! Optimistic transition queue.
//!
//! Transitions are pure `S -> S` functions applied speculatively and later
//! committed or rejected. Canonical state advances strictly in insertion
//! order; everything still unresolved is overlaid on top to form the preview
//! that observers see.

mod queue;

pub use queue::{QueueStats, Transition, TransitionQueue};
