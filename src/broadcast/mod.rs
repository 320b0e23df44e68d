//! Fan-out of immutable snapshots to independent subscribers.
//!
//! A [`Broadcaster`] gives every subscriber its own bounded buffer:
//! - No replay: subscribers only see items published after registration
//! - Optional adjacent-duplicate suppression (structural equality)
//! - Configurable backpressure when a buffer fills up
//!
//! # Example
//!
//! ```ignore
//! let broadcaster = Broadcaster::deduplicating(BroadcastConfig::default());
//! let handle = broadcaster.subscribe()?;
//!
//! broadcaster.publish(Arc::new(state));
//! let snapshot = handle.recv()?;
//! ```

mod channel;
mod types;

pub use channel::Broadcaster;
pub use types::{
    Backpressure, BroadcastConfig, DropReason, Published, SubscriptionHandle, SubscriptionId,
};
