//! Broadcast configuration and receive handles.

use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// What the producer does when an outlet's buffer is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backpressure {
    /// Wait until the subscriber makes room. A stalled subscriber stalls
    /// the producer.
    Block,
    /// Discard the oldest buffered item for that subscriber and enqueue the
    /// new one. The producer never waits.
    #[default]
    DropOldest,
    /// Disconnect the subscriber. Its receiver drains what was buffered and
    /// then reports disconnection.
    DropSubscriber,
}

/// Configuration for a broadcaster.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Per-subscriber buffer capacity.
    /// Default: 100
    pub buffer_size: usize,

    /// Policy applied when a subscriber buffer is full.
    pub backpressure: Backpressure,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            backpressure: Backpressure::default(),
        }
    }
}

/// Result of a publish call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Published {
    /// Enqueued for this many outlets.
    Delivered(usize),
    /// Equal to the previously published item; nothing was sent.
    Suppressed,
    /// The broadcaster has been closed.
    Closed,
}

/// Why an outlet was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Receiving side went away.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Receiving end of a subscription.
///
/// Dropping the handle releases the outlet on the next publish.
pub struct SubscriptionHandle<T> {
    pub id: SubscriptionId,
    /// Channel to receive items.
    pub receiver: Receiver<T>,
    pub(crate) _alive: Arc<()>,
}

impl<T> SubscriptionHandle<T> {
    /// Receive the next item (blocking).
    pub fn recv(&self) -> Result<T, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an item (non-blocking).
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Iterate until the producer disconnects.
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, T> {
        self.receiver.iter()
    }

    /// Drain whatever is currently buffered.
    pub fn try_iter(&self) -> crossbeam_channel::TryIter<'_, T> {
        self.receiver.try_iter()
    }
}
