//! Multicast channel with per-subscriber buffers.

use crate::error::{Result, StoreError};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

use super::types::{
    Backpressure, BroadcastConfig, DropReason, Published, SubscriptionHandle, SubscriptionId,
};

/// How long a blocked send waits before rechecking for shutdown or removal.
const BLOCK_RECHECK: Duration = Duration::from_millis(10);

/// One delivery path out of the broadcaster.
struct Outlet<T> {
    sender: Sender<T>,
    /// Receiver clone used to discard the oldest item under `DropOldest`.
    drain: Option<Receiver<T>>,
    /// Dead once the subscriber's handle is dropped. None for taps, which
    /// report disconnection through their own channel.
    alive: Option<Weak<()>>,
}

impl<T> Outlet<T> {
    fn is_alive(&self) -> bool {
        self.alive.as_ref().map_or(true, |alive| alive.strong_count() > 0)
    }
}

impl<T> Clone for Outlet<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            drain: self.drain.clone(),
            alive: self.alive.clone(),
        }
    }
}

enum Delivery {
    Sent,
    Skipped,
    Failed(DropReason),
}

/// Fans published items out to independent subscriber buffers.
///
/// Each subscriber owns a bounded channel, so a slow reader only fills its
/// own buffer. Items published before a subscriber registers are never
/// replayed to it. Publishing is serialized, so every subscriber sees items
/// in publish order.
pub struct Broadcaster<T> {
    config: BroadcastConfig,
    /// Active outlets by ID.
    outlets: RwLock<HashMap<SubscriptionId, Outlet<T>>>,
    /// Last published item, kept only when deduplicating. The lock also
    /// serializes publishers.
    last: Mutex<Option<T>>,
    same: Option<fn(&T, &T) -> bool>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl<T: Clone + Send + 'static> Broadcaster<T> {
    /// Create a broadcaster that forwards every published item.
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            config,
            outlets: RwLock::new(HashMap::new()),
            last: Mutex::new(None),
            same: None,
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a broadcaster that drops an item equal to the one published
    /// immediately before it.
    pub fn deduplicating(config: BroadcastConfig) -> Self
    where
        T: PartialEq,
    {
        Self {
            same: Some(<T as PartialEq>::eq),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    /// Register a new subscriber buffer.
    pub fn subscribe(&self) -> Result<SubscriptionHandle<T>> {
        // A zero-capacity channel never holds an item to discard.
        let (sender, receiver) = bounded(self.config.buffer_size.max(1));
        let alive = Arc::new(());

        let drain = match self.config.backpressure {
            Backpressure::DropOldest => Some(receiver.clone()),
            _ => None,
        };
        let outlet = Outlet {
            sender,
            drain,
            alive: Some(Arc::downgrade(&alive)),
        };
        let id = self.register(outlet)?;

        Ok(SubscriptionHandle {
            id,
            receiver,
            _alive: alive,
        })
    }

    /// Attach a caller-owned channel.
    ///
    /// Under `DropOldest` the broadcaster cannot reach into a foreign
    /// buffer, so a full tap misses the item instead.
    pub fn tap(&self, sender: Sender<T>) -> Result<SubscriptionId> {
        self.register(Outlet {
            sender,
            drain: None,
            alive: None,
        })
    }

    fn register(&self, outlet: Outlet<T>) -> Result<SubscriptionId> {
        let mut outlets = self.outlets.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        outlets.insert(id, outlet);
        debug!(subscription = id.0, "subscriber registered");
        Ok(id)
    }

    /// Remove an outlet. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.outlets.write().remove(&id).is_some();
        if removed {
            debug!(subscription = id.0, reason = ?DropReason::Unsubscribed, "subscriber removed");
        }
        removed
    }

    /// Publish an item to every registered outlet.
    pub fn publish(&self, item: T) -> Published {
        let mut last = self.last.lock();
        if self.closed.load(Ordering::Acquire) {
            return Published::Closed;
        }

        if let (Some(same), Some(prev)) = (self.same, last.as_ref()) {
            if same(prev, &item) {
                trace!("duplicate item suppressed");
                return Published::Suppressed;
            }
        }

        // Senders are cloned out so a blocking send never holds the registry
        // lock; unsubscribing stays non-blocking.
        let outlets: Vec<(SubscriptionId, Outlet<T>)> = self
            .outlets
            .read()
            .iter()
            .map(|(id, outlet)| (*id, outlet.clone()))
            .collect();

        let mut delivered = 0;
        let mut to_remove = Vec::new();
        for (id, outlet) in &outlets {
            match self.deliver(*id, outlet, item.clone()) {
                Delivery::Sent => delivered += 1,
                Delivery::Skipped => trace!(subscription = id.0, "tap full, item skipped"),
                Delivery::Failed(reason) => to_remove.push((*id, reason)),
            }
        }

        if !to_remove.is_empty() {
            let mut outlets = self.outlets.write();
            for (id, reason) in to_remove {
                if outlets.remove(&id).is_some() {
                    debug!(subscription = id.0, ?reason, "subscriber dropped");
                }
            }
        }

        if self.same.is_some() {
            *last = Some(item);
        }
        Published::Delivered(delivered)
    }

    fn deliver(&self, id: SubscriptionId, outlet: &Outlet<T>, item: T) -> Delivery {
        if !outlet.is_alive() {
            return Delivery::Failed(DropReason::Disconnected);
        }

        match self.config.backpressure {
            Backpressure::Block => {
                let mut item = item;
                loop {
                    match outlet.sender.send_timeout(item, BLOCK_RECHECK) {
                        Ok(()) => return Delivery::Sent,
                        Err(SendTimeoutError::Disconnected(_)) => {
                            return Delivery::Failed(DropReason::Disconnected)
                        }
                        Err(SendTimeoutError::Timeout(rejected)) => {
                            // Shutdown and removal must not wait on the reader.
                            if self.is_closed() || !self.outlets.read().contains_key(&id) {
                                return Delivery::Failed(DropReason::Unsubscribed);
                            }
                            if !outlet.is_alive() {
                                return Delivery::Failed(DropReason::Disconnected);
                            }
                            item = rejected;
                        }
                    }
                }
            }
            Backpressure::DropOldest => {
                let mut item = item;
                loop {
                    match outlet.sender.try_send(item) {
                        Ok(()) => return Delivery::Sent,
                        Err(TrySendError::Disconnected(_)) => {
                            return Delivery::Failed(DropReason::Disconnected)
                        }
                        Err(TrySendError::Full(rejected)) => match &outlet.drain {
                            Some(drain) => {
                                let _ = drain.try_recv();
                                item = rejected;
                            }
                            None => return Delivery::Skipped,
                        },
                    }
                }
            }
            Backpressure::DropSubscriber => match outlet.sender.try_send(item) {
                Ok(()) => Delivery::Sent,
                Err(TrySendError::Full(_)) => Delivery::Failed(DropReason::BufferOverflow),
                Err(TrySendError::Disconnected(_)) => Delivery::Failed(DropReason::Disconnected),
            },
        }
    }

    /// Disconnect every outlet and refuse further publishes.
    ///
    /// Subscribers still receive whatever was already buffered. Never waits
    /// on a publish in flight; a blocked send gives up once it sees the close.
    pub fn close(&self) {
        let mut outlets = self.outlets.write();
        self.closed.store(true, Ordering::Release);
        let count = outlets.len();
        outlets.clear();
        debug!(subscribers = count, "broadcaster closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.outlets.read().len()
    }
}
