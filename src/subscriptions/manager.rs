//! Callback subscriptions over a broadcaster.

use crate::broadcast::{Backpressure, Broadcaster, DropReason, SubscriptionHandle, SubscriptionId};
use crate::error::{BoxError, Result, StoreError};
use crossbeam_channel::Sender;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, warn};

use super::types::Subscription;

/// Observable view of a broadcaster with a mapping applied to every item.
pub struct Observable<T, U> {
    broadcaster: Arc<Broadcaster<T>>,
    map: Arc<dyn Fn(T) -> U + Send + Sync>,
}

impl<T, U> Clone for Observable<T, U> {
    fn clone(&self) -> Self {
        Self {
            broadcaster: Arc::clone(&self.broadcaster),
            map: Arc::clone(&self.map),
        }
    }
}

impl<T, U> Observable<T, U>
where
    T: Clone + Send + 'static,
    U: 'static,
{
    /// Compose another mapping after this one.
    pub fn map<V, F>(self, f: F) -> Observable<T, V>
    where
        V: 'static,
        F: Fn(U) -> V + Send + Sync + 'static,
    {
        let inner = self.map;
        Observable {
            broadcaster: self.broadcaster,
            map: Arc::new(move |item: T| f(inner(item))),
        }
    }

    /// Deliver mapped items to `on_next` on a dedicated thread.
    ///
    /// An `Err` or panic from `on_next` (or from the mapping) ends the
    /// subscription and is handed to `on_error`, as is eviction by the
    /// broadcaster. `on_completed` runs only when the producer shuts down; it
    /// does not run after [`Subscription::dispose`].
    pub fn subscribe<N, E, C>(&self, on_next: N, on_error: E, on_completed: C) -> Result<Subscription>
    where
        N: FnMut(U) -> std::result::Result<(), BoxError> + Send + 'static,
        E: FnOnce(StoreError) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let handle = self.broadcaster.subscribe()?;
        let id = handle.id;
        let disposed = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let weak = Arc::downgrade(&self.broadcaster);

        let worker = Worker {
            handle,
            map: Arc::clone(&self.map),
            disposed: Arc::clone(&disposed),
            finished: Arc::clone(&finished),
            broadcaster: weak.clone(),
        };
        thread::Builder::new()
            .name(format!("provisional-subscriber-{}", id.0))
            .spawn(move || worker.run(on_next, on_error, on_completed))?;

        Ok(Subscription {
            id,
            disposed,
            finished,
            detach: Box::new(move |id| weak.upgrade().is_some_and(|b| b.unsubscribe(id))),
        })
    }
}

struct Worker<T, U> {
    handle: SubscriptionHandle<T>,
    map: Arc<dyn Fn(T) -> U + Send + Sync>,
    disposed: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    broadcaster: Weak<Broadcaster<T>>,
}

impl<T: Clone + Send + 'static, U> Worker<T, U> {
    fn run<N, E, C>(self, mut on_next: N, on_error: E, on_completed: C)
    where
        N: FnMut(U) -> std::result::Result<(), BoxError>,
        E: FnOnce(StoreError),
        C: FnOnce(),
    {
        let id = self.handle.id;
        let map = &self.map;

        let failure = loop {
            let item = match self.handle.recv() {
                Ok(item) => item,
                Err(_) => break None,
            };
            if self.disposed.load(Ordering::Acquire) {
                break None;
            }

            match catch_unwind(AssertUnwindSafe(|| on_next(map(item)))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => break Some(StoreError::Subscriber(e)),
                Err(panic) => break Some(StoreError::SubscriberPanicked(panic_message(&*panic))),
            }
        };
        self.finished.store(true, Ordering::Release);

        match failure {
            Some(error) => {
                warn!(subscription = id.0, %error, "subscriber failed, detaching");
                if let Some(broadcaster) = self.broadcaster.upgrade() {
                    broadcaster.unsubscribe(id);
                }
                on_error(error);
            }
            None if self.disposed.load(Ordering::Acquire) => {}
            None => match self.broadcaster.upgrade() {
                Some(broadcaster) if !broadcaster.is_closed() => {
                    let reason = match broadcaster.config().backpressure {
                        Backpressure::DropSubscriber => DropReason::BufferOverflow,
                        _ => DropReason::Unsubscribed,
                    };
                    warn!(subscription = id.0, ?reason, "subscriber evicted");
                    on_error(StoreError::SubscriberDropped(reason));
                }
                _ => {
                    debug!(subscription = id.0, "producer closed");
                    on_completed();
                }
            },
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Subscribe/observe wrapper over a shared broadcaster.
pub struct SubscriptionManager<T> {
    broadcaster: Arc<Broadcaster<T>>,
}

impl<T> Clone for SubscriptionManager<T> {
    fn clone(&self) -> Self {
        Self {
            broadcaster: Arc::clone(&self.broadcaster),
        }
    }
}

impl<T: Clone + Send + 'static> SubscriptionManager<T> {
    pub fn new(broadcaster: Arc<Broadcaster<T>>) -> Self {
        Self { broadcaster }
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster<T>> {
        &self.broadcaster
    }

    /// Subscribe with callbacks receiving items unchanged.
    pub fn subscribe<N, E, C>(&self, on_next: N, on_error: E, on_completed: C) -> Result<Subscription>
    where
        N: FnMut(T) -> std::result::Result<(), BoxError> + Send + 'static,
        E: FnOnce(StoreError) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.observe(|item| item).subscribe(on_next, on_error, on_completed)
    }

    /// Observable view applying `map` to every delivered item.
    pub fn observe<U, F>(&self, map: F) -> Observable<T, U>
    where
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Observable {
            broadcaster: Arc::clone(&self.broadcaster),
            map: Arc::new(map),
        }
    }

    /// Raw receive handle, for callers that drive their own loop.
    pub fn watch(&self) -> Result<SubscriptionHandle<T>> {
        self.broadcaster.subscribe()
    }

    /// Attach a caller-owned channel.
    pub fn tap(&self, sender: Sender<T>) -> Result<SubscriptionId> {
        self.broadcaster.tap(sender)
    }

    /// Detach a channel attached with [`tap`](Self::tap).
    pub fn untap(&self, id: SubscriptionId) -> bool {
        self.broadcaster.unsubscribe(id)
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }
}
