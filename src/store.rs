//! Main Store struct tying all components together.

use crate::broadcast::{Broadcaster, BroadcastConfig, SubscriptionHandle, SubscriptionId};
use crate::error::{BoxError, Result, StoreError};
use crate::router::producer::{Producer, SharedProducer};
use crate::router::{ActionRouter, Handlers, Route};
use crate::subscriptions::{Observable, Subscription, SubscriptionManager};
use crate::transitions::{QueueStats, Transition};
use crate::types::{Action, Outcome, Status, TransitionId};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Store configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Broadcaster for preview-state snapshots.
    pub states: BroadcastConfig,

    /// Broadcaster for the pass-through action stream.
    pub actions: BroadcastConfig,

    /// How long an async action may stay unresolved before it is rejected
    /// (None = wait indefinitely).
    pub completion_timeout: Option<Duration>,
}

/// Optimistic state container.
///
/// Provides a unified interface for:
/// - Dispatching actions to registered handlers
/// - Applying and resolving transitions directly
/// - Reading canonical and preview state
/// - Subscribing to preview snapshots and to the pass-through action stream
///
/// Dropping the store closes both streams; callback subscribers see
/// `on_completed`.
pub struct Store<S, P = serde_json::Value>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Store configuration.
    config: StoreConfig,

    /// Queue plus canonical/preview state.
    producer: SharedProducer<S>,

    /// Action dispatch.
    router: ActionRouter<S, P>,

    /// Preview-state subscriptions.
    states: SubscriptionManager<Arc<S>>,

    /// Pass-through action subscriptions.
    actions: SubscriptionManager<Arc<Action<P>>>,
}

impl<S, P> Store<S, P>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Create a store with default configuration.
    pub fn new(initial: S, handlers: Handlers<S, P>) -> Self {
        Self::with_config(initial, handlers, StoreConfig::default())
    }

    /// Create a store.
    pub fn with_config(initial: S, handlers: Handlers<S, P>, config: StoreConfig) -> Self {
        let states = Arc::new(Broadcaster::deduplicating(config.states.clone()));
        let actions = Arc::new(Broadcaster::new(config.actions.clone()));
        let producer = Arc::new(Mutex::new(Producer::new(initial, Arc::clone(&states))));
        let router = ActionRouter::new(
            handlers,
            Arc::clone(&producer),
            Arc::clone(&actions),
            config.completion_timeout,
        );

        Self {
            config,
            producer,
            router,
            states: SubscriptionManager::new(states),
            actions: SubscriptionManager::new(actions),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Actions ---

    /// Route an action to its handler.
    pub fn dispatch(&self, action: Action<P>) -> Result<Route> {
        self.router.dispatch(action)
    }

    // --- Transitions ---

    /// Apply a transition directly, bypassing handlers.
    pub fn apply<F>(&self, f: F) -> TransitionId
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        self.producer.lock().apply(Transition::new(f))
    }

    /// Resolve a transition. False if it was already resolved or is gone.
    pub fn resolve(&self, id: TransitionId, outcome: Outcome) -> bool {
        self.producer.lock().resolve(id, outcome)
    }

    pub fn commit(&self, id: TransitionId) -> bool {
        self.resolve(id, Outcome::Commit)
    }

    pub fn reject(&self, id: TransitionId) -> bool {
        self.resolve(id, Outcome::Reject)
    }

    // --- State ---

    /// Current canonical state.
    pub fn canonical(&self) -> S {
        self.producer.lock().canonical().clone()
    }

    /// Current preview state (canonical plus every queued transition).
    pub fn preview(&self) -> Arc<S> {
        self.producer.lock().preview()
    }

    pub fn status(&self, id: TransitionId) -> Option<Status> {
        self.producer.lock().status(id)
    }

    /// Number of transitions still queued.
    pub fn pending_len(&self) -> usize {
        self.producer.lock().pending_len()
    }

    pub fn stats(&self) -> QueueStats {
        self.producer.lock().stats()
    }

    /// Serialize canonical state as JSON.
    pub fn to_json(&self) -> Result<String>
    where
        S: Serialize,
    {
        let producer = self.producer.lock();
        Ok(serde_json::to_string(producer.canonical())?)
    }

    // --- Subscriptions ---

    /// Subscribe to preview snapshots.
    pub fn subscribe<N, E, C>(&self, on_next: N, on_error: E, on_completed: C) -> Result<Subscription>
    where
        N: FnMut(Arc<S>) -> std::result::Result<(), BoxError> + Send + 'static,
        E: FnOnce(StoreError) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.states.subscribe(on_next, on_error, on_completed)
    }

    /// Observable view of preview snapshots with `map` applied.
    pub fn observe<U, F>(&self, map: F) -> Observable<Arc<S>, U>
    where
        U: 'static,
        F: Fn(Arc<S>) -> U + Send + Sync + 'static,
    {
        self.states.observe(map)
    }

    /// Raw receive handle for preview snapshots.
    pub fn watch(&self) -> Result<SubscriptionHandle<Arc<S>>> {
        self.states.watch()
    }

    /// Attach a caller-owned channel to the snapshot stream.
    pub fn tap(&self, sender: Sender<Arc<S>>) -> Result<SubscriptionId> {
        self.states.tap(sender)
    }

    pub fn untap(&self, id: SubscriptionId) -> bool {
        self.states.untap(id)
    }

    /// Subscribe to the pass-through action stream.
    pub fn subscribe_actions<N, E, C>(
        &self,
        on_next: N,
        on_error: E,
        on_completed: C,
    ) -> Result<Subscription>
    where
        N: FnMut(Arc<Action<P>>) -> std::result::Result<(), BoxError> + Send + 'static,
        E: FnOnce(StoreError) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.actions.subscribe(on_next, on_error, on_completed)
    }

    /// Raw receive handle for the pass-through action stream.
    pub fn watch_actions(&self) -> Result<SubscriptionHandle<Arc<Action<P>>>> {
        self.actions.watch()
    }

    pub fn subscriber_count(&self) -> usize {
        self.states.subscription_count()
    }

    /// Close both streams. Later transitions still update state but are
    /// no longer delivered.
    pub fn close(&self) {
        self.states.broadcaster().close();
        self.actions.broadcaster().close();
    }
}

impl<S, P> Store<S, P>
where
    S: Clone + PartialEq + Default + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Create a store over the default (empty) state.
    pub fn empty(handlers: Handlers<S, P>) -> Self {
        Self::new(S::default(), handlers)
    }
}

impl<S, P> Drop for Store<S, P>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.close();
    }
}
