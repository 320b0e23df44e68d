//! # Provisional
//!
//! An optimistic, reactive state container: transitions show up in observed
//! state the moment they are applied, and are later committed into canonical
//! state or rejected without a trace.
//!
//! ## Core Concepts
//!
//! - **Transitions**: Pure `S -> S` functions queued as pending, committed, or rejected
//! - **Canonical state**: Advances only through the committed prefix of the queue
//! - **Preview state**: Canonical state with every unresolved transition overlaid
//! - **Broadcast**: Preview snapshots fanned out to independent, bounded subscribers
//! - **Routing**: Named actions dispatched to sync handlers or async transforms
//!
//! ## Example
//!
//! ```ignore
//! use provisional::{completion, Action, Handlers, Store, Table};
//!
//! let handlers = Handlers::new()
//!     .on_sync("rename", |controls, payload: &serde_json::Value, _| {
//!         let name = payload["name"].as_str().unwrap_or_default().to_string();
//!         controls.apply(move |state: Table<String, String>| state.set("name".into(), name.clone()));
//!         controls.commit();
//!     })
//!     .on_async("save", |state, _action| state.set("saved".into(), "yes".into()));
//!
//! let store = Store::empty(handlers);
//! let _sub = store.subscribe(|snapshot| { println!("{:?}", snapshot); Ok(()) }, |_| {}, || {})?;
//!
//! // Visible immediately, committed once the save completes.
//! let (completer, signal) = completion();
//! store.dispatch(Action::new("save", serde_json::json!({})).with_completion(signal))?;
//! completer.succeed();
//! ```

pub mod broadcast;
pub mod error;
pub mod router;
pub mod store;
pub mod subscriptions;
pub mod table;
pub mod transitions;
pub mod types;

// Re-exports
pub use broadcast::{
    Backpressure, BroadcastConfig, Broadcaster, DropReason, Published, SubscriptionHandle,
    SubscriptionId,
};
pub use error::{BoxError, Result, StoreError};
pub use router::{ActionRouter, AsyncTransform, Controls, Handler, Handlers, Route, SyncHandler};
pub use store::{Store, StoreConfig};
pub use subscriptions::{Observable, Subscription, SubscriptionManager};
pub use table::{Record, Table};
pub use transitions::{QueueStats, Transition, TransitionQueue};
pub use types::{completion, Action, Completer, Completion, Outcome, Status, TransitionId};
