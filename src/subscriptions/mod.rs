//! Callback subscriptions for live store updates.
//!
//! This module wraps a [`Broadcaster`](crate::broadcast::Broadcaster) with an
//! observer-style API:
//! - `subscribe(on_next, on_error, on_completed)` with explicit `dispose()`
//! - `observe(map)` for a transformed view of every delivered item
//! - Raw `watch()` handles and caller-owned channel taps
//!
//! Each callback subscription runs on its own thread, so an error or panic in
//! one subscriber never reaches the producer or any other subscriber.
//!
//! # Example
//!
//! ```ignore
//! let subscription = store.observe(|state| state.len()).subscribe(
//!     |len| { println!("{} rows", len); Ok(()) },
//!     |err| eprintln!("subscriber failed: {}", err),
//!     || println!("store closed"),
//! )?;
//!
//! subscription.dispose();
//! ```

mod manager;
mod types;

pub use manager::{Observable, SubscriptionManager};
pub use types::Subscription;
