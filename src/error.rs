//! Error types for the store.

use crate::broadcast::DropReason;
use thiserror::Error;

/// Boxed error returned by subscriber callbacks and async handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    #[error("Completion signal dropped before resolving")]
    CompletionDropped,

    #[error("Completion did not resolve within {0:?}")]
    CompletionTimedOut(std::time::Duration),

    #[error("Subscriber error: {0}")]
    Subscriber(#[source] BoxError),

    #[error("Subscriber panicked: {0}")]
    SubscriberPanicked(String),

    #[error("Subscriber removed while the producer was still open: {0:?}")]
    SubscriberDropped(DropReason),

    #[error("Producer is closed")]
    Closed,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
