//! Subscription handles returned to observers.

use crate::broadcast::SubscriptionId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callback-driven subscription.
///
/// Dropping the value does not stop delivery; call [`dispose`](Self::dispose).
pub struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) disposed: Arc<AtomicBool>,
    pub(crate) finished: Arc<AtomicBool>,
    pub(crate) detach: Box<dyn Fn(SubscriptionId) -> bool + Send + Sync>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop delivery and release the subscriber buffer.
    ///
    /// Never blocks, even while a callback is running on the delivery
    /// thread. Returns true only for the call that actually disposed.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        (self.detach)(self.id);
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// False once disposed, failed, or completed.
    pub fn is_active(&self) -> bool {
        !self.is_disposed() && !self.finished.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
