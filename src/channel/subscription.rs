//! Unsubscribe handles.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Subscription
// ============================================================================

/// Handle returned by every `subscribe`/`add_listener` style call.
///
/// Calling [`Subscription::unsubscribe`] runs the cleanup exactly once.
/// Dropping the handle does **not** unsubscribe; the registration then
/// lives as long as its owner.
#[must_use = "dropping a Subscription leaves the listener registered"]
pub struct Subscription {
    /// Cleanup to run on unsubscribe. `None` once consumed or when inert.
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a subscription that runs `cancel` on unsubscribe.
    #[inline]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Creates a subscription whose unsubscribe does nothing.
    #[inline]
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Returns `true` if unsubscribing would do nothing.
    #[inline]
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.cancel.is_none()
    }

    /// Combines two subscriptions; `self` is torn down first.
    pub fn and(self, other: Subscription) -> Self {
        if self.is_inert() {
            return other;
        }
        if other.is_inert() {
            return self;
        }
        Self::new(move || {
            self.unsubscribe();
            other.unsubscribe();
        })
    }

    /// Runs the cleanup.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("inert", &self.is_inert())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
