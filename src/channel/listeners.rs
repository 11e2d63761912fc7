//! Listener registry shared by the in-process primitives.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::Subscription;

// ============================================================================
// Types
// ============================================================================

/// Callback invoked for every emitted value.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

// ============================================================================
// ListenerSet
// ============================================================================

/// Registration-ordered set of listeners.
///
/// Emission works on a snapshot, so listeners may add or remove listeners
/// (including themselves) while being invoked.
pub(crate) struct ListenerSet<T> {
    /// Next registration key.
    next: AtomicU64,
    /// Active listeners by registration key.
    listeners: Mutex<BTreeMap<u64, Listener<T>>>,
}

impl<T: 'static> ListenerSet<T> {
    /// Creates an empty set.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next: AtomicU64::new(0),
            listeners: Mutex::new(BTreeMap::new()),
        })
    }

    /// Registers a listener.
    pub(crate) fn add(self: &Arc<Self>, listener: Listener<T>) -> Subscription {
        let key = self.next.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(key, listener);

        let weak = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(set) = weak.upgrade() {
                set.listeners.lock().remove(&key);
            }
        })
    }

    /// Invokes every listener registered at call time. Returns how many ran.
    pub(crate) fn emit(&self, value: &T) -> usize {
        let snapshot: Vec<Listener<T>> = self.listeners.lock().values().cloned().collect();
        for listener in &snapshot {
            listener(value);
        }
        snapshot.len()
    }

    /// Number of registered listeners.
    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Removes every listener.
    pub(crate) fn clear(&self) {
        self.listeners.lock().clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_in_registration_order() {
        let set = ListenerSet::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3u32 {
            let seen = Arc::clone(&seen);
            let _sub = set.add(Arc::new(move |v: &u32| seen.lock().push((tag, *v))));
        }

        assert_eq!(set.emit(&7), 3);
        assert_eq!(*seen.lock(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn test_listener_can_remove_itself() {
        let set = ListenerSet::<()>::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot_clone = Arc::clone(&slot);
        let sub = set.add(Arc::new(move |_| {
            if let Some(sub) = slot_clone.lock().take() {
                sub.unsubscribe();
            }
        }));
        *slot.lock() = Some(sub);

        assert_eq!(set.emit(&()), 1);
        assert_eq!(set.len(), 0);
        assert_eq!(set.emit(&()), 0);
    }

    #[test]
    fn test_clear() {
        let set = ListenerSet::<()>::new();
        let _a = set.add(Arc::new(|_| {}));
        let _b = set.add(Arc::new(|_| {}));
        set.clear();
        assert_eq!(set.len(), 0);
    }
}
