//! In-memory parent/child pair.
//!
//! Stands in for a real child process when both ends live in one process.
//! Delivery is synchronous.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::channel::Subscription;
use crate::channel::listeners::ListenerSet;
use crate::error::{Error, Result};

use super::{IpcHandler, LifecycleHandler, ParentLink, PeerProcess, ProcessEvent};

// ============================================================================
// Shared
// ============================================================================

/// State shared by both ends of the pair.
struct Shared {
    /// Listeners in the child for messages from the parent.
    to_child: Arc<ListenerSet<Value>>,
    /// Listeners in the parent for messages from the child.
    to_parent: Arc<ListenerSet<Value>>,
    /// Lifecycle listeners in the parent.
    lifecycle: Arc<ListenerSet<ProcessEvent>>,
    /// Set once the child has exited.
    exited: AtomicBool,
}

impl Shared {
    fn ensure_running(&self) -> Result<()> {
        if self.exited.load(Ordering::SeqCst) {
            return Err(Error::channel("process has exited"));
        }
        Ok(())
    }
}

// ============================================================================
// MemoryProcess
// ============================================================================

/// Parent's handle on an in-memory child.
pub struct MemoryProcess {
    shared: Arc<Shared>,
}

impl MemoryProcess {
    /// Creates a connected pair: the parent's handle and the child's link.
    #[must_use]
    pub fn spawn() -> (Arc<MemoryProcess>, Arc<MemoryParentLink>) {
        let shared = Arc::new(Shared {
            to_child: ListenerSet::new(),
            to_parent: ListenerSet::new(),
            lifecycle: ListenerSet::new(),
            exited: AtomicBool::new(false),
        });

        (
            Arc::new(MemoryProcess {
                shared: Arc::clone(&shared),
            }),
            Arc::new(MemoryParentLink { shared }),
        )
    }

    /// Simulates the child exiting. Only the first call reports `exit`.
    pub fn exit(&self, code: Option<i32>) {
        if self.shared.exited.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(?code, "In-memory child exited");
        self.shared.lifecycle.emit(&ProcessEvent::Exit(code));
    }

    /// Simulates an `error` event without terminating the child.
    pub fn fail(&self, message: impl Into<String>) {
        self.shared
            .lifecycle
            .emit(&ProcessEvent::Error(message.into()));
    }

    /// Returns `true` once the child has exited.
    #[inline]
    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.shared.exited.load(Ordering::SeqCst)
    }

    /// Number of parent-side message listeners.
    #[inline]
    #[must_use]
    pub fn message_listener_count(&self) -> usize {
        self.shared.to_parent.len()
    }
}

impl PeerProcess for MemoryProcess {
    fn send(&self, message: &str) -> Result<()> {
        self.shared.ensure_running()?;
        self.shared
            .to_child
            .emit(&Value::String(message.to_string()));
        Ok(())
    }

    fn on_message(&self, handler: IpcHandler) -> Subscription {
        self.shared.to_parent.add(handler)
    }

    fn on_lifecycle(&self, handler: LifecycleHandler) -> Subscription {
        self.shared.lifecycle.add(handler)
    }
}

// ============================================================================
// MemoryParentLink
// ============================================================================

/// Child's link to its in-memory parent.
pub struct MemoryParentLink {
    shared: Arc<Shared>,
}

impl MemoryParentLink {
    /// Sends an arbitrary IPC value to the parent.
    ///
    /// # Errors
    ///
    /// Returns a channel error once the child has exited.
    pub fn send_value(&self, value: Value) -> Result<()> {
        self.shared.ensure_running()?;
        self.shared.to_parent.emit(&value);
        Ok(())
    }
}

impl ParentLink for MemoryParentLink {
    fn send(&self, message: &str) -> Result<()> {
        self.send_value(Value::String(message.to_string()))
    }

    fn on_message(&self, handler: IpcHandler) -> Subscription {
        self.shared.to_child.add(handler)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    #[test]
    fn test_exit_reported_once() {
        let (child, _link) = MemoryProcess::spawn();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let _sub = child.on_lifecycle(Arc::new(move |e: &ProcessEvent| sink.lock().push(e.clone())));

        child.exit(Some(0));
        child.exit(Some(1));

        assert_eq!(*events.lock(), vec![ProcessEvent::Exit(Some(0))]);
        assert!(child.has_exited());
    }

    #[test]
    fn test_send_after_exit_fails() {
        let (child, link) = MemoryProcess::spawn();
        child.exit(None);

        assert!(child.send("x").is_err());
        assert!(link.send("x").is_err());
    }

    #[test]
    fn test_fail_keeps_process_running() {
        let (child, link) = MemoryProcess::spawn();
        child.fail("EPIPE");

        assert!(!child.has_exited());
        assert!(link.send("still here").is_ok());
    }
}
