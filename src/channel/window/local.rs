//! In-process postMessage bus.
//!
//! [`LocalWindow`] models a tree of browsing contexts inside one process.
//! Posting is synchronous: listeners run before `post_message` returns.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::trace;

use crate::channel::Subscription;
use crate::channel::listeners::ListenerSet;
use crate::error::{Error, Result};

use super::{ANY_SCOPE, ContextId, MessageData, MessageEvent, MessageListener, WindowContext};

// ============================================================================
// Constants
// ============================================================================

/// Next context identity.
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// LocalWindow
// ============================================================================

/// An in-process browsing context.
pub struct LocalWindow {
    /// Identity on the bus.
    id: ContextId,
    /// Serialized origin.
    origin: String,
    /// Embedding context.
    parent: Option<Arc<LocalWindow>>,
    /// Message listeners.
    listeners: Arc<ListenerSet<MessageEvent>>,
    /// Set once the context is closed.
    closed: AtomicBool,
}

impl LocalWindow {
    /// Creates a top-level context.
    #[must_use]
    pub fn top(origin: impl Into<String>) -> Arc<Self> {
        Self::create(origin.into(), None)
    }

    /// Creates a context nested inside `parent`.
    #[must_use]
    pub fn frame(parent: &Arc<Self>, origin: impl Into<String>) -> Arc<Self> {
        Self::create(origin.into(), Some(Arc::clone(parent)))
    }

    fn create(origin: String, parent: Option<Arc<Self>>) -> Arc<Self> {
        Arc::new(Self {
            id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
            origin,
            parent,
            listeners: ListenerSet::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Closes the context. Later posts to it fail and listeners are dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.listeners.clear();
        }
    }

    /// Returns `true` once [`LocalWindow::close`] has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of registered message listeners.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl WindowContext for LocalWindow {
    fn id(&self) -> ContextId {
        self.id
    }

    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn parent(&self) -> Option<Arc<dyn WindowContext>> {
        self.parent
            .as_ref()
            .map(|parent| Arc::clone(parent) as Arc<dyn WindowContext>)
    }

    fn post_message(
        &self,
        data: MessageData,
        target_origin: &str,
        source: &dyn WindowContext,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(Error::channel(format!("{} is closed", self.id)));
        }

        if target_origin != ANY_SCOPE && target_origin != self.origin {
            trace!(target = %self.id, target_origin, origin = %self.origin, "Target origin mismatch, dropping message");
            return Ok(());
        }

        let event = MessageEvent {
            data,
            origin: source.origin(),
            source: source.id(),
        };
        self.listeners.emit(&event);
        Ok(())
    }

    fn add_message_listener(&self, listener: MessageListener) -> Subscription {
        if self.is_closed() {
            return Subscription::inert();
        }
        self.listeners.add(listener)
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
    fn test_frame_parent_link() {
        let top = LocalWindow::top("https://a.test");
        let frame = LocalWindow::frame(&top, "https://b.test");

        assert!(top.parent().is_none());
        assert_eq!(frame.parent().map(|p| p.id()), Some(top.id()));
        assert_ne!(top.id(), frame.id());
    }

    #[test]
    fn test_event_carries_source_identity() {
        let top = LocalWindow::top("https://a.test");
        let frame = LocalWindow::frame(&top, "https://b.test");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = top.add_message_listener(Arc::new(move |e: &MessageEvent| {
            sink.lock().push(e.clone());
        }));

        top.post_message(MessageData::Text("x".into()), "https://a.test", frame.as_ref())
            .expect("post");

        let events = seen.lock().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, frame.id());
        assert_eq!(events[0].origin, "https://b.test");

        sub.unsubscribe();
        assert_eq!(top.listener_count(), 0);
    }

    #[test]
    fn test_closed_window_rejects_posts() {
        let top = LocalWindow::top("https://a.test");
        let frame = LocalWindow::frame(&top, "https://a.test");

        frame.close();
        assert!(frame.is_closed());

        let result = frame.post_message(MessageData::Text("x".into()), ANY_SCOPE, top.as_ref());
        assert!(matches!(result, Err(Error::Channel { .. })));
    }
}
