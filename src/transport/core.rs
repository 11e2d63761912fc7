//! Transport implementation.
//!
//! A [`Transport`] owns one channel, a registry of message handlers and a
//! list of cleanups run on disposal.
//!
//! # Dispatch
//!
//! Every raw message from the channel goes through
//! [`Transport::handle_message`]. Messages carrying a foreign prefix are
//! inert; matching messages fan out to a snapshot of the registry, so
//! handlers may add listeners, unsubscribe or dispose while running.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::channel::{Channel, Subscription};
use crate::error::Result;
use crate::identifiers::HandlerId;

use super::builder::TransportBuilder;
use super::prefix::Prefix;

// ============================================================================
// Types
// ============================================================================

/// Handler receiving message bodies with the transport prefix stripped.
///
/// An `Err` is logged and does not affect other handlers.
pub type MessageHandler = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// Registered handlers by slot.
type HandlerRegistry = FxHashMap<HandlerId, MessageHandler>;

// ============================================================================
// Transport
// ============================================================================

/// Prefixed, multiplexed, disposable wrapper around a channel.
///
/// Cloning is cheap and every clone refers to the same transport;
/// disposing any clone disposes all of them. The last clone to be dropped
/// disposes the transport if nobody did.
#[derive(Clone)]
pub struct Transport {
    /// Shared state.
    inner: Arc<TransportInner>,
}

/// Non-owning handle on a [`Transport`].
///
/// Held by callbacks registered on the transport itself, so the handler
/// registry never keeps its own transport alive.
#[derive(Clone)]
pub(crate) struct WeakTransport {
    inner: Weak<TransportInner>,
}

impl WeakTransport {
    /// Returns the transport if it is still alive.
    pub(crate) fn upgrade(&self) -> Option<Transport> {
        self.inner.upgrade().map(|inner| Transport { inner })
    }
}

/// Internal shared state.
struct TransportInner {
    /// Namespace prefix.
    prefix: Prefix,
    /// Owned channel.
    channel: Arc<dyn Channel>,
    /// Active message handlers.
    handlers: Mutex<HandlerRegistry>,
    /// Cleanups, run in registration order on disposal.
    subscriptions: Mutex<Vec<Subscription>>,
    /// Set once disposal started.
    disposed: AtomicBool,
}

// ============================================================================
// Transport - Constructor
// ============================================================================

impl Transport {
    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> TransportBuilder {
        TransportBuilder::new()
    }

    /// Wraps `channel` and starts routing its messages.
    ///
    /// If the channel reports peer termination, the transport disposes
    /// itself.
    pub(crate) fn new(channel: Arc<dyn Channel>, prefix: Prefix) -> Self {
        let inner = Arc::new(TransportInner {
            prefix,
            channel,
            handlers: Mutex::new(HandlerRegistry::default()),
            subscriptions: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&inner);
        let raw = inner.channel.subscribe(Arc::new(move |raw: &str| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_message(raw);
            }
        }));
        inner.track(raw);

        let weak: Weak<TransportInner> = Arc::downgrade(&inner);
        let lifecycle = inner.channel.observe_termination(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                debug!(prefix = %inner.prefix, "Peer terminated, disposing transport");
                inner.dispose();
            }
        }));
        if let Some(lifecycle) = lifecycle {
            inner.track(lifecycle);
        }

        debug!(prefix = %inner.prefix, "Transport created");

        Self { inner }
    }
}

// ============================================================================
// Transport - Public API
// ============================================================================

impl Transport {
    /// Returns the namespace prefix.
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &Prefix {
        &self.inner.prefix
    }

    /// Sends `body` as `<prefix>:<body>`.
    ///
    /// No-op once disposed. Channel failures are logged, never returned.
    pub fn send(&self, body: &str) {
        self.inner.send(body);
    }

    /// Registers a handler for bodies of messages carrying this prefix.
    ///
    /// Returns an inert subscription once disposed.
    pub fn add_listener<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.add_listener(Arc::new(handler))
    }

    /// Dispatches a raw message to every handler if it carries this prefix.
    ///
    /// Handlers receive the body with the prefix stripped. Returns whether
    /// the prefix matched.
    pub fn handle_message(&self, raw: &str) -> bool {
        self.inner.handle_message(raw)
    }

    /// Returns `true` if the underlying channel is usable here.
    #[inline]
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.inner.channel.is_usable()
    }

    /// Tears the transport down.
    ///
    /// Runs every tracked cleanup once, in registration order, then drops
    /// all handlers. Idempotent and safe to call from inside a handler or
    /// a cleanup.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Returns `true` once [`Transport::dispose`] has been called.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Adds a cleanup to run on disposal.
    ///
    /// Runs it immediately if the transport is already disposed.
    pub fn track(&self, subscription: Subscription) {
        self.inner.track(subscription);
    }

    /// Number of registered handlers.
    #[inline]
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.lock().len()
    }

    /// Creates a non-owning handle.
    pub(crate) fn downgrade(&self) -> WeakTransport {
        WeakTransport {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("prefix", &self.inner.prefix.name())
            .field("handlers", &self.handler_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ============================================================================
// TransportInner
// ============================================================================

impl TransportInner {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn send(&self, body: &str) {
        if self.is_disposed() {
            debug!(prefix = %self.prefix, "Send on disposed transport ignored");
            return;
        }

        let framed = self.prefix.frame(body);
        match self.channel.try_send(&framed) {
            Ok(()) => trace!(prefix = %self.prefix, len = framed.len(), "Message sent"),
            Err(e) => warn!(prefix = %self.prefix, error = %e, "Failed to send message"),
        }
    }

    fn add_listener(self: &Arc<Self>, handler: MessageHandler) -> Subscription {
        if self.is_disposed() {
            debug!(prefix = %self.prefix, "Listener on disposed transport ignored");
            return Subscription::inert();
        }

        let id = HandlerId::next();
        let prefix = self.prefix.clone();
        let wrapper: MessageHandler = Arc::new(move |raw: &str| match prefix.strip(raw) {
            Some(body) => handler(body),
            None => Ok(()),
        });
        self.handlers.lock().insert(id, wrapper);
        trace!(prefix = %self.prefix, handler = %id, "Listener added");

        let weak = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handlers.lock().remove(&id);
                trace!(prefix = %inner.prefix, handler = %id, "Listener removed");
            }
        })
    }

    fn handle_message(&self, raw: &str) -> bool {
        if !self.prefix.matches(raw) {
            trace!(prefix = %self.prefix, "Ignoring message with foreign prefix");
            return false;
        }

        let snapshot: Vec<(HandlerId, MessageHandler)> = self
            .handlers
            .lock()
            .iter()
            .map(|(id, handler)| (*id, Arc::clone(handler)))
            .collect();

        for (id, handler) in snapshot {
            if let Err(e) = handler(raw) {
                warn!(prefix = %self.prefix, handler = %id, error = %e, "Message handler failed");
            }
        }

        true
    }

    fn track(&self, subscription: Subscription) {
        if self.is_disposed() {
            subscription.unsubscribe();
            return;
        }
        self.subscriptions.lock().push(subscription);
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        let count = subscriptions.len();
        for subscription in subscriptions {
            subscription.unsubscribe();
        }

        self.handlers.lock().clear();

        debug!(prefix = %self.prefix, cleanups = count, "Transport disposed");
    }
}

impl Drop for TransportInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ============================================================================
// Tests
// ============================================================================
