//! Windowed-messaging channel.
//!
//! Relays between a nested browsing context and its parent over a
//! postMessage-style bus. The bus itself is consumed through the
//! [`WindowContext`] trait; [`LocalWindow`] is an in-process bus.
//!
//! # Filtering
//!
//! An incoming event reaches the subscribed handler only if:
//!
//! 1. its data is a string (structured data is ignored),
//! 2. it was posted by the expected peer context,
//! 3. its origin equals the configured source scope, when one is set.
//!
//! # Example
//!
//! ```ignore
//! let top = LocalWindow::top("https://app.test");
//! let frame = LocalWindow::frame(&top, "https://app.test");
//!
//! let interceptor_side = WindowChannel::builder().current(frame.clone()).interceptor()?;
//! let resolver_side = WindowChannel::builder().current(top).peer(frame).resolver()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::{Channel, RawHandler, Subscription};

// ============================================================================
// Submodules
// ============================================================================

/// In-process window bus.
pub mod local;

pub use local::LocalWindow;

// ============================================================================
// Constants
// ============================================================================

/// Target scope that matches every receiver origin.
pub const ANY_SCOPE: &str = "*";

// ============================================================================
// Bus Types
// ============================================================================

/// Identity of a browsing context on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context-{}", self.0)
    }
}

/// Data carried by a posted message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageData {
    /// String payload; the only kind the relay acts on.
    Text(String),
    /// Structured-clone style payload.
    Structured(Value),
}

/// A message as observed by the receiving context.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Posted data.
    pub data: MessageData,
    /// Origin of the posting context.
    pub origin: String,
    /// Identity of the posting context.
    pub source: ContextId,
}

/// Callback receiving message events.
pub type MessageListener = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

// ============================================================================
// WindowContext
// ============================================================================

/// A browsing context reachable over the postMessage bus.
pub trait WindowContext: Send + Sync {
    /// Identity of this context.
    fn id(&self) -> ContextId;

    /// Serialized origin of this context.
    fn origin(&self) -> String;

    /// Parent context, if this one is nested.
    fn parent(&self) -> Option<Arc<dyn WindowContext>>;

    /// Posts `data` to this context on behalf of `source`.
    ///
    /// Delivery is dropped silently when `target_origin` is neither
    /// [`ANY_SCOPE`] nor this context's origin.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the context can no longer receive.
    fn post_message(
        &self,
        data: MessageData,
        target_origin: &str,
        source: &dyn WindowContext,
    ) -> Result<()>;

    /// Registers a listener for messages posted to this context.
    fn add_message_listener(&self, listener: MessageListener) -> Subscription;
}

// ============================================================================
// WindowChannelOptions
// ============================================================================

/// Scope restrictions for a [`WindowChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowChannelOptions {
    /// Origin the peer must have to receive our messages.
    pub target_scope: String,

    /// Origin incoming messages must come from, if restricted.
    pub source_scope: Option<String>,
}

impl Default for WindowChannelOptions {
    fn default() -> Self {
        Self {
            target_scope: ANY_SCOPE.to_string(),
            source_scope: None,
        }
    }
}

impl WindowChannelOptions {
    /// Creates unrestricted options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts delivery to peers with this origin.
    #[inline]
    #[must_use]
    pub fn with_target_scope(mut self, scope: impl Into<String>) -> Self {
        self.target_scope = scope.into();
        self
    }

    /// Accepts incoming messages only from this origin.
    #[inline]
    #[must_use]
    pub fn with_source_scope(mut self, scope: impl Into<String>) -> Self {
        self.source_scope = Some(scope.into());
        self
    }
}

// ============================================================================
// WindowChannel
// ============================================================================

/// Which end of the relay a window channel serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// Nested context talking to its parent.
    Interceptor,
    /// Parent context talking to a configured peer.
    Resolver,
}

/// Windowed-messaging [`Channel`].
pub struct WindowChannel {
    /// Which end this is.
    side: Side,
    /// The context this code runs in.
    current: Arc<dyn WindowContext>,
    /// The context on the other end.
    peer: Option<Arc<dyn WindowContext>>,
    /// Scope restrictions.
    options: WindowChannelOptions,
}

impl WindowChannel {
    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> WindowChannelBuilder {
        WindowChannelBuilder::default()
    }

    /// Returns the configured scope restrictions.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &WindowChannelOptions {
        &self.options
    }
}

impl fmt::Debug for WindowChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowChannel")
            .field("side", &self.side)
            .field("current", &self.current.id())
            .field("peer", &self.peer.as_ref().map(|p| p.id()))
            .field("options", &self.options)
            .finish()
    }
}

impl Channel for WindowChannel {
    fn try_send(&self, raw: &str) -> Result<()> {
        let peer = self
            .peer
            .as_ref()
            .ok_or_else(|| Error::channel_unavailable("no peer context"))?;

        peer.post_message(
            MessageData::Text(raw.to_string()),
            &self.options.target_scope,
            self.current.as_ref(),
        )
    }

    fn subscribe(&self, handler: RawHandler) -> Subscription {
        let Some(peer) = self.peer.as_ref() else {
            debug!(side = ?self.side, "No peer context, subscription is inert");
            return Subscription::inert();
        };

        let peer_id = peer.id();
        let source_scope = self.options.source_scope.clone();

        self.current
            .add_message_listener(Arc::new(move |event: &MessageEvent| {
                let MessageData::Text(text) = &event.data else {
                    trace!(source = %event.source, "Ignoring non-string message");
                    return;
                };

                if event.source != peer_id {
                    trace!(source = %event.source, expected = %peer_id, "Ignoring message from foreign context");
                    return;
                }

                if let Some(scope) = &source_scope
                    && event.origin != *scope
                {
                    trace!(origin = %event.origin, scope = %scope, "Ignoring message outside source scope");
                    return;
                }

                handler(text);
            }))
    }

    fn is_usable(&self) -> bool {
        // Interceptor: nested in a parent that is not itself.
        // Resolver: a configured peer distinct from the current context.
        self.peer
            .as_ref()
            .is_some_and(|peer| peer.id() != self.current.id())
    }
}

// ============================================================================
// WindowChannelBuilder
// ============================================================================

/// Builder for [`WindowChannel`].
#[derive(Clone, Default)]
pub struct WindowChannelBuilder {
    /// Context the code runs in.
    current: Option<Arc<dyn WindowContext>>,
    /// Explicit peer context.
    peer: Option<Arc<dyn WindowContext>>,
    /// Scope restrictions.
    options: WindowChannelOptions,
}

impl WindowChannelBuilder {
    /// Sets the context this code runs in.
    #[inline]
    #[must_use]
    pub fn current(mut self, context: Arc<dyn WindowContext>) -> Self {
        self.current = Some(context);
        self
    }

    /// Sets the peer context.
    #[inline]
    #[must_use]
    pub fn peer(mut self, context: Arc<dyn WindowContext>) -> Self {
        self.peer = Some(context);
        self
    }

    /// Replaces the scope options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: WindowChannelOptions) -> Self {
        self.options = options;
        self
    }

    /// Restricts delivery to peers with this origin.
    #[inline]
    #[must_use]
    pub fn target_scope(mut self, scope: impl Into<String>) -> Self {
        self.options.target_scope = scope.into();
        self
    }

    /// Accepts incoming messages only from this origin.
    #[inline]
    #[must_use]
    pub fn source_scope(mut self, scope: impl Into<String>) -> Self {
        self.options.source_scope = Some(scope.into());
        self
    }

    /// Builds the nested-context end. The peer defaults to the parent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no current context was set.
    pub fn interceptor(self) -> Result<WindowChannel> {
        let current = self.validate_current()?;
        let peer = self.peer.or_else(|| current.parent());

        Ok(WindowChannel {
            side: Side::Interceptor,
            current,
            peer,
            options: self.options,
        })
    }

    /// Builds the parent end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the current or peer context is missing.
    pub fn resolver(self) -> Result<WindowChannel> {
        let current = self.validate_current()?;
        let peer = self.peer.ok_or_else(|| {
            Error::config(
                "Peer context is required for the resolver side. Use .peer() to set it.",
            )
        })?;

        Ok(WindowChannel {
            side: Side::Resolver,
            current,
            peer: Some(peer),
            options: self.options,
        })
    }

    /// Validates the current context configuration.
    fn validate_current(&self) -> Result<Arc<dyn WindowContext>> {
        self.current.clone().ok_or_else(|| {
            Error::config("Current context is required. Use .current() to set it.")
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
