//! Process-messaging channel.
//!
//! Relays between a parent process and a child it spawned. The IPC
//! primitives are consumed through two traits:
//!
//! | Trait | Held by | Provided by |
//! |-------|---------|-------------|
//! | [`PeerProcess`] | parent (resolver side) | [`ChildProcess`], [`MemoryProcess`] |
//! | [`ParentLink`] | child (interceptor side) | [`StdioParent`], [`MemoryParentLink`] |
//!
//! Only string messages are relayed. On the parent side the message
//! subscription ends by itself when the child reports `error` or `exit`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::{Channel, RawHandler, Subscription, TerminationHook};

// ============================================================================
// Submodules
// ============================================================================

/// Child process spawned through tokio.
pub mod child;

/// In-memory parent/child pair.
pub mod memory;

/// Current process's stdio as the link to its parent.
pub mod stdio;

pub use child::ChildProcess;
pub use memory::{MemoryParentLink, MemoryProcess};
pub use stdio::StdioParent;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable a parent sets when spawning a child with an IPC link.
pub const PROCESS_CHANNEL_ENV: &str = "HTTP_RELAY_IPC";

// ============================================================================
// IPC Types
// ============================================================================

/// Lifecycle events reported for a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// The process or its pipe failed.
    Error(String),
    /// The process exited with an optional status code.
    Exit(Option<i32>),
}

/// Callback receiving IPC messages of any shape.
pub type IpcHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Callback receiving lifecycle events.
pub type LifecycleHandler = Arc<dyn Fn(&ProcessEvent) + Send + Sync>;

/// The parent's handle on a child process.
pub trait PeerProcess: Send + Sync {
    /// Sends a string message to the child.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the child can no longer receive.
    fn send(&self, message: &str) -> Result<()>;

    /// Registers a listener for messages from the child.
    fn on_message(&self, handler: IpcHandler) -> Subscription;

    /// Registers a listener for lifecycle events.
    fn on_lifecycle(&self, handler: LifecycleHandler) -> Subscription;
}

/// A child's send-to-parent primitive.
pub trait ParentLink: Send + Sync {
    /// Sends a string message to the parent.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the parent can no longer receive.
    fn send(&self, message: &str) -> Result<()>;

    /// Registers a listener for messages from the parent.
    fn on_message(&self, handler: IpcHandler) -> Subscription;
}

/// Wraps a raw handler so only string messages reach it.
fn strings_only(handler: RawHandler) -> IpcHandler {
    Arc::new(move |message: &Value| match message.as_str() {
        Some(raw) => handler(raw),
        None => trace!("Ignoring non-string IPC message"),
    })
}

// ============================================================================
// ChildProcessChannel
// ============================================================================

/// Parent-side [`Channel`] talking to a child process.
pub struct ChildProcessChannel {
    /// Handle on the child.
    peer: Arc<dyn PeerProcess>,
}

impl ChildProcessChannel {
    /// Creates a channel to the given child.
    #[inline]
    #[must_use]
    pub fn new(peer: Arc<dyn PeerProcess>) -> Self {
        Self { peer }
    }
}

impl fmt::Debug for ChildProcessChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildProcessChannel").finish_non_exhaustive()
    }
}

impl Channel for ChildProcessChannel {
    fn try_send(&self, raw: &str) -> Result<()> {
        self.peer.send(raw)
    }

    fn subscribe(&self, handler: RawHandler) -> Subscription {
        let message_sub = self.peer.on_message(strings_only(handler));
        let slot = Arc::new(Mutex::new(Some(message_sub)));

        let on_terminated = Arc::clone(&slot);
        let lifecycle_sub = self.peer.on_lifecycle(Arc::new(move |event: &ProcessEvent| {
            let taken = on_terminated.lock().take();
            if let Some(sub) = taken {
                debug!(?event, "Child process terminated, dropping message subscription");
                sub.unsubscribe();
            }
        }));

        Subscription::new(move || {
            let taken = slot.lock().take();
            if let Some(sub) = taken {
                sub.unsubscribe();
            }
        })
        .and(lifecycle_sub)
    }

    fn is_usable(&self) -> bool {
        true
    }

    fn observe_termination(&self, hook: TerminationHook) -> Option<Subscription> {
        let hook = Mutex::new(Some(hook));
        Some(self.peer.on_lifecycle(Arc::new(move |_event: &ProcessEvent| {
            let taken = hook.lock().take();
            if let Some(hook) = taken {
                hook();
            }
        })))
    }
}

// ============================================================================
// ParentProcessChannel
// ============================================================================

/// Child-side [`Channel`] talking to the parent process.
pub struct ParentProcessChannel {
    /// Link to the parent, if this process has one.
    link: Option<Arc<dyn ParentLink>>,
}

impl ParentProcessChannel {
    /// Detects whether this process was spawned with an IPC link.
    #[must_use]
    pub fn detect() -> Self {
        let link = StdioParent::detect().map(|parent| parent as Arc<dyn ParentLink>);
        Self { link }
    }

    /// Uses an explicit link to the parent.
    #[inline]
    #[must_use]
    pub fn with_link(link: Arc<dyn ParentLink>) -> Self {
        Self { link: Some(link) }
    }

    /// A channel for a process without a parent link.
    #[inline]
    #[must_use]
    pub fn detached() -> Self {
        Self { link: None }
    }
}

impl fmt::Debug for ParentProcessChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentProcessChannel")
            .field("linked", &self.link.is_some())
            .finish()
    }
}

impl Channel for ParentProcessChannel {
    fn try_send(&self, raw: &str) -> Result<()> {
        self.link
            .as_ref()
            .ok_or_else(|| Error::channel_unavailable("process has no parent link"))?
            .send(raw)
    }

    fn subscribe(&self, handler: RawHandler) -> Subscription {
        match &self.link {
            Some(link) => link.on_message(strings_only(handler)),
            None => Subscription::inert(),
        }
    }

    fn is_usable(&self) -> bool {
        self.link.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (RawHandler, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: RawHandler = Arc::new(move |raw: &str| sink.lock().push(raw.to_string()));
        (handler, seen)
    }

    #[test]
    fn test_round_trip_both_directions() {
        let (child, link) = MemoryProcess::spawn();
        let parent_end = ChildProcessChannel::new(child);
        let child_end = ParentProcessChannel::with_link(link);

        let (to_parent, parent_seen) = recorder();
        let (to_child, child_seen) = recorder();
        let _a = parent_end.subscribe(to_parent);
        let _b = child_end.subscribe(to_child);

        child_end.try_send("up").expect("send up");
        parent_end.try_send("down").expect("send down");

        assert_eq!(*parent_seen.lock(), vec!["up".to_string()]);
        assert_eq!(*child_seen.lock(), vec!["down".to_string()]);
    }

    #[test]
    fn test_non_string_messages_ignored() {
        let (child, link) = MemoryProcess::spawn();
        let parent_end = ChildProcessChannel::new(child);

        let (handler, seen) = recorder();
        let _sub = parent_end.subscribe(handler);

        link.send_value(serde_json::json!({"kind": "object"})).expect("send");
        link.send_value(serde_json::json!(42)).expect("send");

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_subscription_ends_on_exit() {
        let (child, link) = MemoryProcess::spawn();
        let parent_end = ChildProcessChannel::new(Arc::clone(&child) as Arc<dyn PeerProcess>);

        let (handler, seen) = recorder();
        let _sub = parent_end.subscribe(handler);

        link.send("before").expect("send");
        child.exit(Some(0));

        assert_eq!(*seen.lock(), vec!["before".to_string()]);
        assert_eq!(child.message_listener_count(), 0);
    }

    #[test]
    fn test_subscription_ends_on_error() {
        let (child, _link) = MemoryProcess::spawn();
        let parent_end = ChildProcessChannel::new(Arc::clone(&child) as Arc<dyn PeerProcess>);

        let (handler, _seen) = recorder();
        let _sub = parent_end.subscribe(handler);
        child.fail("EPIPE");

        assert_eq!(child.message_listener_count(), 0);
    }

    #[test]
    fn test_termination_hook_fires_once() {
        let (child, _link) = MemoryProcess::spawn();
        let parent_end = ChildProcessChannel::new(Arc::clone(&child) as Arc<dyn PeerProcess>);

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let _sub = parent_end.observe_termination(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        child.fail("EPIPE");
        child.exit(Some(1));

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detached_child_side_unusable() {
        let channel = ParentProcessChannel::detached();
        assert!(!channel.is_usable());
        assert!(matches!(
            channel.try_send("x"),
            Err(Error::ChannelUnavailable { .. })
        ));
        assert!(channel.subscribe(Arc::new(|_| {})).is_inert());
    }

    #[test]
    fn test_parent_side_always_usable() {
        let (child, _link) = MemoryProcess::spawn();
        assert!(ChildProcessChannel::new(child).is_usable());
    }
}
