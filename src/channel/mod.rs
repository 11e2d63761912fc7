//! Raw duplex channels between two endpoints.
//!
//! A [`Channel`] is the only thing the transport and the correlation
//! protocol know about the physical medium. Delivery is unreliable and
//! order-preserving per direction; payloads are strings.
//!
//! # Realizations
//!
//! ```text
//! ┌──────────────────────┐   postMessage    ┌──────────────────────┐
//! │  nested context      │◄────────────────►│  parent context      │
//! │  WindowChannel       │  (origin scoped) │  WindowChannel       │
//! │  (interceptor side)  │                  │  (resolver side)     │
//! └──────────────────────┘                  └──────────────────────┘
//!
//! ┌──────────────────────┐    stdio IPC     ┌──────────────────────┐
//! │  child process       │◄────────────────►│  parent process      │
//! │  ParentProcessChannel│                  │  ChildProcessChannel │
//! │  (interceptor side)  │                  │  (resolver side)     │
//! └──────────────────────┘                  └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `window` | Windowed-messaging channel and the postMessage bus seam |
//! | `process` | Process-messaging channel and the IPC seam |
//! | `subscription` | Unsubscribe handles |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Listener registry used by in-process primitives.
pub(crate) mod listeners;

/// Process-messaging realization.
pub mod process;

/// Unsubscribe handles.
pub mod subscription;

/// Windowed-messaging realization.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use process::{
    ChildProcess, ChildProcessChannel, IpcHandler, LifecycleHandler, MemoryParentLink,
    MemoryProcess, PROCESS_CHANNEL_ENV, ParentLink, ParentProcessChannel, PeerProcess,
    ProcessEvent, StdioParent,
};
pub use subscription::Subscription;
pub use window::{
    ContextId, LocalWindow, MessageData, MessageEvent, MessageListener, WindowChannel,
    WindowChannelBuilder, WindowChannelOptions, WindowContext,
};

// ============================================================================
// Types
// ============================================================================

/// Callback receiving raw string payloads from the peer.
pub type RawHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// One-shot callback fired when the peer goes away.
pub type TerminationHook = Box<dyn FnOnce() + Send>;

// ============================================================================
// Channel
// ============================================================================

/// Capability set of a physical medium.
///
/// Implementations filter out anything that is not a string payload from
/// the expected peer before calling the subscribed handler.
pub trait Channel: Send + Sync {
    /// Pushes a payload to the peer.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the medium rejects the payload. Callers
    /// treat this as non-fatal.
    fn try_send(&self, raw: &str) -> Result<()>;

    /// Registers a raw-message handler.
    fn subscribe(&self, handler: RawHandler) -> Subscription;

    /// Returns `true` if this execution context can use the channel.
    fn is_usable(&self) -> bool;

    /// Registers a hook fired once when the peer terminates.
    ///
    /// Returns `None` for media without a lifecycle concept.
    fn observe_termination(&self, _hook: TerminationHook) -> Option<Subscription> {
        None
    }
}
