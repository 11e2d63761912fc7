//! Prefixed, disposable transport over a [`Channel`](crate::channel::Channel).
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  send(body) ──► │ Transport "<prefix>"         │ ──► Channel::try_send("<prefix>:<body>")
//!                 │                              │
//!  handler(body)◄─│ HandlerRegistry (fan-out)    │ ◄── Channel subscription (raw)
//!                 │ Subscription list (dispose)  │
//!                 └──────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | `TransportBuilder` and `TransportOptions` |
//! | `core` | `Transport` itself |
//! | `prefix` | Namespace prefix framing |

// ============================================================================
// Submodules
// ============================================================================

/// Transport configuration.
pub mod builder;

/// Transport implementation.
pub mod core;

/// Namespace prefix framing.
pub mod prefix;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{TransportBuilder, TransportOptions};
pub use self::core::{MessageHandler, Transport};
pub use prefix::{DEFAULT_PREFIX, Prefix};
