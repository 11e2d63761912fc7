//! The two ends of the relay.
//!
//! Both roles speak the same two-message protocol on top of a
//! [`Transport`](crate::transport::Transport):
//!
//! ```text
//! Interceptor                                   Resolver
//!     │  request:{"id":"r1",...}                    │
//!     │ ──────────────────────────────────────────► │ responder(request, id, controller)
//!     │                                             │
//!     │  response:r1:{"status":200,...}             │
//!     │ ◄────────────────────────────────────────── │ controller.respond_with(..)
//!     ▼                                             ▼
//!  call resumes                              ResponseNotice
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `interceptor` | Originating end with per-request correlation |
//! | `resolver` | Answering end and the local responder seam |
//! | `controller` | Per-request decision controller |
//! | `source` | Native interception seam |

// ============================================================================
// Submodules
// ============================================================================

/// Per-request decision controller.
pub mod controller;

/// Originating end.
pub mod interceptor;

/// Answering end.
pub mod resolver;

/// Native interception seam.
pub mod source;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::{RequestController, ResponseNotice};
pub use interceptor::{Interceptor, Resolution, Resume};
pub use resolver::{LocalResponder, Resolver};
pub use source::{CallHandler, InterceptedCall, InterceptionHub, InterceptionSource};
