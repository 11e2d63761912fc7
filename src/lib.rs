//! HTTP relay - Mock traffic across an execution boundary.
//!
//! This library relays intercepted HTTP calls from one execution context
//! to another, so that one side can observe and mock traffic generated on
//! the other side.
//!
//! # Architecture
//!
//! The relay follows an interceptor/resolver model:
//!
//! - **Interceptor**: Where HTTP calls originate; suspends each call until
//!   its correlated response arrives
//! - **Resolver**: Where mock responses are produced by a local responder
//!
//! Key design principles:
//!
//! - Channels are pluggable: windowed messaging (nested browsing context to
//!   parent) and process messaging (child process to parent)
//! - Two-level framing: `<prefix>:` isolates unrelated transports sharing a
//!   channel, `request:` / `response:<id>:` carries the protocol
//! - Responses are matched purely by request id, tolerating reordering
//! - Failures in flight degrade to log lines, never to errors
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use http_relay::{
//!     HttpRequest, HttpResponse, Interceptor, LocalWindow, RequestController, RequestId,
//!     Resolution, Resolver, Result, Transport, WindowChannel,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let top = LocalWindow::top("https://app.test");
//!     let frame = LocalWindow::frame(&top, "https://app.test");
//!
//!     // Parent context answers every request
//!     let resolver_channel = WindowChannel::builder()
//!         .current(top.clone())
//!         .peer(frame.clone())
//!         .resolver()?;
//!     let resolver = Resolver::new(Transport::builder().channel(Arc::new(resolver_channel)).build()?);
//!     resolver.listen(|_req: HttpRequest, _id: RequestId, controller: RequestController| {
//!         controller.respond_with(HttpResponse::ok("hello"));
//!     });
//!
//!     // Nested context relays its calls to the parent
//!     let interceptor_channel = WindowChannel::builder().current(frame).interceptor()?;
//!     let interceptor =
//!         Interceptor::new(Transport::builder().channel(Arc::new(interceptor_channel)).build()?);
//!
//!     let request = HttpRequest::parse("GET", "https://api.test/user")?;
//!     let resolution = interceptor.relay(RequestId::generate(), &request).await;
//!     assert!(matches!(resolution, Some(Resolution::Respond(r)) if r.body == "hello"));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | [`Channel`] trait and its realizations |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`network`] | HTTP request/response values |
//! | [`protocol`] | Wire records and message framing |
//! | [`role`] | [`Interceptor`], [`Resolver`] and their collaborator seams |
//! | [`transport`] | Prefixed, disposable [`Transport`] |

// ============================================================================
// Modules
// ============================================================================

/// Raw duplex channels.
///
/// - [`WindowChannel`] - postMessage-style windowed messaging
/// - [`ChildProcessChannel`] / [`ParentProcessChannel`] - process messaging
pub mod channel;

/// Error types and result aliases.
///
/// Only construction-time failures surface as [`Result`] errors.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// HTTP value types carried by the relay.
pub mod network;

/// Wire records and `request:` / `response:` framing.
pub mod protocol;

/// Interceptor and resolver roles.
pub mod role;

/// Prefixed transport over a channel.
///
/// Use [`Transport::builder()`] to create one.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{
    Channel, ChildProcess, ChildProcessChannel, LocalWindow, MemoryParentLink, MemoryProcess,
    ParentLink, ParentProcessChannel, PeerProcess, ProcessEvent, StdioParent, Subscription,
    WindowChannel, WindowChannelBuilder, WindowChannelOptions, WindowContext,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{HandlerId, RequestId};

// Network types
pub use network::{CredentialsMode, Headers, HttpRequest, HttpResponse, NetworkError};

// Role types
pub use role::{
    InterceptedCall, InterceptionHub, InterceptionSource, Interceptor, LocalResponder,
    RequestController, Resolution, Resolver, ResponseNotice,
};

// Transport types
pub use transport::{DEFAULT_PREFIX, Transport, TransportBuilder, TransportOptions};
