//! HTTP value types carried across the relay.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HttpRequest`] | Captured request on the interceptor side |
//! | [`HttpResponse`] | Mocked response from the resolver side |
//! | [`Headers`] | Ordered, duplicate-preserving header list |
//! | [`NetworkError`] | Network-level failure decision |

// ============================================================================
// Submodules
// ============================================================================

/// Ordered header collection.
pub mod headers;

/// Request value.
pub mod request;

/// Response and failure values.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use headers::Headers;
pub use request::{CredentialsMode, HttpRequest, method_allows_body};
pub use response::{HttpResponse, NetworkError};
