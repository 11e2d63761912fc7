//! Request/response correlation protocol.
//!
//! This module defines the message format exchanged between the
//! interceptor and resolver roles, inside the transport prefix.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `request:<json>` | Interceptor → Resolver | Captured request |
//! | `response:<id>:<json>` | Resolver → Interceptor | Decision for request `<id>` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Kind/id framing and encoders |
//! | `record` | JSON request and response records |

// ============================================================================
// Submodules
// ============================================================================

/// Kind and correlation-key framing.
pub mod message;

/// Serialized request and response records.
pub mod record;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{
    ProtocolMessage, REQUEST_TAG, RESPONSE_TAG, encode_request, encode_response, response_prefix,
};
pub use record::{ResponsePayload, SerializedRequestRecord, SerializedResponseRecord};
