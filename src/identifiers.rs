//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing correlation keys with other strings and
//! handler tokens with other counters.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestId`] | Correlation key linking a request to its response |
//! | [`HandlerId`] | Registry slot of a transport message handler |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// RequestId
// ============================================================================

/// Correlation key for one intercepted request.
///
/// Generated once per intercepted request and carried verbatim in the
/// `response:<id>:` envelope. An identifier containing `:` would make its
/// envelope ambiguous, so the relay refuses to route it; see
/// [`RequestId::is_routable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Arc<str>);

impl RequestId {
    /// Wraps an existing identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Generates a fresh random identifier (UUID v4).
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Returns `true` if the identifier can be carried in an envelope.
    ///
    /// Empty identifiers and identifiers containing `:` are not routable.
    #[inline]
    #[must_use]
    pub fn is_routable(&self) -> bool {
        !self.0.is_empty() && !self.0.contains(':')
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// HandlerId
// ============================================================================

/// Process-wide counter for handler slots.
static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one registered handler inside a transport registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Allocates the next handler identifier.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new("r1");
        assert_eq!(id.to_string(), "r1");
        assert_eq!(id.as_str(), "r1");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().contains(':'));
    }

    #[test]
    fn test_routable_ids() {
        assert!(RequestId::new("r1").is_routable());
        assert!(RequestId::generate().is_routable());
        assert!(!RequestId::new("a:b").is_routable());
        assert!(!RequestId::new("").is_routable());
    }

    #[test]
    fn test_request_id_serde_transparent() {
        let id = RequestId::new("abc");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"abc\"");

        let back: RequestId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_handler_ids_increase() {
        let a = HandlerId::next();
        let b = HandlerId::next();
        assert!(b.as_u64() > a.as_u64());
    }
}
