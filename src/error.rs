//! Error types for the HTTP relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Construction-time failures are the only errors surfaced to callers.
//! Everything that happens while messages are in flight degrades to a
//! log line and a silent drop.
//!
//! ```ignore
//! use http_relay::{Result, Transport};
//!
//! fn example(channel: Arc<dyn Channel>) -> Result<()> {
//!     let transport = Transport::builder().channel(channel).build()?;
//!     transport.send("hello");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Channel | [`Error::ChannelUnavailable`], [`Error::Channel`], [`Error::Disposed`] |
//! | Protocol | [`Error::Protocol`] |
//! | Execution | [`Error::Timeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a transport or channel is built with missing or
    /// invalid settings.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// The channel cannot be used from the current execution context.
    #[error("Channel unavailable: {reason}")]
    ChannelUnavailable {
        /// Why the channel is not usable.
        reason: String,
    },

    /// Pushing a payload to the peer failed.
    #[error("Channel send failed: {message}")]
    Channel {
        /// Description of the send failure.
        message: String,
    },

    /// The transport has been disposed.
    #[error("Transport disposed")]
    Disposed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed envelope or record.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// No response arrived within the configured timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    Timeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a channel unavailable error.
    #[inline]
    pub fn channel_unavailable(reason: impl Into<String>) -> Self {
        Self::ChannelUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a channel send error.
    #[inline]
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::Timeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns `true` if this is a channel-level error.
    #[inline]
    #[must_use]
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            Self::ChannelUnavailable { .. } | Self::Channel { .. } | Self::Disposed | Self::Io(_)
        )
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Channel { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::channel("peer gone");
        assert_eq!(err.to_string(), "Channel send failed: peer gone");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing channel");
        assert_eq!(err.to_string(), "Configuration error: missing channel");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::timeout(RequestId::new("r1"), 250);
        assert_eq!(err.to_string(), "Request r1 timed out after 250ms");
        assert!(err.is_timeout());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_is_channel_error() {
        assert!(Error::channel("x").is_channel_error());
        assert!(Error::channel_unavailable("x").is_channel_error());
        assert!(Error::Disposed.is_channel_error());
        assert!(!Error::config("x").is_channel_error());
    }

    #[test]
    fn test_protocol_error_not_recoverable() {
        let err = Error::protocol("missing request id");
        assert_eq!(err.to_string(), "Protocol error: missing request id");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_channel_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
