//! Builder pattern for transport configuration.
//!
//! # Example
//!
//! ```ignore
//! use http_relay::Transport;
//!
//! let transport = Transport::builder()
//!     .channel(channel)
//!     .prefix("my-app")
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::channel::Channel;
use crate::error::{Error, Result};

use super::core::Transport;
use super::prefix::{DEFAULT_PREFIX, Prefix};

// ============================================================================
// TransportOptions
// ============================================================================

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Namespace prefix. Both endpoints must use the same one.
    pub prefix: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl TransportOptions {
    /// Creates options with the default prefix.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the namespace prefix.
    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

// ============================================================================
// TransportBuilder
// ============================================================================

/// Builder for configuring a [`Transport`].
///
/// Use [`Transport::builder()`] to create a new builder.
#[derive(Clone, Default)]
pub struct TransportBuilder {
    /// Underlying channel.
    channel: Option<Arc<dyn Channel>>,
    /// Transport options.
    options: TransportOptions,
}

impl TransportBuilder {
    /// Creates a new builder with default options and no channel.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the channel the transport owns.
    #[inline]
    #[must_use]
    pub fn channel(mut self, channel: Arc<dyn Channel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Sets the namespace prefix.
    #[inline]
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.prefix = prefix.into();
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the transport with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no channel was set
    /// - [`Error::Config`] if the prefix is empty
    pub fn build(self) -> Result<Transport> {
        let channel = self.channel.ok_or_else(|| {
            Error::config(
                "Channel is required. Use .channel() to set it.\n\
                 Example: Transport::builder().channel(Arc::new(window_channel))",
            )
        })?;
        let prefix = Prefix::new(&self.options.prefix)?;

        Ok(Transport::new(channel, prefix))
    }
}

impl fmt::Debug for TransportBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportBuilder")
            .field("channel", &self.channel.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::channel::{ChildProcessChannel, MemoryProcess};

    fn channel() -> Arc<dyn Channel> {
        let (child, _link) = MemoryProcess::spawn();
        Arc::new(ChildProcessChannel::new(child))
    }

    #[test]
    fn test_default_options() {
        let options = TransportOptions::default();
        assert_eq!(options.prefix, DEFAULT_PREFIX);
    }

    #[test]
    fn test_build_fails_without_channel() {
        let err = TransportBuilder::new().build().expect_err("no channel");
        assert!(err.is_config_error());
        assert!(err.to_string().contains("Channel"));
    }

    #[test]
    fn test_build_fails_with_empty_prefix() {
        let err = TransportBuilder::new()
            .channel(channel())
            .prefix("")
            .build()
            .expect_err("empty prefix");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_build_fails_with_separator_in_prefix() {
        let err = TransportBuilder::new()
            .channel(channel())
            .prefix("a:b")
            .build()
            .expect_err("separator in prefix");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_build_uses_prefix() {
        let transport = TransportBuilder::new()
            .channel(channel())
            .options(TransportOptions::new().with_prefix("custom"))
            .build()
            .expect("build");
        assert_eq!(transport.prefix().name(), "custom");
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = TransportBuilder::new().prefix("a");
        let cloned = builder.clone();
        assert_eq!(builder.options, cloned.options);
    }
}
