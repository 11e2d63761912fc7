//! Transport-level namespace prefix.
//!
//! The first framing layer: `<prefix>:<body>`. Several transports can share
//! one physical channel as long as their prefixes differ.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix used when neither endpoint configures one.
pub const DEFAULT_PREFIX: &str = "http-relay";

// ============================================================================
// Prefix
// ============================================================================

/// A validated namespace prefix, stored with its trailing `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prefix {
    /// `"<name>:"`
    framed: String,
}

impl Prefix {
    /// Creates a prefix from its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the name is empty or contains `:`.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(Error::config("Transport prefix must not be empty"));
        }
        // `a` would otherwise claim every message framed for `a:b`
        if name.contains(':') {
            return Err(Error::config(format!(
                "Transport prefix '{name}' must not contain ':'"
            )));
        }
        Ok(Self {
            framed: format!("{name}:"),
        })
    }

    /// The prefix name without the separator.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.framed[..self.framed.len() - 1]
    }

    /// Returns `true` if `raw` belongs to this namespace.
    #[inline]
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        raw.starts_with(&self.framed)
    }

    /// Prepends `<name>:` to `body`.
    #[inline]
    #[must_use]
    pub fn frame(&self, body: &str) -> String {
        let mut framed = String::with_capacity(self.framed.len() + body.len());
        framed.push_str(&self.framed);
        framed.push_str(body);
        framed
    }

    /// Strips `<name>:` from `raw`, or returns `None` for foreign messages.
    #[inline]
    #[must_use]
    pub fn strip<'a>(&self, raw: &'a str) -> Option<&'a str> {
        raw.strip_prefix(&self.framed)
    }
}

impl Default for Prefix {
    fn default() -> Self {
        Self {
            framed: format!("{DEFAULT_PREFIX}:"),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_and_strip() {
        let prefix = Prefix::new("p1").expect("valid");
        let framed = prefix.frame("request:{}");

        assert_eq!(framed, "p1:request:{}");
        assert_eq!(prefix.strip(&framed), Some("request:{}"));
        assert_eq!(prefix.name(), "p1");
    }

    #[test]
    fn test_foreign_prefix_does_not_match() {
        let prefix = Prefix::new("p1").expect("valid");

        assert!(!prefix.matches("p2:request:{}"));
        assert!(!prefix.matches("p10:request:{}"));
        assert!(!prefix.matches("p1"));
        assert_eq!(prefix.strip("request:{}"), None);
    }

    #[test]
    fn test_empty_prefix_rejected() {
        assert!(Prefix::new("").expect_err("empty").is_config_error());
    }

    #[test]
    fn test_prefix_with_separator_rejected() {
        let err = Prefix::new("a:b").expect_err("separator");
        assert!(err.is_config_error());
        assert!(err.to_string().contains("a:b"));
        assert!(Prefix::new(":").is_err());
    }

    #[test]
    fn test_default_prefix() {
        assert_eq!(Prefix::default().to_string(), DEFAULT_PREFIX);
    }
}
