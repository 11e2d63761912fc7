//! Mocked HTTP response and network failure values.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Headers;

// ============================================================================
// HttpResponse
// ============================================================================

/// A response produced on the resolver side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,

    /// HTTP status text.
    pub status_text: String,

    /// Response headers, in order.
    pub headers: Headers,

    /// Decoded body text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with the given status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Creates a `200 OK` response.
    #[inline]
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body).with_status_text("OK")
    }

    /// Sets the status text.
    #[inline]
    #[must_use]
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Appends one header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the header list.
    #[inline]
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Returns `true` for 2xx statuses.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// NetworkError
// ============================================================================

/// A network-level failure reported instead of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkError {
    /// Human-readable reason.
    pub message: String,
}

impl NetworkError {
    /// Creates a network error with the given reason.
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for NetworkError {
    fn default() -> Self {
        Self::new("Failed to fetch")
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response() {
        let response = HttpResponse::ok("hello");
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.body, "hello");
        assert!(response.is_success());
    }

    #[test]
    fn test_builder_headers() {
        let response = HttpResponse::new(404, "")
            .with_status_text("Not Found")
            .with_header("X-A", "1")
            .with_header("X-A", "2");

        assert!(!response.is_success());
        assert_eq!(response.headers.get_all("x-a"), vec!["1", "2"]);
    }

    #[test]
    fn test_network_error_default() {
        assert_eq!(NetworkError::default().to_string(), "Failed to fetch");
    }
}
