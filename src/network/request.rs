//! Intercepted HTTP request value.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

use super::Headers;

// ============================================================================
// CredentialsMode
// ============================================================================

/// Whether the request carries cookies and auth credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsMode {
    /// Never send credentials.
    Omit,
    /// Send credentials to same-origin URLs only.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
}

// ============================================================================
// HttpRequest
// ============================================================================

/// A captured HTTP request.
///
/// The body is plain text. Methods that carry no body (`GET`, `HEAD`)
/// always report `None` from [`HttpRequest::body`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Upper-cased HTTP method.
    method: String,

    /// Absolute request URL.
    url: Url,

    /// Request headers, in order.
    headers: Headers,

    /// Credentials mode.
    credentials: CredentialsMode,

    /// Body text, if any.
    body: Option<String>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    #[must_use]
    pub fn new(method: impl AsRef<str>, url: Url) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            url,
            headers: Headers::new(),
            credentials: CredentialsMode::default(),
            body: None,
        }
    }

    /// Creates a request from an unparsed URL string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`](crate::Error::Url) if `url` is not an absolute URL.
    pub fn parse(method: impl AsRef<str>, url: &str) -> Result<Self> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    /// Shorthand for a `GET` request.
    #[inline]
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// Sets the header list.
    #[inline]
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Appends one header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the credentials mode.
    #[inline]
    #[must_use]
    pub fn with_credentials(mut self, credentials: CredentialsMode) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the body text. Ignored for `GET` and `HEAD`.
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        if method_allows_body(&self.method) {
            self.body = Some(body.into());
        }
        self
    }

    /// HTTP method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Credentials mode.
    #[inline]
    #[must_use]
    pub fn credentials(&self) -> CredentialsMode {
        self.credentials
    }

    /// Body text. Always `None` for `GET` and `HEAD`.
    #[inline]
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Returns `false` for methods that never carry a body.
#[inline]
#[must_use]
pub fn method_allows_body(method: &str) -> bool {
    !(method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[test]
    fn test_method_is_uppercased() {
        let request = HttpRequest::new("post", url("https://x/"));
        assert_eq!(request.method(), "POST");
    }

    #[test]
    fn test_parse_reports_bad_url() {
        let request = HttpRequest::parse("get", "https://x/a?b=1").expect("valid");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.url().query(), Some("b=1"));

        let err = HttpRequest::parse("GET", "/relative").expect_err("relative url");
        assert!(matches!(err, crate::Error::Url(_)));
    }

    #[test]
    fn test_get_and_head_drop_body() {
        let get = HttpRequest::get(url("https://x/")).with_body("ignored");
        let head = HttpRequest::new("HEAD", url("https://x/")).with_body("ignored");
        assert_eq!(get.body(), None);
        assert_eq!(head.body(), None);
    }

    #[test]
    fn test_post_keeps_body() {
        let request = HttpRequest::new("POST", url("https://x/api"))
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"a":1}"#);

        assert_eq!(request.body(), Some(r#"{"a":1}"#));
        assert_eq!(request.headers().get("content-type"), Some("application/json"));
    }

    #[test]
    fn test_credentials_wire_names() {
        let json = serde_json::to_string(&CredentialsMode::SameOrigin).expect("serialize");
        assert_eq!(json, "\"same-origin\"");
        assert_eq!(CredentialsMode::default(), CredentialsMode::SameOrigin);
    }
}
