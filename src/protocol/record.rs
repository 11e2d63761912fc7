//! Serialized request and response records.
//!
//! These are the JSON bodies carried inside protocol messages.
//!
//! # Format
//!
//! Request:
//! ```json
//! {
//!   "id": "r1",
//!   "method": "GET",
//!   "url": "https://x/",
//!   "headerPairs": [["accept", "*/*"]],
//!   "credentials": "omit",
//!   "body": null
//! }
//! ```
//!
//! Response:
//! ```json
//! { "status": 200, "statusText": "OK", "headerPairs": [], "body": "hello" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

use crate::identifiers::RequestId;
use crate::network::{
    CredentialsMode, Headers, HttpRequest, HttpResponse, NetworkError, method_allows_body,
};

// ============================================================================
// SerializedRequestRecord
// ============================================================================

/// Wire form of an intercepted request.
///
/// `url` and `headerPairs` are revived into [`Url`] and [`Headers`] while
/// parsing, so a malformed URL fails the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedRequestRecord {
    /// Correlation key.
    pub id: RequestId,

    /// HTTP method.
    pub method: String,

    /// Absolute request URL.
    pub url: Url,

    /// Ordered header pairs.
    #[serde(rename = "headerPairs")]
    pub header_pairs: Headers,

    /// Credentials mode.
    pub credentials: CredentialsMode,

    /// Body text; `null` for methods without a body.
    pub body: Option<String>,
}

impl SerializedRequestRecord {
    /// Captures a request under the given correlation key.
    #[must_use]
    pub fn from_request(id: RequestId, request: &HttpRequest) -> Self {
        let body = if method_allows_body(request.method()) {
            Some(request.body().unwrap_or_default().to_string())
        } else {
            None
        };

        Self {
            id,
            method: request.method().to_string(),
            url: request.url().clone(),
            header_pairs: request.headers().clone(),
            credentials: request.credentials(),
            body,
        }
    }

    /// Reconstructs the request and returns it with its correlation key.
    #[must_use]
    pub fn into_request(self) -> (RequestId, HttpRequest) {
        let mut request = HttpRequest::new(&self.method, self.url)
            .with_headers(self.header_pairs)
            .with_credentials(self.credentials);

        if let Some(body) = self.body {
            request = request.with_body(body);
        }

        (self.id, request)
    }
}

// ============================================================================
// SerializedResponseRecord
// ============================================================================

/// Wire form of a mocked response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedResponseRecord {
    /// HTTP status code.
    pub status: u16,

    /// HTTP status text.
    #[serde(rename = "statusText")]
    pub status_text: String,

    /// Ordered header pairs.
    #[serde(rename = "headerPairs")]
    pub header_pairs: Headers,

    /// Decoded body text.
    pub body: String,
}

impl SerializedResponseRecord {
    /// Captures a response without consuming it.
    ///
    /// The body is already decoded text, so any `content-encoding` header is
    /// dropped from the copy.
    #[must_use]
    pub fn from_response(response: &HttpResponse) -> Self {
        let mut header_pairs = response.headers.clone();
        header_pairs.remove("content-encoding");

        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            header_pairs,
            body: response.body.clone(),
        }
    }

    /// Reconstructs the response.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            status_text: self.status_text,
            headers: self.header_pairs,
            body: self.body,
        }
    }
}

// ============================================================================
// ResponsePayload
// ============================================================================

/// Body of a `response:<id>:` message.
///
/// Mocked responses keep the bare [`SerializedResponseRecord`] shape; the
/// other decisions use distinct single-key objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    /// A mocked response.
    Mocked(SerializedResponseRecord),

    /// `{"error": {"message": "..."}}`
    NetworkError {
        /// The failure to surface.
        error: NetworkError,
    },

    /// `{"passthrough": true}`
    Passthrough {
        /// Always `true` on the wire.
        passthrough: bool,
    },
}

impl ResponsePayload {
    /// Creates a pass-through payload.
    #[inline]
    #[must_use]
    pub fn passthrough() -> Self {
        Self::Passthrough { passthrough: true }
    }
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
    fn test_get_record_matches_wire_shape() {
        let request = HttpRequest::get(url("https://x/")).with_credentials(CredentialsMode::Omit);
        let record = SerializedRequestRecord::from_request(RequestId::new("r1"), &request);
        let json = serde_json::to_string(&record).expect("serialize");

        assert_eq!(
            json,
            r#"{"id":"r1","method":"GET","url":"https://x/","headerPairs":[],"credentials":"omit","body":null}"#
        );
    }

    #[test]
    fn test_post_without_body_serializes_empty_text() {
        let request = HttpRequest::new("POST", url("https://x/submit"));
        let record = SerializedRequestRecord::from_request(RequestId::new("r2"), &request);
        assert_eq!(record.body.as_deref(), Some(""));
    }

    #[test]
    fn test_request_record_revives_url_and_headers() {
        let json = r#"{
            "id": "r3",
            "method": "PUT",
            "url": "https://example.com/a?b=c",
            "headerPairs": [["X-A", "1"], ["x-a", "2"]],
            "credentials": "include",
            "body": "payload"
        }"#;

        let record: SerializedRequestRecord = serde_json::from_str(json).expect("parse");
        let (id, request) = record.into_request();

        assert_eq!(id, RequestId::new("r3"));
        assert_eq!(request.url().host_str(), Some("example.com"));
        assert_eq!(request.url().query(), Some("b=c"));
        assert_eq!(request.headers().get_all("X-A"), vec!["1", "2"]);
        assert_eq!(request.credentials(), CredentialsMode::Include);
        assert_eq!(request.body(), Some("payload"));
    }

    #[test]
    fn test_request_record_rejects_bad_url() {
        let json = r#"{"id":"r4","method":"GET","url":"not a url","headerPairs":[],"credentials":"omit","body":null}"#;
        assert!(serde_json::from_str::<SerializedRequestRecord>(json).is_err());
    }

    #[test]
    fn test_response_record_strips_content_encoding() {
        let response = HttpResponse::ok("hello")
            .with_header("Content-Encoding", "gzip")
            .with_header("Content-Type", "text/plain");

        let record = SerializedResponseRecord::from_response(&response);

        assert!(!record.header_pairs.contains("content-encoding"));
        assert_eq!(record.header_pairs.get("content-type"), Some("text/plain"));
        // Caller's copy is untouched.
        assert!(response.headers.contains("Content-Encoding"));
    }

    #[test]
    fn test_response_record_wire_shape() {
        let record = SerializedResponseRecord::from_response(&HttpResponse::ok("hello"));
        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(
            json,
            r#"{"status":200,"statusText":"OK","headerPairs":[],"body":"hello"}"#
        );
    }

    #[test]
    fn test_payload_variants_parse() {
        let mocked: ResponsePayload =
            serde_json::from_str(r#"{"status":201,"statusText":"Created","headerPairs":[],"body":""}"#)
                .expect("mocked");
        assert!(matches!(mocked, ResponsePayload::Mocked(ref r) if r.status == 201));

        let failed: ResponsePayload =
            serde_json::from_str(r#"{"error":{"message":"boom"}}"#).expect("error");
        assert_eq!(
            failed,
            ResponsePayload::NetworkError {
                error: NetworkError::new("boom")
            }
        );

        let passthrough: ResponsePayload =
            serde_json::from_str(r#"{"passthrough":true}"#).expect("passthrough");
        assert_eq!(passthrough, ResponsePayload::passthrough());
    }

    #[test]
    fn test_payload_rejects_unknown_shape() {
        assert!(serde_json::from_str::<ResponsePayload>(r#"{"status":"nope"}"#).is_err());
        assert!(serde_json::from_str::<ResponsePayload>("not json").is_err());
    }
}
