//! Protocol-level framing.
//!
//! The second framing layer, applied inside the transport prefix:
//!
//! ```text
//! protocol-message := "request:" json(SerializedRequestRecord)
//!                   | "response:" request-id ":" json(ResponsePayload)
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::to_string;

use crate::error::Result;
use crate::identifiers::RequestId;

use super::{ResponsePayload, SerializedRequestRecord};

// ============================================================================
// Constants
// ============================================================================

/// Tag opening every request message.
pub const REQUEST_TAG: &str = "request:";

/// Tag opening every response message.
pub const RESPONSE_TAG: &str = "response:";

// ============================================================================
// ProtocolMessage
// ============================================================================

/// A protocol message split into its kind and body, borrowing the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMessage<'a> {
    /// `request:<json>`
    Request {
        /// JSON request record.
        json: &'a str,
    },

    /// `response:<id>:<json>`
    Response {
        /// Correlation key.
        request_id: &'a str,
        /// JSON response payload.
        json: &'a str,
    },
}

impl<'a> ProtocolMessage<'a> {
    /// Splits a message into kind and body.
    ///
    /// Returns `None` for anything that is neither a request nor a
    /// well-framed response. The request id ends at the first `:`.
    #[must_use]
    pub fn parse(message: &'a str) -> Option<Self> {
        if let Some(json) = message.strip_prefix(REQUEST_TAG) {
            return Some(Self::Request { json });
        }

        let rest = message.strip_prefix(RESPONSE_TAG)?;
        let (request_id, json) = rest.split_once(':')?;
        if request_id.is_empty() {
            return None;
        }

        Some(Self::Response { request_id, json })
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes `request:<json>`.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if the record cannot be serialized.
pub fn encode_request(record: &SerializedRequestRecord) -> Result<String> {
    Ok(format!("{REQUEST_TAG}{}", to_string(record)?))
}

/// Encodes `response:<id>:<json>`.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if the payload cannot be serialized.
pub fn encode_response(request_id: &RequestId, payload: &ResponsePayload) -> Result<String> {
    Ok(format!(
        "{}{}",
        response_prefix(request_id),
        to_string(payload)?
    ))
}

/// Returns `response:<id>:`, the prefix a pending request listens for.
#[inline]
#[must_use]
pub fn response_prefix(request_id: &RequestId) -> String {
    format!("{RESPONSE_TAG}{request_id}:")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::HttpResponse;
    use crate::protocol::SerializedResponseRecord;

    #[test]
    fn test_parse_request() {
        let parsed = ProtocolMessage::parse(r#"request:{"id":"r1"}"#);
        assert_eq!(
            parsed,
            Some(ProtocolMessage::Request {
                json: r#"{"id":"r1"}"#
            })
        );
    }

    #[test]
    fn test_parse_response() {
        let parsed = ProtocolMessage::parse(r#"response:r1:{"status":200}"#);
        assert_eq!(
            parsed,
            Some(ProtocolMessage::Response {
                request_id: "r1",
                json: r#"{"status":200}"#
            })
        );
    }

    #[test]
    fn test_parse_rejects_foreign_messages() {
        assert_eq!(ProtocolMessage::parse("hello"), None);
        assert_eq!(ProtocolMessage::parse("response:"), None);
        assert_eq!(ProtocolMessage::parse("response:r1"), None);
        assert_eq!(ProtocolMessage::parse("response::{}"), None);
        assert_eq!(ProtocolMessage::parse("requests:{}"), None);
    }

    #[test]
    fn test_encode_response_scenario() {
        let payload = ResponsePayload::Mocked(SerializedResponseRecord::from_response(
            &HttpResponse::ok("hello"),
        ));
        let message = encode_response(&RequestId::new("r1"), &payload).expect("encode");

        assert_eq!(
            message,
            r#"response:r1:{"status":200,"statusText":"OK","headerPairs":[],"body":"hello"}"#
        );
        assert!(message.starts_with(&response_prefix(&RequestId::new("r1"))));
    }

    #[test]
    fn test_response_prefix_does_not_match_longer_id() {
        let prefix = response_prefix(&RequestId::new("r1"));
        assert!(!r#"response:r10:{}"#.starts_with(&prefix));
    }
}
