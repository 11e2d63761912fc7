//! Decision controller handed to the local responder.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::channel::listeners::ListenerSet;
use crate::identifiers::RequestId;
use crate::network::{HttpRequest, HttpResponse, NetworkError};
use crate::protocol::{ResponsePayload, SerializedResponseRecord, encode_response};
use crate::transport::Transport;

// ============================================================================
// ResponseNotice
// ============================================================================

/// Local notification that a mocked response was sent.
///
/// Emitted right after sending; the peer never acknowledges.
#[derive(Debug, Clone)]
pub struct ResponseNotice {
    /// Correlation key of the answered request.
    pub request_id: RequestId,
    /// The request as received.
    pub request: HttpRequest,
    /// The response as supplied by the responder.
    pub response: HttpResponse,
}

// ============================================================================
// RequestController
// ============================================================================

/// Terminates one relayed request.
///
/// Each terminal action consumes the controller, so at most one decision
/// is sent per request. Dropping the controller without deciding sends
/// nothing and leaves the interceptor's call pending.
pub struct RequestController {
    /// Correlation key.
    request_id: RequestId,
    /// The request as received.
    request: HttpRequest,
    /// Transport to answer on.
    transport: Transport,
    /// Observers of sent responses.
    notices: Arc<ListenerSet<ResponseNotice>>,
    /// Set once a terminal action ran.
    decided: bool,
}

impl RequestController {
    pub(crate) fn new(
        request_id: RequestId,
        request: HttpRequest,
        transport: Transport,
        notices: Arc<ListenerSet<ResponseNotice>>,
    ) -> Self {
        Self {
            request_id,
            request,
            transport,
            notices,
            decided: false,
        }
    }

    /// Returns the correlation key.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Returns the request being decided.
    #[inline]
    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Lets the call reach the real network.
    pub fn pass_through(mut self) {
        self.decided = true;
        debug!(request_id = %self.request_id, "Passing request through");
        self.send(&ResponsePayload::passthrough());
    }

    /// Answers the call with `response`.
    ///
    /// Any `content-encoding` header is dropped since the body travels as
    /// decoded text. Observers registered with
    /// [`Resolver::on_response`](super::Resolver::on_response) are notified
    /// right after sending.
    pub fn respond_with(mut self, response: HttpResponse) {
        self.decided = true;
        debug!(request_id = %self.request_id, status = response.status, "Responding with mock");

        let record = SerializedResponseRecord::from_response(&response);
        if !self.send(&ResponsePayload::Mocked(record)) {
            return;
        }

        self.notices.emit(&ResponseNotice {
            request_id: self.request_id.clone(),
            request: self.request.clone(),
            response,
        });
    }

    /// Fails the call with a network error.
    pub fn error_with(mut self, error: NetworkError) {
        self.decided = true;
        debug!(request_id = %self.request_id, error = %error, "Failing request");
        self.send(&ResponsePayload::NetworkError { error });
    }

    /// Sends a decision. Returns `false` if nothing could be sent.
    fn send(&self, payload: &ResponsePayload) -> bool {
        if self.transport.is_disposed() {
            debug!(request_id = %self.request_id, "Resolver disposed, decision dropped");
            return false;
        }

        match encode_response(&self.request_id, payload) {
            Ok(message) => {
                self.transport.send(&message);
                true
            }
            Err(e) => {
                warn!(request_id = %self.request_id, error = %e, "Failed to encode decision");
                false
            }
        }
    }
}

impl Drop for RequestController {
    fn drop(&mut self) {
        if !self.decided {
            debug!(request_id = %self.request_id, "Controller dropped without a decision");
        }
    }
}

impl fmt::Debug for RequestController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestController")
            .field("request_id", &self.request_id)
            .field("method", &self.request.method())
            .field("url", &self.request.url().as_str())
            .field("decided", &self.decided)
            .finish()
    }
}
