//! Interceptor role.
//!
//! Runs where HTTP calls originate. Each intercepted call is serialized,
//! sent as `request:<json>`, and suspended until `response:<id>:<json>`
//! comes back for the same correlation key.
//!
//! # Correlation
//!
//! Every in-flight call owns one pending entry keyed by its
//! [`RequestId`]: the continuation to resume and the dedicated listener
//! that watches for `response:<id>:`. The entry is removed the moment its
//! response is observed. Calls whose response never arrives stay pending
//! until the interceptor is disposed, unless they were started with
//! [`Interceptor::relay_with_timeout`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::channel::Subscription;
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::network::{HttpRequest, HttpResponse, NetworkError};
use crate::protocol::{ResponsePayload, SerializedRequestRecord, encode_request, response_prefix};
use crate::transport::Transport;

use super::source::{InterceptedCall, InterceptionSource};

// ============================================================================
// Types
// ============================================================================

/// Continuation resuming one suspended call.
///
/// `None` means the call carries on without a resolution.
pub type Resume = Box<dyn FnOnce(Option<Resolution>) + Send>;

/// Outcome delivered to a suspended call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Answer the call with this mocked response.
    Respond(HttpResponse),
    /// Fail the call with a network error.
    NetworkError(NetworkError),
    /// Let the call reach the real network.
    Passthrough,
}

impl From<ResponsePayload> for Resolution {
    fn from(payload: ResponsePayload) -> Self {
        match payload {
            ResponsePayload::Mocked(record) => Self::Respond(record.into_response()),
            ResponsePayload::NetworkError { error } => Self::NetworkError(error),
            ResponsePayload::Passthrough { .. } => Self::Passthrough,
        }
    }
}

/// One suspended call.
struct PendingCorrelation {
    /// Continuation for the call.
    resume: Resume,
    /// Listener for `response:<id>:`.
    listener: Subscription,
}

/// Pending calls by correlation key.
type PendingMap = FxHashMap<RequestId, PendingCorrelation>;

// ============================================================================
// Interceptor
// ============================================================================

/// Originating end of the relay.
///
/// Owns its transport; disposing the interceptor disposes the transport
/// and drops every pending continuation without calling it.
#[derive(Clone)]
pub struct Interceptor {
    /// Owned transport.
    transport: Transport,
    /// Suspended calls.
    pending: Arc<Mutex<PendingMap>>,
}

impl Interceptor {
    /// Creates an interceptor over `transport`.
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        let pending: Arc<Mutex<PendingMap>> = Arc::new(Mutex::new(PendingMap::default()));

        let weak = Arc::downgrade(&pending);
        transport.track(Subscription::new(move || {
            if let Some(pending) = weak.upgrade() {
                let dropped = std::mem::take(&mut *pending.lock());
                if !dropped.is_empty() {
                    debug!(count = dropped.len(), "Dropping pending calls on dispose");
                }
            }
        }));

        if !transport.is_available() {
            warn!(prefix = %transport.prefix(), "Interceptor transport unavailable in this context");
        }

        Self { transport, pending }
    }

    /// Returns the owned transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Relays one call and resumes it through `resume`.
    ///
    /// `resume` runs at most once. It runs immediately with `None` when
    /// the transport is unusable or disposed, when `request_id` is not
    /// routable or already in flight, or when the request cannot be
    /// encoded. A response whose
    /// body fails to parse also resumes with `None`.
    pub fn dispatch<F>(&self, request_id: RequestId, request: &HttpRequest, resume: F)
    where
        F: FnOnce(Option<Resolution>) + Send + 'static,
    {
        if self.transport.is_disposed() {
            debug!(request_id = %request_id, "Interceptor disposed, call not relayed");
            resume(None);
            return;
        }

        if !request_id.is_routable() {
            warn!(request_id = %request_id, "Request id not routable, call not relayed");
            resume(None);
            return;
        }

        if !self.transport.is_available() {
            warn!(request_id = %request_id, "Interceptor transport unavailable, call not relayed");
            resume(None);
            return;
        }

        if self.pending.lock().contains_key(&request_id) {
            warn!(request_id = %request_id, "Request id already in flight, call not relayed");
            resume(None);
            return;
        }

        let record = SerializedRequestRecord::from_request(request_id.clone(), request);
        let message = match encode_request(&record) {
            Ok(message) => message,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Failed to encode request");
                resume(None);
                return;
            }
        };

        let listener = self.listen_for(request_id.clone());
        self.pending.lock().insert(
            request_id.clone(),
            PendingCorrelation {
                resume: Box::new(resume),
                listener,
            },
        );

        debug!(
            request_id = %request_id,
            method = %request.method(),
            url = %request.url(),
            "Relaying intercepted call"
        );

        self.transport.send(&message);
    }

    /// Relays one call and waits for its resolution.
    ///
    /// Waits indefinitely. Returns `None` when the call was not relayed,
    /// the response was malformed, or the interceptor was disposed first.
    pub async fn relay(&self, request_id: RequestId, request: &HttpRequest) -> Option<Resolution> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(request_id, request, move |resolution| {
            let _ = tx.send(resolution);
        });
        rx.await.ok().flatten()
    }

    /// Relays one call, giving up after `response_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the interceptor is disposed before
    /// the call resolves, and [`Error::Timeout`] if no response arrived in
    /// time. The pending entry and its listener are removed on timeout.
    pub async fn relay_with_timeout(
        &self,
        request_id: RequestId,
        request: &HttpRequest,
        response_timeout: Duration,
    ) -> Result<Option<Resolution>> {
        if self.transport.is_disposed() {
            return Err(Error::Disposed);
        }

        let (tx, rx) = oneshot::channel();
        self.dispatch(request_id.clone(), request, move |resolution| {
            let _ = tx.send(resolution);
        });

        match timeout(response_timeout, rx).await {
            Ok(Ok(resolution)) => Ok(resolution),
            // Continuation dropped without running: only disposal does that
            Ok(Err(_)) => Err(Error::Disposed),
            Err(_) => {
                self.forget(&request_id);
                let timeout_ms = u64::try_from(response_timeout.as_millis()).unwrap_or(u64::MAX);
                Err(Error::timeout(request_id, timeout_ms))
            }
        }
    }

    /// Relays every call produced by `source` until disposal.
    ///
    /// Returns `false` without subscribing when the transport is unusable
    /// or disposed.
    pub fn attach(&self, source: &dyn InterceptionSource) -> bool {
        if self.transport.is_disposed() {
            debug!("Interceptor disposed, not attaching");
            return false;
        }

        if !self.transport.is_available() {
            warn!(prefix = %self.transport.prefix(), "Interceptor transport unavailable, not attaching");
            return false;
        }

        let transport = self.transport.downgrade();
        let pending = Arc::downgrade(&self.pending);
        let subscription = source.on_call(Arc::new(move |call: InterceptedCall| {
            let (request_id, request, respond) = call.into_parts();
            match (transport.upgrade(), pending.upgrade()) {
                (Some(transport), Some(pending)) => {
                    Interceptor { transport, pending }.dispatch(request_id, &request, respond);
                }
                _ => respond(None),
            }
        }));

        self.transport.track(subscription);
        debug!(prefix = %self.transport.prefix(), "Interceptor attached");
        true
    }

    /// Number of calls waiting for a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Disposes the interceptor and its transport.
    pub fn dispose(&self) {
        self.transport.dispose();
    }

    /// Returns `true` once disposed.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.transport.is_disposed()
    }

    /// Registers the listener for one correlation key.
    fn listen_for(&self, request_id: RequestId) -> Subscription {
        let prefix = response_prefix(&request_id);
        let pending: Weak<Mutex<PendingMap>> = Arc::downgrade(&self.pending);

        self.transport.add_listener(move |body: &str| {
            let Some(json) = body.strip_prefix(prefix.as_str()) else {
                return Ok(());
            };
            let Some(pending) = pending.upgrade() else {
                return Ok(());
            };
            let Some(entry) = pending.lock().remove(&request_id) else {
                trace!(request_id = %request_id, "Response for settled call ignored");
                return Ok(());
            };

            entry.listener.unsubscribe();

            match serde_json::from_str::<ResponsePayload>(json) {
                Ok(payload) => {
                    debug!(request_id = %request_id, "Response matched");
                    (entry.resume)(Some(Resolution::from(payload)));
                    Ok(())
                }
                Err(e) => {
                    (entry.resume)(None);
                    Err(Error::protocol(format!(
                        "Malformed response for {request_id}: {e}"
                    )))
                }
            }
        })
    }

    /// Removes a pending entry without resuming it.
    fn forget(&self, request_id: &RequestId) {
        let entry = self.pending.lock().remove(request_id);
        if let Some(entry) = entry {
            entry.listener.unsubscribe();
            debug!(request_id = %request_id, "Pending call abandoned");
        }
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("transport", &self.transport)
            .field("pending", &self.pending_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
