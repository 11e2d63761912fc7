//! Native interception seam.
//!
//! Whatever hooks the real HTTP machinery hands captured calls to the
//! interceptor as [`InterceptedCall`] values through an
//! [`InterceptionSource`]. [`InterceptionHub`] is a ready-made source for
//! code that can route its outgoing calls through it directly.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::channel::Subscription;
use crate::identifiers::RequestId;
use crate::network::HttpRequest;

use super::interceptor::{Resolution, Resume};

// ============================================================================
// InterceptedCall
// ============================================================================

/// A captured call waiting for its resolution.
pub struct InterceptedCall {
    /// Correlation key.
    request_id: RequestId,
    /// Captured request.
    request: HttpRequest,
    /// Accepts the resolution for the suspended call.
    respond: Resume,
}

impl InterceptedCall {
    /// Creates a call; `respond` receives its resolution.
    pub fn new<F>(request_id: RequestId, request: HttpRequest, respond: F) -> Self
    where
        F: FnOnce(Option<Resolution>) + Send + 'static,
    {
        Self {
            request_id,
            request,
            respond: Box::new(respond),
        }
    }

    /// Returns the correlation key.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Returns the captured request.
    #[inline]
    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Resolves the call.
    pub fn respond_with(self, resolution: Option<Resolution>) {
        (self.respond)(resolution);
    }

    /// Splits the call into its parts.
    #[must_use]
    pub fn into_parts(self) -> (RequestId, HttpRequest, Resume) {
        (self.request_id, self.request, self.respond)
    }
}

impl fmt::Debug for InterceptedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptedCall")
            .field("request_id", &self.request_id)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// InterceptionSource
// ============================================================================

/// Callback receiving captured calls.
pub type CallHandler = Arc<dyn Fn(InterceptedCall) + Send + Sync>;

/// Producer of captured calls.
pub trait InterceptionSource: Send + Sync {
    /// Routes every captured call to `handler` until unsubscribed.
    fn on_call(&self, handler: CallHandler) -> Subscription;
}

// ============================================================================
// InterceptionHub
// ============================================================================

/// Active handler with its registration token.
type HandlerSlot = Option<(u64, CallHandler)>;

/// Single-handler interception source.
///
/// At most one handler is active; registering another replaces it. Calls
/// made while no handler is active pass through.
pub struct InterceptionHub {
    /// Active handler.
    slot: Arc<Mutex<HandlerSlot>>,
    /// Registration token counter.
    next_token: AtomicU64,
}

impl InterceptionHub {
    /// Creates a hub with no active handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            next_token: AtomicU64::new(0),
        }
    }

    /// Returns `true` if a handler is active.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Hands a call to the active handler.
    ///
    /// Without a handler the call resolves with
    /// [`Resolution::Passthrough`] at once.
    pub fn emit(&self, call: InterceptedCall) {
        let handler = self.slot.lock().as_ref().map(|(_, h)| Arc::clone(h));
        match handler {
            Some(handler) => handler(call),
            None => {
                trace!(request_id = %call.request_id, "No active handler, passing through");
                call.respond_with(Some(Resolution::Passthrough));
            }
        }
    }

    /// Captures `request` under a fresh id and waits for its resolution.
    pub async fn intercept(&self, request: HttpRequest) -> Option<Resolution> {
        self.intercept_with_id(RequestId::generate(), request).await
    }

    /// Captures `request` under `request_id` and waits for its resolution.
    ///
    /// Returns `None` if the call resumed without a resolution or its
    /// continuation was dropped.
    pub async fn intercept_with_id(
        &self,
        request_id: RequestId,
        request: HttpRequest,
    ) -> Option<Resolution> {
        let (tx, rx) = oneshot::channel();
        self.emit(InterceptedCall::new(request_id, request, move |resolution| {
            let _ = tx.send(resolution);
        }));
        rx.await.ok().flatten()
    }
}

impl Default for InterceptionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InterceptionHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionHub")
            .field("active", &self.is_active())
            .finish()
    }
}

impl InterceptionSource for InterceptionHub {
    fn on_call(&self, handler: CallHandler) -> Subscription {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let replaced = self.slot.lock().replace((token, handler));
        if replaced.is_some() {
            debug!("Replacing active interception handler");
        }
        drop(replaced);

        let slot = Arc::downgrade(&self.slot);
        Subscription::new(move || {
            let Some(slot) = slot.upgrade() else {
                return;
            };
            let taken = {
                let mut guard = slot.lock();
                let current = matches!(&*guard, Some((active, _)) if *active == token);
                if current { guard.take() } else { None }
            };
            drop(taken);
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use url::Url;

    fn request() -> HttpRequest {
        HttpRequest::get(Url::parse("https://x/").expect("valid url"))
    }

    #[tokio::test]
    async fn test_no_handler_passes_through() {
        let hub = InterceptionHub::new();
        assert_eq!(hub.intercept(request()).await, Some(Resolution::Passthrough));
    }

    #[tokio::test]
    async fn test_handler_resolves_call() {
        let hub = InterceptionHub::new();
        let _sub = hub.on_call(Arc::new(|call: InterceptedCall| {
            call.respond_with(Some(Resolution::Passthrough));
        }));

        assert_eq!(
            hub.intercept_with_id(RequestId::new("r1"), request()).await,
            Some(Resolution::Passthrough)
        );
    }

    #[tokio::test]
    async fn test_dropped_call_resolves_none() {
        let hub = InterceptionHub::new();
        let _sub = hub.on_call(Arc::new(|call: InterceptedCall| drop(call)));

        assert_eq!(hub.intercept(request()).await, None);
    }

    #[test]
    fn test_stale_subscription_keeps_replacement() {
        let hub = InterceptionHub::new();
        let first = hub.on_call(Arc::new(|_| {}));
        let second = hub.on_call(Arc::new(|_| {}));

        first.unsubscribe();
        assert!(hub.is_active());

        second.unsubscribe();
        assert!(!hub.is_active());
    }
}
