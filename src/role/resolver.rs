//! Resolver role.
//!
//! Runs where mock responses are produced. Each incoming `request:<json>`
//! is revived into an [`HttpRequest`] and handed to the local responder
//! together with a [`RequestController`]; the responder's decision goes
//! back as `response:<id>:<json>`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::channel::Subscription;
use crate::channel::listeners::ListenerSet;
use crate::identifiers::RequestId;
use crate::network::HttpRequest;
use crate::protocol::{ProtocolMessage, SerializedRequestRecord};
use crate::transport::Transport;

use super::controller::{RequestController, ResponseNotice};

// ============================================================================
// LocalResponder
// ============================================================================

/// Produces decisions for relayed requests.
///
/// Implementations should eventually call exactly one terminal action on
/// the controller, possibly from another task.
pub trait LocalResponder: Send + Sync {
    /// Decides `request`.
    fn respond(&self, request: HttpRequest, request_id: RequestId, controller: RequestController);
}

impl<F> LocalResponder for F
where
    F: Fn(HttpRequest, RequestId, RequestController) + Send + Sync,
{
    fn respond(&self, request: HttpRequest, request_id: RequestId, controller: RequestController) {
        self(request, request_id, controller);
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Answering end of the relay.
///
/// Owns its transport; disposing the resolver disposes the transport,
/// which stops every responder and drops every response observer.
#[derive(Clone)]
pub struct Resolver {
    /// Owned transport.
    transport: Transport,
    /// Observers of sent responses.
    notices: Arc<ListenerSet<ResponseNotice>>,
}

impl Resolver {
    /// Creates a resolver over `transport`.
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        let notices: Arc<ListenerSet<ResponseNotice>> = ListenerSet::new();

        let observers = Arc::downgrade(&notices);
        transport.track(Subscription::new(move || {
            if let Some(observers) = observers.upgrade() {
                observers.clear();
            }
        }));

        Self { transport, notices }
    }

    /// Returns the owned transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Starts answering incoming requests with `responder`.
    ///
    /// Returns `false` without subscribing when the transport is unusable
    /// or disposed. Non-request and malformed messages are ignored, as are
    /// requests whose id is not routable.
    pub fn listen<R>(&self, responder: R) -> bool
    where
        R: LocalResponder + 'static,
    {
        if self.transport.is_disposed() {
            debug!("Resolver disposed, not listening");
            return false;
        }

        if !self.transport.is_available() {
            warn!(prefix = %self.transport.prefix(), "Resolver transport unavailable, not listening");
            return false;
        }

        let responder = Arc::new(responder);
        let transport = self.transport.downgrade();
        let notices = Arc::clone(&self.notices);

        let subscription = self.transport.add_listener(move |body: &str| {
            let Some(ProtocolMessage::Request { json }) = ProtocolMessage::parse(body) else {
                trace!("Ignoring non-request message");
                return Ok(());
            };

            let record: SerializedRequestRecord = match serde_json::from_str(json) {
                Ok(record) => record,
                Err(e) => {
                    trace!(error = %e, "Ignoring malformed request record");
                    return Ok(());
                }
            };

            let (request_id, request) = record.into_request();
            if !request_id.is_routable() {
                warn!(request_id = %request_id, "Dropping request with unroutable id");
                return Ok(());
            }

            let Some(transport) = transport.upgrade() else {
                return Ok(());
            };

            debug!(
                request_id = %request_id,
                method = %request.method(),
                url = %request.url(),
                "Resolving relayed request"
            );

            let controller = RequestController::new(
                request_id.clone(),
                request.clone(),
                transport,
                Arc::clone(&notices),
            );
            responder.respond(request, request_id, controller);
            Ok(())
        });

        self.transport.track(subscription);
        debug!(prefix = %self.transport.prefix(), "Resolver listening");
        true
    }

    /// Registers an observer notified after each mocked response is sent.
    pub fn on_response<F>(&self, hook: F) -> Subscription
    where
        F: Fn(&ResponseNotice) + Send + Sync + 'static,
    {
        if self.transport.is_disposed() {
            return Subscription::inert();
        }
        self.notices.add(Arc::new(hook))
    }

    /// Disposes the resolver and its transport.
    pub fn dispose(&self) {
        self.transport.dispose();
    }

    /// Returns `true` once disposed.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.transport.is_disposed()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("transport", &self.transport)
            .field("observers", &self.notices.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use url::Url;

    use crate::channel::{Channel, ParentProcessChannel, RawHandler, TerminationHook};
    use crate::error::Result;
    use crate::network::{CredentialsMode, HttpResponse, NetworkError};

    /// Channel recording sends; tests inject requests.
    #[derive(Default)]
    struct ScriptedChannel {
        sent: Mutex<Vec<String>>,
        handlers: Mutex<Vec<RawHandler>>,
    }

    impl ScriptedChannel {
        fn deliver(&self, raw: &str) {
            let handlers = self.handlers.lock().clone();
            for handler in handlers {
                handler(raw);
            }
        }
    }

    impl Channel for ScriptedChannel {
        fn try_send(&self, raw: &str) -> Result<()> {
            self.sent.lock().push(raw.to_string());
            Ok(())
        }

        fn subscribe(&self, handler: RawHandler) -> Subscription {
            self.handlers.lock().push(handler);
            Subscription::inert()
        }

        fn is_usable(&self) -> bool {
            true
        }

        fn observe_termination(&self, _hook: TerminationHook) -> Option<Subscription> {
            None
        }
    }

    const R1: &str = r#"http-relay:request:{"id":"r1","method":"GET","url":"https://x/","headerPairs":[],"credentials":"omit","body":null}"#;

    fn setup() -> (Arc<ScriptedChannel>, Resolver) {
        let channel = Arc::new(ScriptedChannel::default());
        let transport = Transport::builder()
            .channel(Arc::clone(&channel) as Arc<dyn Channel>)
            .build()
            .expect("build transport");
        (channel, Resolver::new(transport))
    }

    #[test]
    fn test_respond_with_sends_response_envelope() {
        let (channel, resolver) = setup();
        assert!(resolver.listen(|_req: HttpRequest, _id: RequestId, controller: RequestController| {
            controller.respond_with(HttpResponse::ok("hello"));
        }));

        channel.deliver(R1);

        assert_eq!(
            *channel.sent.lock(),
            vec![
                r#"http-relay:response:r1:{"status":200,"statusText":"OK","headerPairs":[],"body":"hello"}"#
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_responder_sees_revived_request() {
        let (channel, resolver) = setup();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        resolver.listen(move |req: HttpRequest, id: RequestId, controller: RequestController| {
            assert_eq!(controller.request_id(), &id);
            *sink.lock() = Some((id, req));
            controller.pass_through();
        });

        channel.deliver(R1);

        let (id, request) = seen.lock().take().expect("responder called");
        assert_eq!(id.as_str(), "r1");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.url(), &Url::parse("https://x/").expect("url"));
        assert_eq!(request.credentials(), CredentialsMode::Omit);
        assert_eq!(request.body(), None);
    }

    #[test]
    fn test_content_encoding_is_stripped() {
        let (channel, resolver) = setup();
        resolver.listen(|_req: HttpRequest, _id: RequestId, controller: RequestController| {
            controller.respond_with(
                HttpResponse::ok("plain")
                    .with_header("Content-Encoding", "gzip")
                    .with_header("content-type", "text/plain"),
            );
        });

        channel.deliver(R1);

        let sent = channel.sent.lock();
        assert!(!sent[0].to_ascii_lowercase().contains("content-encoding"));
        assert!(sent[0].contains(r#"["content-type","text/plain"]"#));
    }

    #[test]
    fn test_pass_through_and_error_with() {
        let (channel, resolver) = setup();
        resolver.listen(|req: HttpRequest, _id: RequestId, controller: RequestController| {
            if req.url().path() == "/fail" {
                controller.error_with(NetworkError::new("offline"));
            } else {
                controller.pass_through();
            }
        });

        channel.deliver(R1);
        channel.deliver(&R1.replace("r1", "r2").replace("https://x/", "https://x/fail"));

        assert_eq!(
            *channel.sent.lock(),
            vec![
                r#"http-relay:response:r1:{"passthrough":true}"#.to_string(),
                r#"http-relay:response:r2:{"error":{"message":"offline"}}"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_non_request_messages_ignored() {
        let (channel, resolver) = setup();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        resolver.listen(move |_req: HttpRequest, _id: RequestId, _c: RequestController| {
            *counter.lock() += 1;
        });

        channel.deliver(r#"http-relay:response:r1:{"passthrough":true}"#);
        channel.deliver("http-relay:request:{broken");
        channel.deliver("other:request:{}");

        assert_eq!(*calls.lock(), 0);
        assert!(channel.sent.lock().is_empty());
    }

    #[test]
    fn test_unroutable_request_id_dropped() {
        let (channel, resolver) = setup();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        resolver.listen(move |_req: HttpRequest, _id: RequestId, controller: RequestController| {
            *counter.lock() += 1;
            controller.respond_with(HttpResponse::ok("for-a:b"));
        });

        channel.deliver(&R1.replace("\"id\":\"r1\"", "\"id\":\"a:b\""));
        channel.deliver(&R1.replace("\"id\":\"r1\"", "\"id\":\"\""));

        assert_eq!(*calls.lock(), 0);
        assert!(channel.sent.lock().is_empty());
    }

    #[test]
    fn test_response_notice_after_send() {
        let (channel, resolver) = setup();
        let notices = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notices);
        let _sub = resolver.on_response(move |notice: &ResponseNotice| {
            sink.lock().push((notice.request_id.clone(), notice.response.body.clone()));
        });
        resolver.listen(|_req: HttpRequest, _id: RequestId, controller: RequestController| {
            controller.respond_with(HttpResponse::ok("hello"));
        });

        channel.deliver(R1);

        assert_eq!(
            *notices.lock(),
            vec![(RequestId::new("r1"), "hello".to_string())]
        );
    }

    #[test]
    fn test_pass_through_does_not_notify() {
        let (channel, resolver) = setup();
        let notified = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&notified);
        let _sub = resolver.on_response(move |_| *counter.lock() += 1);
        resolver.listen(|_req: HttpRequest, _id: RequestId, controller: RequestController| {
            controller.pass_through();
        });

        channel.deliver(R1);
        assert_eq!(*notified.lock(), 0);
    }

    #[test]
    fn test_unavailable_transport_does_not_listen() {
        let transport = Transport::builder()
            .channel(Arc::new(ParentProcessChannel::detached()))
            .build()
            .expect("build transport");
        let resolver = Resolver::new(transport);

        assert!(!resolver.listen(|_: HttpRequest, _: RequestId, c: RequestController| c.pass_through()));
        assert_eq!(resolver.transport().handler_count(), 0);
    }

    #[test]
    fn test_dispose_stops_responding() {
        let (channel, resolver) = setup();
        resolver.listen(|_req: HttpRequest, _id: RequestId, controller: RequestController| {
            controller.respond_with(HttpResponse::ok("hello"));
        });

        resolver.dispose();
        channel.deliver(R1);

        assert!(channel.sent.lock().is_empty());
        assert!(!resolver.listen(|_: HttpRequest, _: RequestId, c: RequestController| c.pass_through()));
    }

    #[test]
    fn test_deferred_decision_after_dispose_is_dropped() {
        let (channel, resolver) = setup();
        let parked = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&parked);
        resolver.listen(move |_req: HttpRequest, _id: RequestId, controller: RequestController| {
            *slot.lock() = Some(controller);
        });

        channel.deliver(R1);
        resolver.dispose();

        let controller = parked.lock().take().expect("controller parked");
        controller.respond_with(HttpResponse::ok("late"));
        assert!(channel.sent.lock().is_empty());
    }
}
