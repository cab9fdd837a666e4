//! Chat dispatch: turns one chat request into a stream of outbound events.
//!
//! Every failure after validation is reported in-band as a single terminal
//! [`OutboundEvent::Error`]; the caller always receives a stream it can
//! forward as-is.

use super::model_registry::ModelRegistry;
use crate::api::models::{ChatRequest, Provider};
use crate::core::metrics::get_metrics;
use crate::core::RelayError;
use crate::upstream::{UpstreamClient, UpstreamRequest, UpstreamSession};
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// One event destined for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// A non-empty text fragment, verbatim from the provider.
    Message(String),
    /// Terminal failure description. Always the last event of a stream.
    Error(String),
}

impl OutboundEvent {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::Message(_) => "message",
            OutboundEvent::Error(_) => "error",
        }
    }

    pub fn data(&self) -> &str {
        match self {
            OutboundEvent::Message(text) | OutboundEvent::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OutboundEvent::Error(_))
    }
}

pub type ChatEventStream = BoxStream<'static, OutboundEvent>;

/// Routes validated chat requests to the upstream client of their provider.
///
/// Holds no per-request state; concurrent dispatches share nothing but the
/// registered clients.
#[derive(Clone, Default)]
pub struct ChatService {
    clients: HashMap<Provider, Arc<dyn UpstreamClient>>,
}

impl ChatService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the client for its provider, replacing any previous one.
    pub fn with_client(mut self, client: Arc<dyn UpstreamClient>) -> Self {
        self.clients.insert(client.provider(), client);
        self
    }

    pub fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.clients.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }

    /// Dispatch one chat request.
    ///
    /// Returns `Err` only for structurally invalid requests. Unknown model
    /// versions, connection failures and mid-stream failures all arrive as a
    /// final error event on the returned stream. No upstream call is made
    /// when the model version does not resolve.
    pub fn dispatch(&self, request: ChatRequest) -> Result<ChatEventStream, RelayError> {
        request.validate()?;

        let provider = request.provider;
        if !request.stream {
            tracing::debug!(provider = %provider, "stream=false requested; responding with an event stream anyway");
        }

        let target = match ModelRegistry::resolve(provider, request.model_version) {
            Ok(target) => target,
            Err(e) => {
                tracing::info!(provider = %provider, model_version = %request.model_version, "Rejecting unknown model version");
                return Ok(error_stream(e));
            }
        };

        let Some(client) = self.clients.get(&provider) else {
            return Ok(error_stream(RelayError::upstream_connection(
                provider,
                "no upstream client registered",
            )));
        };

        tracing::info!(
            provider = %provider,
            model_version = %request.model_version,
            model = target.model,
            messages = request.messages.len(),
            "Dispatching chat request"
        );

        let session = client.open_stream(UpstreamRequest::new(&request, &target));
        Ok(relay_session(session, target.model).boxed())
    }
}

fn error_stream(error: RelayError) -> ChatEventStream {
    record_error(&error);
    futures::stream::once(async move { OutboundEvent::Error(error.to_string()) }).boxed()
}

fn record_error(error: &RelayError) {
    let provider = match error {
        RelayError::ModelNotFound { provider, .. }
        | RelayError::UpstreamConnection { provider, .. }
        | RelayError::UpstreamStream { provider, .. } => provider.as_str(),
        _ => "unknown",
    };
    get_metrics()
        .relay_errors
        .with_label_values(&[provider, error.category().as_str()])
        .inc();
}

/// Forward session fragments as message events until the session ends or fails.
fn relay_session(
    mut session: UpstreamSession,
    model: &'static str,
) -> impl futures::Stream<Item = OutboundEvent> + Send + 'static {
    async_stream::stream! {
        let provider = session.provider();
        let started = Instant::now();
        let mut first_fragment = true;
        let mut fragments = 0usize;

        while let Some(item) = session.next().await {
            match item {
                Ok(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    if first_fragment {
                        first_fragment = false;
                        let ttft = started.elapsed().as_secs_f64();
                        get_metrics()
                            .ttft
                            .with_label_values(&[provider.as_str(), model])
                            .observe(ttft);
                        tracing::debug!(provider = %provider, model, ttft_secs = ttft, "First fragment received");
                    }
                    fragments += 1;
                    yield OutboundEvent::Message(text);
                }
                Err(e) => {
                    session.close();
                    record_error(&e);
                    tracing::warn!(provider = %provider, model, error = %e, fragments, "Chat stream failed");
                    yield OutboundEvent::Error(e.to_string());
                    return;
                }
            }
        }

        session.close();
        tracing::info!(
            provider = %provider,
            model,
            fragments,
            duration_ms = started.elapsed().as_millis() as u64,
            "Chat stream completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Message, ModelVersion};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubClient {
        provider: Option<Provider>,
        script: Vec<Result<String, RelayError>>,
        opened: AtomicUsize,
        released: Arc<AtomicUsize>,
        last_model: Mutex<Option<String>>,
    }

    impl StubClient {
        fn new(provider: Provider, script: Vec<Result<String, RelayError>>) -> Arc<Self> {
            Arc::new(Self {
                provider: Some(provider),
                script,
                ..Default::default()
            })
        }
    }

    impl UpstreamClient for StubClient {
        fn provider(&self) -> Provider {
            self.provider.unwrap_or(Provider::Gemini)
        }

        fn open_stream(&self, request: UpstreamRequest) -> UpstreamSession {
            self.opened.fetch_add(1, Ordering::SeqCst);
            *self.last_model.lock().unwrap() = Some(request.model);
            let released = self.released.clone();
            UpstreamSession::new(self.provider(), futures::stream::iter(self.script.clone()))
                .on_release(move || {
                    released.fetch_add(1, Ordering::SeqCst);
                })
        }
    }

    fn request(provider: Provider, version: ModelVersion) -> ChatRequest {
        ChatRequest::new(vec![Message::new("user", "Hi")], provider, version)
    }

    async fn collect(stream: ChatEventStream) -> Vec<OutboundEvent> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_dispatch_relays_fragments_in_order() {
        let stub = StubClient::new(Provider::Gemini, vec![Ok("Hel".into()), Ok("lo!".into())]);
        let service = ChatService::new().with_client(stub.clone());

        let events = collect(service.dispatch(request(Provider::Gemini, ModelVersion::Flash)).unwrap()).await;

        assert_eq!(
            events,
            vec![
                OutboundEvent::Message("Hel".into()),
                OutboundEvent::Message("lo!".into())
            ]
        );
        assert_eq!(stub.opened.load(Ordering::SeqCst), 1);
        assert_eq!(stub.released.load(Ordering::SeqCst), 1);
        assert_eq!(
            stub.last_model.lock().unwrap().as_deref(),
            Some("gemini-2.0-flash")
        );
    }

    #[tokio::test]
    async fn test_dispatch_skips_empty_fragments() {
        let stub = StubClient::new(
            Provider::Fireworks,
            vec![Ok("".into()), Ok("a".into()), Ok("".into()), Ok("b".into())],
        );
        let service = ChatService::new().with_client(stub);

        let events = collect(service.dispatch(request(Provider::Fireworks, ModelVersion::R1)).unwrap()).await;
        assert_eq!(
            events,
            vec![OutboundEvent::Message("a".into()), OutboundEvent::Message("b".into())]
        );
    }

    #[tokio::test]
    async fn test_unknown_version_yields_single_error_without_upstream_call() {
        let stub = StubClient::new(Provider::Gemini, vec![Ok("never".into())]);
        let service = ChatService::new().with_client(stub.clone());

        let events = collect(service.dispatch(request(Provider::Gemini, ModelVersion::R1)).unwrap()).await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_error());
        assert!(events[0].data().starts_with("Model not found"));
        assert_eq!(stub.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_ends_with_one_error() {
        let stub = StubClient::new(
            Provider::Fireworks,
            vec![
                Ok("partial".into()),
                Err(RelayError::upstream_stream(Provider::Fireworks, "connection reset")),
                Ok("ignored".into()),
            ],
        );
        let service = ChatService::new().with_client(stub.clone());

        let events = collect(service.dispatch(request(Provider::Fireworks, ModelVersion::V3)).unwrap()).await;

        assert_eq!(
            events,
            vec![
                OutboundEvent::Message("partial".into()),
                OutboundEvent::Error("fireworks stream failed: connection reset".into()),
            ]
        );
        assert_eq!(stub.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_failure_is_single_error() {
        let stub = StubClient::new(
            Provider::Gemini,
            vec![Err(RelayError::upstream_connection(Provider::Gemini, "HTTP 403: denied"))],
        );
        let service = ChatService::new().with_client(stub);

        let events = collect(service.dispatch(request(Provider::Gemini, ModelVersion::Thinking)).unwrap()).await;
        assert_eq!(
            events,
            vec![OutboundEvent::Error("gemini connection failed: HTTP 403: denied".into())]
        );
    }

    #[tokio::test]
    async fn test_missing_client_is_reported_in_band() {
        let service = ChatService::new();
        let events = collect(service.dispatch(request(Provider::Gemini, ModelVersion::Flash)).unwrap()).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_error());
    }

    #[test]
    fn test_invalid_request_is_rejected_before_streaming() {
        let stub = StubClient::new(Provider::Gemini, vec![]);
        let service = ChatService::new().with_client(stub.clone());
        let result = service.dispatch(ChatRequest::new(vec![], Provider::Gemini, ModelVersion::Flash));

        assert!(matches!(result, Err(RelayError::InvalidRequest(_))));
        assert_eq!(stub.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_session_once() {
        let stub = StubClient::new(Provider::Gemini, vec![Ok("a".into()), Ok("b".into())]);
        let service = ChatService::new().with_client(stub.clone());

        let mut stream = service.dispatch(request(Provider::Gemini, ModelVersion::Flash)).unwrap();
        assert_eq!(stream.next().await, Some(OutboundEvent::Message("a".into())));
        drop(stream);

        assert_eq!(stub.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_outbound_event_accessors() {
        let message = OutboundEvent::Message("x".into());
        assert_eq!(message.kind(), "message");
        assert_eq!(message.data(), "x");
        assert_eq!(OutboundEvent::Error("e".into()).kind(), "error");
    }

    #[test]
    fn test_providers_lists_registered_clients() {
        let service = ChatService::new()
            .with_client(StubClient::new(Provider::Gemini, vec![]))
            .with_client(StubClient::new(Provider::Fireworks, vec![]));
        assert_eq!(service.providers(), vec![Provider::Fireworks, Provider::Gemini]);
    }
}
