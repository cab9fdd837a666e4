//! Upstream streaming clients.
//!
//! Each provider family implements [`UpstreamClient`]: given a normalized
//! message list, a concrete model identifier and sampling parameters it opens
//! one streaming completion and returns an [`UpstreamSession`] of non-empty
//! text fragments. The session is lazy; no network I/O happens until it is
//! first polled.

pub mod fireworks;
pub mod gemini;
pub mod session;
pub mod sse;

use crate::api::models::{ChatRequest, Message, Provider};
use crate::core::{AppConfig, RelayError};
use crate::services::model_registry::ModelTarget;
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use sse::SseParser;
use std::error::Error;
use std::time::Duration;

pub use fireworks::FireworksClient;
pub use gemini::GeminiClient;
pub use session::{FragmentStream, UpstreamSession};

/// Normalized input for one upstream completion.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

impl UpstreamRequest {
    pub fn new(request: &ChatRequest, target: &ModelTarget) -> Self {
        Self {
            model: target.model.to_string(),
            messages: request.messages.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

/// Streaming completion capability of one provider family.
pub trait UpstreamClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Open a fresh upstream session. Sessions are not restartable.
    fn open_stream(&self, request: UpstreamRequest) -> UpstreamSession;
}

/// Create the shared upstream HTTP client with connection pooling.
pub fn create_http_client(config: &AppConfig) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .danger_accept_invalid_certs(!config.verify_ssl)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(32)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60));

    if let Some(timeout) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(timeout));
    }

    builder.build()
}

/// How a provider signals that a completion finished normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamEnd {
    /// The response body simply ends (Gemini).
    BodyEnd,
    /// A `data: [DONE]` sentinel precedes the end of the body
    /// (OpenAI-compatible APIs). A body that ends without it was cut short.
    DoneMarker,
}

/// Send `request` and turn the SSE response body into text fragments.
///
/// `extract` maps one `data:` payload to the text it carries (`Ok(None)` for
/// control-only payloads) or to an in-band upstream error message. Empty text
/// is never yielded, `[DONE]` ends the sequence, and nothing is yielded after
/// an error.
pub(crate) fn sse_fragments<F>(
    provider: Provider,
    model: String,
    request: reqwest::RequestBuilder,
    end: StreamEnd,
    extract: F,
) -> impl Stream<Item = Result<String, RelayError>> + Send + 'static
where
    F: Fn(&str) -> Result<Option<String>, String> + Send + 'static,
{
    async_stream::stream! {
        tracing::debug!(provider = %provider, model = %model, "Opening upstream stream");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    provider = %provider,
                    model = %model,
                    error = %e,
                    error_source = ?e.source(),
                    is_timeout = e.is_timeout(),
                    is_connect = e.is_connect(),
                    "HTTP request failed to provider"
                );
                yield Err(RelayError::upstream_connection(provider, describe_request_error(&e)));
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status.as_u16(), upstream_error_message(&body));
            tracing::warn!(
                provider = %provider,
                model = %model,
                status = status.as_u16(),
                error = %message,
                "Provider rejected streaming request"
            );
            yield Err(RelayError::upstream_connection(provider, message));
            return;
        }

        let mut body = response.bytes_stream();
        let mut parser = SseParser::new();
        let mut finished = false;

        while !finished {
            let events = match body.next().await {
                Some(Ok(chunk)) => parser.parse(&chunk),
                Some(Err(e)) => {
                    tracing::warn!(provider = %provider, model = %model, error = %e, "Upstream stream broke");
                    yield Err(RelayError::upstream_stream(provider, describe_request_error(&e)));
                    return;
                }
                None => {
                    finished = true;
                    parser.finish().into_iter().collect()
                }
            };

            for event in events {
                let Some(data) = event.data else { continue };
                if data.trim() == "[DONE]" {
                    return;
                }
                match extract(&data) {
                    Ok(Some(text)) if !text.is_empty() => yield Ok(text),
                    Ok(_) => {}
                    Err(message) => {
                        tracing::warn!(provider = %provider, model = %model, error = %message, "Provider reported error mid-stream");
                        yield Err(RelayError::upstream_stream(provider, message));
                        return;
                    }
                }
            }
        }

        if end == StreamEnd::DoneMarker {
            tracing::warn!(provider = %provider, model = %model, "Upstream body ended without [DONE]");
            yield Err(RelayError::upstream_stream(provider, "stream ended before completion"));
            return;
        }

        tracing::debug!(provider = %provider, model = %model, "Upstream stream finished");
    }
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        return "request timed out".to_string();
    }
    match e.source() {
        Some(source) => format!("{}: {}", e, source),
        None => e.to_string(),
    }
}

/// Best-effort message from a provider error body.
///
/// Handles `{"error": {"message": ..}}`, `{"error": ".."}`, a one-element
/// array wrapping either form, and falls back to the raw (truncated) body.
pub(crate) fn upstream_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let value = match parsed {
        Some(Value::Array(mut items)) if !items.is_empty() => Some(items.swap_remove(0)),
        other => other,
    };

    if let Some(error) = value.as_ref().and_then(|v| v.get("error")) {
        return error_value_message(error);
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.chars().take(500).collect()
    }
}

/// Message text of an `error` member in a provider payload.
pub(crate) fn error_value_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}
