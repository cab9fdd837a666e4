//! Fireworks AI streaming client (OpenAI-compatible chat completions).

use super::{
    error_value_message, sse_fragments, StreamEnd, UpstreamClient, UpstreamRequest, UpstreamSession,
};
use crate::api::models::Provider;
use crate::core::{ProviderConfig, RelayError};
use serde_json::{json, Value};

pub struct FireworksClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl FireworksClient {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

pub fn build_request_body(request: &UpstreamRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": request.messages,
        "temperature": request.temperature,
        "stream": true,
    });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

/// Extract `choices[0].delta.content` from one streamed chunk.
pub fn extract_text(data: &str) -> Result<Option<String>, String> {
    let chunk: Value =
        serde_json::from_str(data).map_err(|e| format!("invalid stream payload: {}", e))?;

    if let Some(error) = chunk.get("error") {
        return Err(error_value_message(error));
    }

    Ok(chunk
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
        .filter(|text| !text.is_empty())
        .map(str::to_string))
}

impl UpstreamClient for FireworksClient {
    fn provider(&self) -> Provider {
        Provider::Fireworks
    }

    fn open_stream(&self, request: UpstreamRequest) -> UpstreamSession {
        let Some(api_key) = self.api_key.as_deref() else {
            return UpstreamSession::new(
                Provider::Fireworks,
                futures::stream::once(async {
                    Err(RelayError::upstream_connection(
                        Provider::Fireworks,
                        "FIREWORKS_API_KEY is not configured",
                    ))
                }),
            );
        };

        let builder = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .header("Accept", "text/event-stream")
            .json(&build_request_body(&request));

        UpstreamSession::new(
            Provider::Fireworks,
            sse_fragments(
                Provider::Fireworks,
                request.model,
                builder,
                StreamEnd::DoneMarker,
                extract_text,
            ),
        )
    }
}
