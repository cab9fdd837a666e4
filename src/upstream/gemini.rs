//! Google Gemini streaming client (`streamGenerateContent` with `alt=sse`).

use super::{
    error_value_message, sse_fragments, StreamEnd, UpstreamClient, UpstreamRequest, UpstreamSession,
};
use crate::api::models::{Message, Provider};
use crate::core::{ProviderConfig, RelayError};
use serde_json::{json, Value};

pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.api_base, model
        )
    }
}

/// Build the Gemini request body.
///
/// `assistant` becomes `model`; `system` messages go to `systemInstruction`
/// in their original order. Message order and text are otherwise unchanged.
pub fn build_request_body(request: &UpstreamRequest) -> Value {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for Message { role, content } in &request.messages {
        match role.as_str() {
            "system" => system_parts.push(json!({ "text": content })),
            "assistant" => contents.push(json!({
                "role": "model",
                "parts": [{ "text": content }]
            })),
            other => contents.push(json!({
                "role": other,
                "parts": [{ "text": content }]
            })),
        }
    }

    let mut generation_config = json!({ "temperature": request.temperature });
    if let Some(max_tokens) = request.max_tokens {
        generation_config["maxOutputTokens"] = json!(max_tokens);
    }

    let mut body = json!({
        "contents": contents,
        "generationConfig": generation_config,
    });
    if !system_parts.is_empty() {
        body["systemInstruction"] = json!({ "parts": system_parts });
    }
    body
}

/// Extract the answer text from one streamed `GenerateContentResponse`.
///
/// Parts flagged `thought: true` carry model reasoning and are not part of
/// the answer.
pub fn extract_text(data: &str) -> Result<Option<String>, String> {
    let chunk: Value =
        serde_json::from_str(data).map_err(|e| format!("invalid stream payload: {}", e))?;

    if let Some(error) = chunk.get("error") {
        return Err(error_value_message(error));
    }

    let parts = chunk
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let Some(parts) = parts else {
        return Ok(None);
    };

    let text: String = parts
        .iter()
        .filter(|part| !part.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    Ok(Some(text).filter(|t| !t.is_empty()))
}

impl UpstreamClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn open_stream(&self, request: UpstreamRequest) -> UpstreamSession {
        let Some(api_key) = self.api_key.clone() else {
            return UpstreamSession::new(
                Provider::Gemini,
                futures::stream::once(async {
                    Err(RelayError::upstream_connection(
                        Provider::Gemini,
                        "GEMINI_API_KEY is not configured",
                    ))
                }),
            );
        };

        let builder = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", api_key)
            .json(&build_request_body(&request));

        UpstreamSession::new(
            Provider::Gemini,
            sse_fragments(
                Provider::Gemini,
                request.model,
                builder,
                StreamEnd::BodyEnd,
                extract_text,
            ),
        )
    }
}
