//! API request and response models.
//!
//! This module defines the inbound chat request and the small JSON bodies
//! returned by the non-streaming endpoints.

use crate::core::RelayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Upstream provider family.
///
/// `gemini` is the primary provider and `fireworks` the secondary one; the
/// generic tags are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(alias = "primary")]
    Gemini,
    #[serde(alias = "secondary")]
    Fireworks,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Gemini, Provider::Fireworks];

    pub const fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Fireworks => "fireworks",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model version tag. Each tag belongs to exactly one provider namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModelVersion {
    Flash,
    Thinking,
    R1,
    V3,
}

impl ModelVersion {
    pub const fn as_str(self) -> &'static str {
        match self {
            ModelVersion::Flash => "flash",
            ModelVersion::Thinking => "thinking",
            ModelVersion::R1 => "r1",
            ModelVersion::V3 => "v3",
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"role": "user", "content": "Hello!"}))]
pub struct Message {
    /// Caller-supplied role, e.g. "system", "user" or "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Streaming chat request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "messages": [{"role": "user", "content": "Hello!"}],
    "model": "gemini",
    "model_version": "flash",
    "stream": true,
    "temperature": 0.7,
    "max_tokens": 1000
}))]
pub struct ChatRequest {
    /// Conversation messages, in conversation order
    pub messages: Vec<Message>,

    /// Provider family to route to
    #[serde(rename = "model", alias = "provider")]
    pub provider: Provider,

    /// Version tag within the provider's namespace
    pub model_version: ModelVersion,

    /// Accepted for compatibility; responses are always streamed
    #[serde(default = "default_stream")]
    pub stream: bool,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens to generate; `null` leaves the provider default
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
}

fn default_stream() -> bool {
    true
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> Option<u32> {
    Some(1000)
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>, provider: Provider, model_version: ModelVersion) -> Self {
        Self {
            messages,
            provider,
            model_version,
            stream: default_stream(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Structural validation. Message content is not inspected.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.messages.is_empty() {
            return Err(RelayError::InvalidRequest(
                "messages must contain at least one message".to_string(),
            ));
        }
        if let Some(index) = self.messages.iter().position(|m| m.role.trim().is_empty()) {
            return Err(RelayError::InvalidRequest(format!(
                "messages[{}].role must not be empty",
                index
            )));
        }
        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(RelayError::InvalidRequest(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(RelayError::InvalidRequest(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// One routable (provider, model_version) pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"provider": "gemini", "model_version": "flash", "model": "gemini-2.0-flash"}))]
pub struct ModelEntry {
    pub provider: Provider,
    pub model_version: ModelVersion,
    /// Concrete upstream model identifier
    pub model: String,
}

/// List of routable models.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelEntry>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"status": "ok"}))]
pub struct HealthResponse {
    pub status: String,
}

/// Error response for requests rejected before streaming.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": {
        "message": "messages must contain at least one message",
        "type": "invalid_request_error",
        "code": 400
    }
}))]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Error detail in API error responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: u16,
}
