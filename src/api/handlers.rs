//! HTTP request handlers for the chat relay API.
//!
//! This module contains the streaming chat endpoint, the model listing,
//! health checks, and metrics.

use crate::api::models::*;
use crate::api::streaming::sse_response;
use crate::core::logging::get_request_id;
use crate::core::middleware::ProviderName;
use crate::core::{AppError, Result};
use crate::services::{ChatService, ModelRegistry};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: ChatService,
}

impl AppState {
    pub fn new(chat_service: ChatService) -> Self {
        Self { chat_service }
    }
}

/// Stream a chat completion as server-sent events.
///
/// Malformed requests are rejected with 400 before the stream starts. Once
/// the stream has started, every failure is delivered as a final `error`
/// event and the HTTP status stays 200.
#[utoipa::path(
    post,
    path = "/api/chat/stream",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Event stream of `message` events, optionally ending with one `error` event", content_type = "text/event-stream", body = String),
        (status = 400, description = "Malformed request", body = ApiErrorResponse)
    )
)]
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let request_id = get_request_id();
    let provider = request.provider;

    tracing::debug!(
        request_id = %request_id,
        provider = %provider,
        model_version = %request.model_version,
        "Chat stream requested"
    );

    let events = state.chat_service.dispatch(request)?;

    let mut response = sse_response(events, provider, request_id);
    response
        .extensions_mut()
        .insert(ProviderName(provider.to_string()));
    Ok(response)
}

/// List every routable (provider, model_version) pair.
#[utoipa::path(
    get,
    path = "/api/models",
    tag = "models",
    responses(
        (status = 200, description = "Routable models", body = ModelList)
    )
)]
pub async fn list_models() -> Json<ModelList> {
    tracing::debug!(request_id = %get_request_id(), "Listing available models");

    Json(ModelList {
        object: "list".to_string(),
        data: ModelRegistry::entries(),
    })
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Prometheus text exposition of the process-wide registry.
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}
