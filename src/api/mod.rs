//! API layer for the chat relay server.
//!
//! This module contains the HTTP handlers, request/response models, the
//! server-sent events transport and the router that ties them together.

pub mod disconnect;
pub mod handlers;
pub mod models;
pub mod streaming;

use crate::core::{request_id_middleware, MetricsMiddleware};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Re-export commonly used types
pub use disconnect::DisconnectStream;
pub use handlers::{chat_stream, health, list_models, metrics_handler, AppState};
pub use models::{ChatRequest, Message, ModelList, ModelVersion, Provider};
pub use streaming::{encode_event, format_sse_event, sse_response};

/// OpenAPI documentation for the relay API
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::chat_stream,
        crate::api::handlers::list_models,
        crate::api::handlers::health,
    ),
    components(
        schemas(
            crate::api::models::ChatRequest,
            crate::api::models::Message,
            crate::api::models::Provider,
            crate::api::models::ModelVersion,
            crate::api::models::ModelEntry,
            crate::api::models::ModelList,
            crate::api::models::HealthResponse,
            crate::api::models::ApiErrorResponse,
            crate::api::models::ApiErrorDetail,
        )
    ),
    tags(
        (name = "chat", description = "Streaming chat relay"),
        (name = "models", description = "Routable model listing"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "LLM Chat Relay API",
        version = "0.1.0",
        description = "Routes chat requests to Gemini or Fireworks and streams the answer back as server-sent events.",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the application router with all endpoints and middleware.
pub fn app_router(state: Arc<AppState>) -> Router {
    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    let api_routes = Router::new()
        .route("/api/chat/stream", post(chat_stream))
        .route("/api/models", get(list_models))
        .layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics))
        .with_state(state);

    Router::new()
        .merge(swagger_ui)
        .merge(api_routes)
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
