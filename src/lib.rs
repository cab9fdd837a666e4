//! LLM Chat Relay - streams chat completions from Gemini or Fireworks as SSE
//!
//! The relay accepts one chat request, resolves its `(provider, model_version)`
//! pair to a concrete upstream model, opens a single streaming completion and
//! republishes every non-empty text fragment as a server-sent `message` event.
//! A failure at any point after validation ends the stream with exactly one
//! `error` event.
//!
//! # Architecture
//!
//! - [`core`]: Configuration, errors, metrics, middleware, request logging context
//! - [`api`]: HTTP handlers, request/response models, SSE transport and router
//! - [`services`]: Model registry and chat dispatch
//! - [`upstream`]: Provider streaming clients and upstream SSE parsing
//!
//! # Configuration
//!
//! Optional environment variables:
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8000)
//! - `GEMINI_API_KEY` / `GEMINI_API_BASE`: primary provider credentials and endpoint
//! - `FIREWORKS_API_KEY` / `FIREWORKS_API_BASE`: secondary provider credentials and endpoint
//! - `VERIFY_SSL`: Verify SSL certificates for upstream (default: true)
//! - `REQUEST_TIMEOUT_SECS`: Total upstream request timeout (default: none)
//! - `CONNECT_TIMEOUT_SECS`: Upstream connect timeout (default: 10)

pub mod api;
pub mod core;
pub mod services;
pub mod upstream;

// Re-export commonly used types for convenience
pub use api::{app_router, ApiDoc, AppState, ChatRequest, Message, ModelVersion, Provider};
pub use core::{AppConfig, AppError, RelayError, Result};
pub use services::{ChatService, ModelRegistry, OutboundEvent};
pub use upstream::{create_http_client, FireworksClient, GeminiClient, UpstreamClient, UpstreamSession};
