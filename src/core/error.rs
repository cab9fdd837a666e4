//! Error types and handling for the chat relay.
//!
//! [`RelayError`] is the failure taxonomy of the dispatch pipeline. Every
//! variant renders as a human-readable message, which is what the relay sends
//! in-band as an `error` event once streaming has started.
//!
//! [`AppError`] is the HTTP boundary type for faults that happen before a
//! stream is opened; it implements axum's [`IntoResponse`].

use crate::api::models::Provider;
use crate::core::error_types::{ErrorCategoryCode, ERROR_TYPE_API, ERROR_TYPE_INVALID_REQUEST};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised while validating, resolving or relaying a chat request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    /// Malformed or out-of-range input, rejected before any upstream call
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The (provider, model_version) pair has no registry entry
    #[error("Model not found: '{model_version}' is not a {provider} model version")]
    ModelNotFound {
        provider: Provider,
        model_version: String,
    },

    /// The upstream session could not be established (auth, network, quota)
    #[error("{provider} connection failed: {message}")]
    UpstreamConnection { provider: Provider, message: String },

    /// The upstream session terminated abnormally after it was established
    #[error("{provider} stream failed: {message}")]
    UpstreamStream { provider: Provider, message: String },

    /// The caller's connection went away
    #[error("Client closed connection")]
    Transport,
}

impl RelayError {
    pub fn upstream_connection(provider: Provider, message: impl Into<String>) -> Self {
        Self::UpstreamConnection {
            provider,
            message: message.into(),
        }
    }

    pub fn upstream_stream(provider: Provider, message: impl Into<String>) -> Self {
        Self::UpstreamStream {
            provider,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategoryCode {
        match self {
            Self::InvalidRequest(_) => ErrorCategoryCode::InvalidRequest,
            Self::ModelNotFound { .. } => ErrorCategoryCode::ModelNotFound,
            Self::UpstreamConnection { .. } => ErrorCategoryCode::ConnectError,
            Self::UpstreamStream { .. } => ErrorCategoryCode::StreamError,
            Self::Transport => ErrorCategoryCode::ClientDisconnect,
        }
    }
}

/// Main error type for the HTTP layer.
#[derive(Error, Debug)]
pub enum AppError {
    /// Client provided invalid data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::InvalidRequest(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ERROR_TYPE_INVALID_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, ERROR_TYPE_API, msg),
        };

        tracing::warn!(
            status = status.as_u16(),
            error = %error_message,
            "Request rejected before streaming"
        );

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
