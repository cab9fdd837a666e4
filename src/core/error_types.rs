//! Shared constants for structured API errors and relay failure categories.

use std::fmt;

pub const ERROR_TYPE_API: &str = "api_error";
pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";

pub const ERROR_CATEGORY_INVALID_REQUEST: &str = "invalid_request";
pub const ERROR_CATEGORY_MODEL_NOT_FOUND: &str = "model_not_found";
pub const ERROR_CATEGORY_CONNECT_ERROR: &str = "connect_error";
pub const ERROR_CATEGORY_STREAM_ERROR: &str = "stream_error";
pub const ERROR_CATEGORY_CLIENT_DISCONNECT: &str = "client_disconnect";

/// Label used on metrics and logs for each failure in the relay taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategoryCode {
    InvalidRequest,
    ModelNotFound,
    ConnectError,
    StreamError,
    ClientDisconnect,
}

impl ErrorCategoryCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => ERROR_CATEGORY_INVALID_REQUEST,
            Self::ModelNotFound => ERROR_CATEGORY_MODEL_NOT_FOUND,
            Self::ConnectError => ERROR_CATEGORY_CONNECT_ERROR,
            Self::StreamError => ERROR_CATEGORY_STREAM_ERROR,
            Self::ClientDisconnect => ERROR_CATEGORY_CLIENT_DISCONNECT,
        }
    }
}

impl fmt::Display for ErrorCategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
