//! Request-scoped logging context.
//!
//! The request id is assigned by [`request_id_middleware`] and carried in a
//! task-local so handler and service logs can include it without threading it
//! through every call.
//!
//! [`request_id_middleware`]: crate::core::middleware::request_id_middleware

tokio::task_local! {
    /// Task-local storage for the current request ID.
    pub static REQUEST_ID: String;
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Longest caller-supplied request id that is reused as-is.
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Use the caller's request id when it is printable ASCII of sane length,
/// otherwise generate a fresh one.
pub fn request_id_or_generate(candidate: Option<&str>) -> String {
    candidate
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map(str::to_string)
        .unwrap_or_else(generate_request_id)
}
