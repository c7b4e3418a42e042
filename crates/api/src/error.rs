use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use timetravel_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for record operation failures and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A record operation error from `timetravel_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a record operation error into an HTTP status, error code, and message.
///
/// Storage failures are logged with their cause and reported with a
/// sanitized message.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::InvalidId(_) => (StatusCode::BAD_REQUEST, "INVALID_ID", err.to_string()),
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        CoreError::VersionNotFound { .. } => (
            StatusCode::NOT_FOUND,
            "VERSION_NOT_FOUND",
            err.to_string(),
        ),
        CoreError::AlreadyExists { .. } => {
            (StatusCode::CONFLICT, "ALREADY_EXISTS", err.to_string())
        }
        CoreError::Timeout => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT", err.to_string()),
        CoreError::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "CANCELLED",
            err.to_string(),
        ),
        CoreError::Storage { message, source } => {
            tracing::error!(error = %source, context = %message, "Storage failure");
            internal()
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
