use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use decora_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent `{ "error", "code" }`
/// JSON bodies; the `code` is stable and machine-readable so clients can
/// branch on the failure kind (e.g. a "buy credits" CTA on
/// `INSUFFICIENT_CREDITS`, "try again" on `GENERATION_TIMEOUT`).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `decora-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => (status_for(core), core.code(), message_for(core)),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// HTTP status for each domain error kind.
fn status_for(core: &CoreError) -> StatusCode {
    match core {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::AccessDenied { .. } | CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CoreError::GenerationInProgress => StatusCode::CONFLICT,
        CoreError::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
        CoreError::PromptBlocked(_) | CoreError::SafetyBlocked => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::GenerationTimeout => StatusCode::GATEWAY_TIMEOUT,
        CoreError::ServiceBusy => StatusCode::TOO_MANY_REQUESTS,
        CoreError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
        CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// User-facing message for a domain error. Internal details are sanitized
/// and logged instead of leaked.
fn message_for(core: &CoreError) -> String {
    match core {
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            "An internal error occurred".to_string()
        }
        other => other.to_string(),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_errors_map_to_distinct_statuses() {
        assert_eq!(
            status_for(&CoreError::GenerationInProgress),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CoreError::InsufficientCredits),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(status_for(&CoreError::SafetyBlocked), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&CoreError::GenerationTimeout),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(status_for(&CoreError::ServiceBusy), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_for(&CoreError::GenerationFailed("x".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn internal_messages_are_sanitized() {
        let msg = message_for(&CoreError::Internal("connection string leaked".into()));
        assert!(!msg.contains("connection string"));
    }
}
