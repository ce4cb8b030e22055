use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::types::LoyaltyError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`LoyaltyError`] for engine errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An engine error.
    #[error(transparent)]
    Engine(#[from] LoyaltyError),

    /// A malformed request body or query.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No actor could be identified.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The actor's role may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status, error code and client-facing message.
    pub fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Engine(error) => match error {
                LoyaltyError::InvalidInput { message } => {
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT", message.clone())
                }
                LoyaltyError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", error.to_string())
                }
                LoyaltyError::Conflict { .. } => {
                    (StatusCode::CONFLICT, "CONFLICT", error.to_string())
                }
                LoyaltyError::StoreUnavailable { .. }
                | LoyaltyError::RetryExhausted { .. }
                | LoyaltyError::Internal { .. } => {
                    tracing::error!(%error, "internal engine error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.classify();

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
