//! Error types for tutor-gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Service errors, mapped to HTTP responses at the routing layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Completion backend is not configured")]
    CompletionNotConfigured,

    #[error("Upstream completion error: {message}")]
    Upstream {
        message: String,
        provider_code: Option<u16>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::MissingField(_) => (StatusCode::BAD_REQUEST, "MISSING_FIELD"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            ApiError::CompletionNotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, "COMPLETION_NOT_CONFIGURED")
            }
            ApiError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let mut body = serde_json::json!({
            "error": self.to_string(),
            "code": code,
        });

        if let ApiError::Upstream {
            provider_code: Some(provider_code),
            ..
        } = &self
        {
            body["providerCode"] = serde_json::json!(provider_code);
        }

        (status, Json(body)).into_response()
    }
}
