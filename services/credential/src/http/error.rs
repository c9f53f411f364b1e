//! Error responses.

use crate::error::CredentialError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or empty request field.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Unknown address or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Failure from the credential core.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// JSON error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// The error.
    pub error: ErrorBody,
}

/// Stable code plus a client-safe message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `INVALID_CREDENTIALS`.
    pub code: String,
    /// Sanitized message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.clone()),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            ApiError::Credential(e) if e.is_unauthorized() => {
                tracing::debug!(error = %e, "Rejected token");
                (StatusCode::UNAUTHORIZED, e.code(), e.public_message().to_string())
            }
            ApiError::Credential(e @ CredentialError::InvalidScope(_)) => {
                (StatusCode::BAD_REQUEST, e.code(), e.public_message().to_string())
            }
            ApiError::Credential(e) => {
                tracing::error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.code(), e.public_message().to_string())
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
