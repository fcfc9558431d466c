//! Accounts Error Types
//!
//! Centralized error handling for the store, token and auth flows.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Accounts errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("User with this email already exists")]
    Conflict,

    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl AuthError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AuthError::Unauthorized(message.into())
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Unauthorized(_) | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Config(_) | AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (error_code, message) = match &self {
            AuthError::Conflict => ("conflict", self.to_string()),
            AuthError::NotFound => ("not_found", self.to_string()),
            AuthError::Unauthorized(msg) => ("unauthorized", msg.clone()),
            AuthError::InvalidToken => ("invalid_token", self.to_string()),
            AuthError::Validation(msg) => ("validation_error", msg.clone()),
            AuthError::Config(_) | AuthError::Internal => (
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        (
            self.status(),
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT error: {:?}", err);
        AuthError::InvalidToken
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::Validation(err.to_string())
    }
}
