//! Error types for Tardy
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::session::SessionStoreError;
use crate::auth::state_token::StateTokenError;

/// Application-wide error type
///
/// `NotFound` and `Unauthorized` render as a bare status with no body, so a
/// rejected OAuth callback looks exactly like a route that does not exist.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Malformed request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Session cookie could not be decoded, verified or encoded (500)
    #[error("Session store error: {0}")]
    SessionStore(#[from] SessionStoreError),

    /// Exchanging the authorization code with the provider failed (500)
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Task list API failure (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Entropy source unavailable (500)
    #[error("Randomness error: {0}")]
    Randomness(#[from] StateTokenError),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
            AppError::SessionStore(_) => "session_store",
            AppError::TokenExchange(_) => "token_exchange",
            AppError::Upstream(_) => "upstream",
            AppError::Randomness(_) => "randomness",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use axum::Json;

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[self.error_type()])
            .inc();

        let (status, error_message) = match &self {
            AppError::NotFound => return StatusCode::NOT_FOUND.into_response(),
            AppError::Unauthorized => return StatusCode::UNAUTHORIZED.into_response(),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::SessionStore(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session error".to_string(),
            ),
            AppError::TokenExchange(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed, please try again".to_string(),
            ),
            AppError::Randomness(_) | AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
