//! OAuth authentication
//!
//! Handles:
//! - Provider OAuth flow
//! - Session management
//! - Authentication middleware

mod middleware;
mod oauth;
pub mod session;
pub mod state_token;

use axum::{
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};

pub use middleware::{
    CurrentSession, Decision, GuardVerdict, HttpsEnforcer, Interceptor, InterceptorChain,
    SessionGuard, is_public_path, run_interceptors, verdict,
};
pub use oauth::{OAuthHandshake, auth_router};
pub use session::{Session, SessionStore, SessionStoreError};
pub use state_token::{StateToken, StateTokenError, generate_state};

/// `302 Found` redirect
///
/// `axum::response::Redirect` only offers 303/307/308.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}
