//! tardy - how late do you finish your tasks?
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Interceptor chain                          │
//! │  - HTTPS enforcer (optional)                                │
//! │  - Session guard                                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Routes (Axum)                           │
//! │  - OAuth login / callback / logout                          │
//! │  - Home page and static assets                              │
//! │  - Lateness report API, metrics                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Task list API client                                     │
//! │  - Lateness report                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `auth`: OAuth handshake, signed session cookies, session guard
//! - `api`: JSON and metrics endpoints
//! - `web`: Home page and static assets
//! - `service`: Provider API client and report
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod web;

use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
///
/// Everything here is read-only after startup, so clones are cheap.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Signed cookie session store
    pub sessions: Arc<auth::SessionStore>,

    /// OAuth handshake controller, holding the process-wide state token
    pub handshake: Arc<auth::OAuthHandshake>,

    /// Task list API client
    pub tasks: Arc<service::TaskListClient>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Generate the OAuth state token
    /// 2. Build the outbound HTTP client
    /// 3. Create the session store
    /// 4. Wire the handshake controller and task client
    ///
    /// # Errors
    /// Returns error if the entropy source fails or a configured value is
    /// unusable.
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. State token, fixed for the lifetime of the process
        let state_token = auth::generate_state()?;

        // 2. HTTP client for provider calls
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("tardy/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.upstream.timeout_seconds))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        // 3. Session store
        let secure = config.should_use_secure_cookies();
        let sessions = match config.session.secret.as_deref() {
            Some(secret) => {
                auth::SessionStore::new(secret.as_bytes(), config.session.max_age, secure)?
            }
            None => {
                tracing::warn!(
                    "session.secret not set; using a random key, sessions will not survive a restart"
                );
                auth::SessionStore::with_random_key(config.session.max_age, secure)?
            }
        };

        // 4. Handshake and task client
        let handshake = auth::OAuthHandshake::new(
            &config.provider,
            config.server.oauth_redirect_uri(),
            state_token,
            http_client.clone(),
        )?;
        let tasks = service::TaskListClient::new(
            &config.provider.api_url,
            &config.provider.client_id,
            http_client,
        );

        tracing::info!(
            redirect_uri = %handshake.redirect_uri(),
            secure_cookies = secure,
            "Application state initialized successfully"
        );

        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            handshake: Arc::new(handshake),
            tasks: Arc::new(tasks),
        })
    }

    /// Interceptors applied to every request, outermost first
    pub fn interceptor_chain(&self) -> auth::InterceptorChain {
        let mut chain = auth::InterceptorChain::new();
        if self.config.server.force_https {
            chain = chain.with(auth::HttpsEnforcer);
        }
        chain.with(auth::SessionGuard::new(self.sessions.clone()))
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::trace::TraceLayer;

    let chain = state.interceptor_chain();

    Router::new()
        .merge(auth::auth_router())
        .merge(web::web_router())
        .merge(api::metrics_router())
        .nest("/api/v1", api::tasks_router())
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            chain,
            auth::run_interceptors,
        ))
        .layer(TraceLayer::new_for_http())
}

async fn fallback() -> error::AppError {
    error::AppError::NotFound
}
