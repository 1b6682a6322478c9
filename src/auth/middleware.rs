//! Authentication middleware
//!
//! Requests pass through an ordered chain of interceptors before reaching
//! the router. Each interceptor either forwards the request or answers it.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::HOST, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::found;
use super::session::{Session, SessionStore};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::GUARD_DECISIONS_TOTAL;

/// Paths under these prefixes never require a session
const PUBLIC_PREFIXES: &[&str] = &["/login", "/static"];

/// Paths that never require a session
const PUBLIC_PATHS: &[&str] = &["/"];

/// Outcome of a single interceptor
pub enum Decision {
    /// Hand the request to the next interceptor, or the router
    Forward,
    /// Stop here and send this response
    Respond(Response),
}

/// A request interceptor
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn intercept(&self, request: &mut Request) -> Decision;
}

/// Ordered interceptors, applied outermost first
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn intercept(&self, request: &mut Request) -> Decision {
        for interceptor in &self.interceptors {
            if let Decision::Respond(response) = interceptor.intercept(request) {
                tracing::debug!(
                    interceptor = interceptor.name(),
                    path = %request.uri().path(),
                    status = %response.status(),
                    "Request short-circuited"
                );
                return Decision::Respond(response);
            }
        }
        Decision::Forward
    }
}

/// Middleware running the interceptor chain
///
/// # Usage
/// ```ignore
/// let app = router.layer(middleware::from_fn_with_state(chain, run_interceptors));
/// ```
pub async fn run_interceptors(
    State(chain): State<InterceptorChain>,
    mut request: Request,
    next: Next,
) -> Response {
    match chain.intercept(&mut request) {
        Decision::Forward => next.run(request).await,
        Decision::Respond(response) => response,
    }
}

// =============================================================================
// Session Guard
// =============================================================================

/// What the guard does with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    Forward,
    Unauthorized,
    RedirectToLogin,
}

/// Whether a path is reachable without a session
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || PUBLIC_PATHS.contains(&path)
}

/// Decide a request from its path and whether its session is authenticated
pub fn verdict(path: &str, authenticated: bool) -> GuardVerdict {
    if authenticated || is_public_path(path) {
        GuardVerdict::Forward
    } else if path.starts_with("/api") {
        GuardVerdict::Unauthorized
    } else {
        GuardVerdict::RedirectToLogin
    }
}

/// Rejects requests to protected paths that carry no authenticated session
///
/// Public paths are forwarded without looking at cookies. For protected
/// paths the resolved session is placed in request extensions.
pub struct SessionGuard {
    store: Arc<SessionStore>,
}

impl SessionGuard {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }
}

impl Interceptor for SessionGuard {
    fn name(&self) -> &'static str {
        "session-guard"
    }

    fn intercept(&self, request: &mut Request) -> Decision {
        let path = request.uri().path().to_owned();

        if is_public_path(&path) {
            GUARD_DECISIONS_TOTAL.with_label_values(&["public"]).inc();
            tracing::trace!(%path, "Unauthenticated access allowed");
            return Decision::Forward;
        }

        let session = match self.store.get(request.headers()) {
            Ok(session) => session,
            Err(error) => {
                GUARD_DECISIONS_TOTAL.with_label_values(&["error"]).inc();
                tracing::error!(%error, %path, "Failed to resolve session");
                return Decision::Respond(AppError::from(error).into_response());
            }
        };

        match verdict(&path, session.is_authenticated()) {
            GuardVerdict::Forward => {
                GUARD_DECISIONS_TOTAL.with_label_values(&["forward"]).inc();
                request.extensions_mut().insert(session);
                Decision::Forward
            }
            GuardVerdict::Unauthorized => {
                GUARD_DECISIONS_TOTAL
                    .with_label_values(&["unauthorized"])
                    .inc();
                tracing::debug!(%path, "Unauthorized API request");
                Decision::Respond(StatusCode::UNAUTHORIZED.into_response())
            }
            GuardVerdict::RedirectToLogin => {
                GUARD_DECISIONS_TOTAL.with_label_values(&["redirect"]).inc();
                tracing::debug!(%path, "Not logged in - redirecting");
                Decision::Respond(found("/login"))
            }
        }
    }
}

// =============================================================================
// HTTPS Enforcer
// =============================================================================

/// Redirects plain-HTTP requests to their `https` equivalent
///
/// A request counts as secure if its URI scheme is `https` or a proxy set
/// `X-Forwarded-Proto: https`.
pub struct HttpsEnforcer;

impl Interceptor for HttpsEnforcer {
    fn name(&self) -> &'static str {
        "https-enforcer"
    }

    fn intercept(&self, request: &mut Request) -> Decision {
        let forwarded_https = request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));

        if forwarded_https || request.uri().scheme_str() == Some("https") {
            return Decision::Forward;
        }

        let Some(host) = request.headers().get(HOST).and_then(|v| v.to_str().ok()) else {
            return Decision::Respond(
                AppError::BadRequest("Missing Host header".to_string()).into_response(),
            );
        };

        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        Decision::Respond(found(&format!("https://{host}{path_and_query}")))
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Extractor for the current authenticated session
///
/// Use in handlers behind the guard to get the access token.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
///     session.access_token().unwrap_or_default().len().to_string()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            if session.is_authenticated() {
                return Ok(CurrentSession(session));
            }
        }

        let state = AppState::from_ref(state);
        let session = state.sessions.get(&parts.headers)?;
        if !session.is_authenticated() {
            return Err(AppError::Unauthorized);
        }

        parts.extensions.insert(session.clone());
        Ok(CurrentSession(session))
    }
}
