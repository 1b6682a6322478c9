//! OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow against the task
//! provider: redirect to the provider, accept its callback, exchange the
//! code for an access token and store it in the session.

use axum::{
    Router,
    extract::{RawQuery, State},
    response::Response,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::Url;

use super::found;
use super::session::{AUXILIARY_COOKIE, SESSION_COOKIE, removal_cookie};
use super::state_token::StateToken;
use crate::AppState;
use crate::config::ProviderConfig;
use crate::error::AppError;
use crate::metrics::LOGINS_TOTAL;

/// Create authentication router
///
/// Routes:
/// - GET /login - Redirect to the provider
/// - GET /login-resp - OAuth callback
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/login-resp", get(login_response))
        .route("/logout", post(logout))
}

/// Handshake controller
///
/// Holds the client credentials and the process-wide state token. Only
/// writes sessions; never reads them.
pub struct OAuthHandshake {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorize_url: Url,
    token_url: String,
    state: StateToken,
    http_client: reqwest::Client,
}

/// Body sent to the token endpoint
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// Provider token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

impl OAuthHandshake {
    /// # Errors
    /// Returns `AppError::Config` if the authorize URL does not parse.
    pub fn new(
        provider: &ProviderConfig,
        redirect_uri: String,
        state: StateToken,
        http_client: reqwest::Client,
    ) -> Result<Self, AppError> {
        let authorize_url = Url::parse(&provider.authorize_url)
            .map_err(|e| AppError::Config(format!("provider.authorize_url: {e}")))?;

        Ok(Self {
            client_id: provider.client_id.clone(),
            client_secret: provider.client_secret.clone(),
            redirect_uri,
            authorize_url,
            token_url: provider.token_url.clone(),
            state,
            http_client,
        })
    }

    pub fn state_token(&self) -> &StateToken {
        &self.state
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Provider authorization URL carrying client_id, redirect_uri and state
    pub fn authorization_url(&self) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", self.state.as_str());
        url.to_string()
    }

    /// Check the state echoed by the provider
    ///
    /// A mismatch is reported as `NotFound` so a probing client cannot tell
    /// the callback apart from a missing route.
    pub fn verify_state(&self, returned: Option<&str>) -> Result<(), AppError> {
        match returned {
            Some(value) if self.state.matches(value) => Ok(()),
            _ => Err(AppError::NotFound),
        }
    }

    /// Exchange an authorization code for an access token
    ///
    /// Not retried; a failure surfaces to the user, who can start over.
    pub async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        tracing::debug!("Exchanging authorization code for access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .json(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                code,
            })
            .send()
            .await
            .map_err(|e| AppError::TokenExchange(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::TokenExchange(format!(
                "token endpoint returned {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::TokenExchange(format!("invalid token response: {e}")))?;

        if token.access_token.is_empty() {
            return Err(AppError::TokenExchange(
                "token response carried no access_token".to_string(),
            ));
        }

        Ok(token.access_token)
    }
}

// =============================================================================
// Start
// =============================================================================

/// GET /login
///
/// Redirects the browser to the provider's authorization page. No session
/// is touched.
async fn login(State(state): State<AppState>) -> Response {
    LOGINS_TOTAL.with_label_values(&["started"]).inc();
    tracing::info!("Redirecting to OAuth provider");
    found(&state.handshake.authorization_url())
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from the provider callback
#[derive(Debug, Default, PartialEq, Eq)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
}

impl CallbackQuery {
    /// Parse leniently: the first occurrence of a key wins, anything
    /// unparseable is simply absent.
    fn parse(raw: Option<&str>) -> Self {
        let mut query = Self::default();
        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                "code" => &mut query.code,
                "state" => &mut query.state,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        query
    }
}

/// GET /login-resp
///
/// # Steps
/// 1. Verify CSRF state (404 on mismatch)
/// 2. Exchange code for access token (500 on failure)
/// 3. Save a fresh session holding the token
/// 4. Redirect to home
async fn login_response(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    jar: CookieJar,
) -> Result<(CookieJar, Response), AppError> {
    let query = CallbackQuery::parse(raw_query.as_deref());

    if let Err(rejection) = state.handshake.verify_state(query.state.as_deref()) {
        LOGINS_TOTAL.with_label_values(&["state_mismatch"]).inc();
        tracing::warn!("OAuth callback state did not match; responding 404");
        return Err(rejection);
    }

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        LOGINS_TOTAL.with_label_values(&["missing_code"]).inc();
        tracing::warn!("OAuth callback without authorization code; responding 404");
        return Err(AppError::NotFound);
    };

    let access_token = match state.handshake.exchange_code(&code).await {
        Ok(token) => token,
        Err(error) => {
            LOGINS_TOTAL.with_label_values(&["exchange_failed"]).inc();
            tracing::error!(%error, "OAuth code exchange failed");
            return Err(error);
        }
    };

    let mut session = state.sessions.new_session();
    session.access_token = Some(access_token);
    let jar = state.sessions.save(&mut session, jar)?;

    LOGINS_TOTAL.with_label_values(&["succeeded"]).inc();
    tracing::info!(session_id = %session.id, "Login completed");

    Ok((jar, found("/")))
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Clears the session cookies and redirects home. The provider is not
/// contacted.
async fn logout(jar: CookieJar) -> (CookieJar, Response) {
    tracing::info!("Logging out");
    let jar = jar
        .add(removal_cookie(SESSION_COOKIE))
        .add(removal_cookie(AUXILIARY_COOKIE));
    (jar, found("/"))
}
