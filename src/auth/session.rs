//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed: each request round-trips the
//! whole session through the `session-name` cookie.

use std::fmt;

use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the signed session
pub const SESSION_COOKIE: &str = "session-name";

/// Cookie used by the earlier stateless scheme. Only ever cleared.
pub const AUXILIARY_COOKIE: &str = "session";

/// Minimum signing key length in bytes
pub const MIN_KEY_BYTES: usize = 32;

/// Longest accepted session lifetime in seconds (one year)
pub const MAX_AGE_LIMIT_SECONDS: i64 = 365 * 24 * 60 * 60;

const GENERATED_KEY_BYTES: usize = 64;

/// Session store failures
///
/// An absent or expired session is not an error; these are.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("malformed session cookie")]
    Malformed,

    #[error("session cookie signature mismatch")]
    InvalidSignature,

    #[error("session payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("invalid signing key: {0}")]
    Key(String),

    #[error("session max age out of range: {0} seconds")]
    MaxAge(i64),

    #[error("failed to generate signing key: {0}")]
    Randomness(#[from] rand::Error),
}

/// User session data
///
/// A session without a non-empty access token is not authenticated.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Opaque random identifier
    pub id: String,
    /// Provider-issued bearer token, set once the handshake completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Access token, if present and non-empty
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("authenticated", &self.is_authenticated())
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Signed-cookie session store
///
/// The signing key and lifetime are fixed at construction and shared
/// read-only across requests.
#[derive(Clone)]
pub struct SessionStore {
    key: Vec<u8>,
    max_age: Duration,
    secure: bool,
}

impl SessionStore {
    /// Create a store with an explicit signing key
    ///
    /// # Errors
    /// Returns `SessionStoreError::Key` if the key is shorter than 32 bytes,
    /// or `SessionStoreError::MaxAge` if the lifetime is not positive or
    /// exceeds one year.
    pub fn new(
        key: impl Into<Vec<u8>>,
        max_age_seconds: i64,
        secure: bool,
    ) -> Result<Self, SessionStoreError> {
        let key = key.into();
        if key.len() < MIN_KEY_BYTES {
            return Err(SessionStoreError::Key(format!(
                "signing key must be at least {} bytes",
                MIN_KEY_BYTES
            )));
        }

        if !(1..=MAX_AGE_LIMIT_SECONDS).contains(&max_age_seconds) {
            return Err(SessionStoreError::MaxAge(max_age_seconds));
        }

        Ok(Self {
            key,
            max_age: Duration::seconds(max_age_seconds),
            secure,
        })
    }

    /// Create a store with a key drawn from the OS entropy source
    ///
    /// Sessions signed with it do not survive a restart.
    pub fn with_random_key(max_age_seconds: i64, secure: bool) -> Result<Self, SessionStoreError> {
        let mut key = vec![0_u8; GENERATED_KEY_BYTES];
        OsRng.try_fill_bytes(&mut key)?;
        Self::new(key, max_age_seconds, secure)
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.max_age.num_seconds()
    }

    /// A fresh, unauthenticated session with a new identifier
    pub fn new_session(&self) -> Session {
        let now = Utc::now();
        Session {
            id: generate_session_id(),
            access_token: None,
            created_at: now,
            expires_at: now + self.max_age,
        }
    }

    /// Resolve the session carried by the request's cookies
    ///
    /// No cookie, or an expired session, yields a new empty session.
    ///
    /// # Errors
    /// Returns an error if the cookie is present but malformed or its
    /// signature does not verify.
    pub fn get(&self, headers: &HeaderMap) -> Result<Session, SessionStoreError> {
        let jar = CookieJar::from_headers(headers);
        let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) else {
            return Ok(self.new_session());
        };

        let session = self.decode(cookie.value())?;
        if session.is_expired() {
            tracing::debug!(session_id = %session.id, "Session expired");
            return Ok(self.new_session());
        }

        Ok(session)
    }

    /// Sign the session and add its cookie to the jar
    ///
    /// Expiry is reset to `max_age` from now; it is absolute, not sliding.
    pub fn save(&self, session: &mut Session, jar: CookieJar) -> Result<CookieJar, SessionStoreError> {
        session.expires_at = Utc::now() + self.max_age;
        let value = self.encode(session)?;

        let cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.max_age.num_seconds()))
            .build();

        Ok(jar.add(cookie))
    }

    /// Create a signed session token
    ///
    /// Token format: base64(payload).base64(hmac_sha256(payload))
    pub fn encode(&self, session: &Session) -> Result<String, SessionStoreError> {
        let payload = serde_json::to_vec(session)?;
        let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac()?;
        mac.update(payload_b64.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        Ok(format!("{}.{}", payload_b64, signature_b64))
    }

    /// Verify and decode a session token
    ///
    /// Expiry is not checked here.
    pub fn decode(&self, token: &str) -> Result<Session, SessionStoreError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(SessionStoreError::Malformed)?;

        let signature = general_purpose::URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SessionStoreError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionStoreError::InvalidSignature)?;

        let payload = general_purpose::URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| SessionStoreError::Malformed)?;

        Ok(serde_json::from_slice(&payload)?)
    }

    fn mac(&self) -> Result<HmacSha256, SessionStoreError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| SessionStoreError::Key(e.to_string()))
    }
}

/// Cookie that makes the browser drop `name` immediately
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").http_only(true).build();
    cookie.make_removal();
    cookie
}

fn generate_session_id() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
