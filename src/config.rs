//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub session: SessionConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 12345)
    pub port: u16,
    /// Public origin the provider redirects back to
    /// (defaults to "http://localhost:<port>")
    pub redirect_host: Option<String>,
    /// Redirect plain-HTTP requests to https
    #[serde(default)]
    pub force_https: bool,
}

impl ServerConfig {
    /// Public origin, without a trailing slash
    pub fn redirect_host(&self) -> String {
        match self.redirect_host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => host.trim_end_matches('/').to_string(),
            _ => format!("http://localhost:{}", self.port),
        }
    }

    /// OAuth callback URL registered with the provider
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/login-resp", self.redirect_host())
    }
}

/// OAuth provider configuration
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Authorization endpoint the browser is sent to
    pub authorize_url: String,
    /// Token endpoint for the code exchange
    pub token_url: String,
    /// Base URL of the task list API
    pub api_url: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Session cookie configuration
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Signing key (32+ bytes). A random key is generated when unset.
    pub secret: Option<String>,
    /// Session max age in seconds (default: 3600)
    pub max_age: i64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("max_age", &self.max_age)
            .finish()
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Transport timeout for provider calls in seconds (default: 30)
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (TARDY__*)
    /// 5. PORT, REDIRECT_HOST, CLIENT_ID, CLIENT_SECRET
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let env = |key: &str| std::env::var(key).ok().filter(|value| !value.is_empty());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 12345)?
            .set_default("server.force_https", false)?
            .set_default("provider.client_id", "")?
            .set_default("provider.client_secret", "")?
            .set_default(
                "provider.authorize_url",
                "https://www.wunderlist.com/oauth/authorize",
            )?
            .set_default(
                "provider.token_url",
                "https://www.wunderlist.com/oauth/access_token",
            )?
            .set_default("provider.api_url", "https://a.wunderlist.com/api/v1")?
            .set_default("session.max_age", 3600)?
            .set_default("upstream.timeout_seconds", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (TARDY__*)
            .add_source(
                Environment::with_prefix("TARDY")
                    .separator("__")
                    .try_parsing(true),
            )
            // Plain deployment variables win over everything else
            .set_override_option("server.port", env("PORT"))?
            .set_override_option("server.redirect_host", env("REDIRECT_HOST"))?
            .set_override_option("provider.client_id", env("CLIENT_ID"))?
            .set_override_option("provider.client_secret", env("CLIENT_SECRET"))?
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Session cookies carry `Secure` when the public origin is https
    pub fn should_use_secure_cookies(&self) -> bool {
        self.server
            .redirect_host()
            .to_ascii_lowercase()
            .starts_with("https://")
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::auth::session::{MAX_AGE_LIMIT_SECONDS, MIN_KEY_BYTES};
        use crate::error::AppError;

        if self.provider.client_id.trim().is_empty() || self.provider.client_secret.trim().is_empty()
        {
            return Err(AppError::Config(
                "client id and client secret must be provided and non-empty".to_string(),
            ));
        }

        if let Some(secret) = &self.session.secret {
            if secret.as_bytes().len() < MIN_KEY_BYTES {
                return Err(AppError::Config(format!(
                    "session.secret must be at least {} bytes",
                    MIN_KEY_BYTES
                )));
            }
        }

        if !(1..=MAX_AGE_LIMIT_SECONDS).contains(&self.session.max_age) {
            return Err(AppError::Config(format!(
                "session.max_age must be between 1 and {} seconds",
                MAX_AGE_LIMIT_SECONDS
            )));
        }

        for (key, value) in [
            ("provider.authorize_url", &self.provider.authorize_url),
            ("provider.token_url", &self.provider.token_url),
            ("provider.api_url", &self.provider.api_url),
        ] {
            url::Url::parse(value).map_err(|e| AppError::Config(format!("{key}: {e}")))?;
        }

        Ok(())
    }
}
