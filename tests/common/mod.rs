//! Common test utilities for E2E tests

#![allow(dead_code)]

use tardy::{AppState, config};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const ACCESS_TOKEN: &str = "test-access-token";

/// Test server instance, wired to a mock provider
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub provider: MockServer,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        let provider = MockServer::start().await;
        let provider_uri = provider.uri();

        // Create test configuration
        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                redirect_host: Some("http://tardy.test".to_string()),
                force_https: false,
            },
            provider: config::ProviderConfig {
                client_id: CLIENT_ID.to_string(),
                client_secret: CLIENT_SECRET.to_string(),
                authorize_url: format!("{provider_uri}/oauth/authorize"),
                token_url: format!("{provider_uri}/oauth/access_token"),
                api_url: format!("{provider_uri}/api/v1"),
            },
            session: config::SessionConfig {
                secret: Some("test-session-secret-32-bytes-long!!".to_string()),
                max_age: 3600,
            },
            upstream: config::UpstreamConfig { timeout_seconds: 5 },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        adjust(&mut config);

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = tardy::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            provider,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// The state token this server expects back from the provider
    pub fn state_token(&self) -> String {
        self.state.handshake.state_token().as_str().to_string()
    }

    /// Callback URL with a properly encoded state and code
    pub fn callback_url(&self, state: &str, code: &str) -> String {
        let mut url = url::Url::parse(&self.url("/login-resp")).unwrap();
        url.query_pairs_mut()
            .append_pair("state", state)
            .append_pair("code", code);
        url.to_string()
    }

    /// Make the provider's token endpoint accept `code`
    pub async fn mock_token_exchange(&self, code: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth/access_token"))
            .and(body_partial_json(serde_json::json!({
                "client_id": CLIENT_ID,
                "client_secret": CLIENT_SECRET,
                "code": code,
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": ACCESS_TOKEN })),
            )
            .up_to_n_times(1)
            .mount(&self.provider)
            .await;
    }

    /// Run the whole login flow and return the `Cookie` header value
    pub async fn login(&self) -> String {
        self.mock_token_exchange("good-code").await;

        let response = self
            .client
            .get(self.callback_url(&self.state_token(), "good-code"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 302);

        session_cookie(&response).expect("login sets a session cookie")
    }
}

/// `name=value` of the session cookie set by a response
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session-name="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Location header of a redirect
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}
