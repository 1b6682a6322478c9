//! E2E tests for the OAuth login handshake and logout

mod common;

use common::{CLIENT_ID, TestServer, location, session_cookie};
use tardy::metrics::LOGINS_TOTAL;

#[tokio::test]
async fn test_login_redirects_to_provider_with_state() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/login")).send().await.unwrap();

    assert_eq!(response.status(), 302);
    let target = url::Url::parse(&location(&response)).unwrap();
    assert_eq!(target.path(), "/oauth/authorize");

    let params: std::collections::HashMap<_, _> = target.query_pairs().into_owned().collect();
    assert_eq!(params.get("client_id").map(String::as_str), Some(CLIENT_ID));
    assert_eq!(
        params.get("redirect_uri").map(String::as_str),
        Some("http://tardy.test/login-resp")
    );
    assert_eq!(params.get("state"), Some(&server.state_token()));

    // No session is touched on the way out
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn test_login_uses_the_same_state_every_time() {
    let server = TestServer::new().await;

    let first = server.client.get(server.url("/login")).send().await.unwrap();
    let second = server.client.get(server.url("/login")).send().await.unwrap();

    assert_eq!(location(&first), location(&second));
}

#[tokio::test]
async fn test_callback_with_wrong_state_is_not_found() {
    let server = TestServer::new().await;
    server.mock_token_exchange("good-code").await;

    let response = server
        .client
        .get(server.callback_url("WRONG", "good-code"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert!(session_cookie(&response).is_none());
    // The provider was never asked
    assert!(server.provider.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_without_state_or_code_is_not_found() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/login-resp?code=good-code"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let missing_code = LOGINS_TOTAL.with_label_values(&["missing_code"]);
    let before = missing_code.get();

    let mut no_code = url::Url::parse(&server.url("/login-resp")).unwrap();
    no_code
        .query_pairs_mut()
        .append_pair("state", &server.state_token());
    let response = server.client.get(no_code.as_str()).send().await.unwrap();
    assert_eq!(response.status(), 404);

    // A matching state without a code is not counted as a state mismatch
    assert!(missing_code.get() > before);
}

#[tokio::test]
async fn test_callback_with_repeated_params_is_indistinguishable_from_missing_route() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    for query in ["state=a&state=b&code=c", "state=a&code=c&code=d", "state=%zz&code"] {
        let response = server
            .client
            .get(server.url(&format!("/login-resp?{query}")))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 404, "{query}");
        assert!(session_cookie(&response).is_none(), "{query}");
        assert!(response.text().await.unwrap().is_empty(), "{query}");
    }

    // Same bytes as a route that does not exist
    let missing = server
        .client
        .get(server.url("/nope-not-a-route"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
    assert!(missing.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_keeps_the_first_state_when_repeated() {
    let server = TestServer::new().await;
    server.mock_token_exchange("good-code").await;

    let mut url = url::Url::parse(&server.callback_url(&server.state_token(), "good-code")).unwrap();
    url.query_pairs_mut().append_pair("state", "WRONG");

    let response = server.client.get(url.as_str()).send().await.unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
    assert!(session_cookie(&response).is_some());
}

#[tokio::test]
async fn test_callback_with_valid_state_sets_session_and_redirects_home() {
    let server = TestServer::new().await;
    server.mock_token_exchange("good-code").await;

    let response = server
        .client
        .get(server.callback_url(&server.state_token(), "good-code"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");

    let set_cookie = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session-name="))
        .expect("session cookie");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=3600"));
    // http redirect host, so no Secure flag
    assert!(!set_cookie.contains("Secure"));
}

#[tokio::test]
async fn test_reused_code_fails_the_exchange() {
    let server = TestServer::new().await;
    server.mock_token_exchange("good-code").await;
    let callback = server.callback_url(&server.state_token(), "good-code");

    let first = server.client.get(&callback).send().await.unwrap();
    assert_eq!(first.status(), 302);

    // Provider has consumed the code; the exchange is attempted again and fails
    let second = server.client.get(&callback).send().await.unwrap();
    assert_eq!(second.status(), 500);
    assert!(session_cookie(&second).is_none());

    let token_calls = server
        .provider
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/oauth/access_token")
        .count();
    assert_eq!(token_calls, 2);
}

#[tokio::test]
async fn test_callback_replaces_a_stale_session_cookie() {
    let server = TestServer::new().await;
    server.mock_token_exchange("good-code").await;

    let response = server
        .client
        .get(server.callback_url(&server.state_token(), "good-code"))
        .header("Cookie", "session-name=garbage")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert!(session_cookie(&response).is_some());
}

#[tokio::test]
async fn test_logout_clears_session_cookies() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .client
        .post(server.url("/logout"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");

    let cleared: Vec<&str> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(
        cleared
            .iter()
            .any(|c| c.starts_with("session-name=;") && c.contains("Max-Age=0"))
    );
    assert!(
        cleared
            .iter()
            .any(|c| c.starts_with("session=;") && c.contains("Max-Age=0"))
    );

    // A browser honouring the removal has no cookie left
    let response = server
        .client
        .get(server.url("/api/v1/tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_logout_without_session_redirects_to_login() {
    let server = TestServer::new().await;

    let response = server.client.post(server.url("/logout")).send().await.unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/login");
}
