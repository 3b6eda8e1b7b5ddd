//! Common fixtures for integration tests.
//!
//! # Example
//!
//! ```ignore
//! let server = MockServer::start().await;
//! mount_token(&server, "jwt", 3600).await;
//! let config = test_config(&server.uri());
//! ```

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bcs_trade::adapters::mock::{MockHttpClient, MockResponse};
use bcs_trade::auth::TokenManager;
use bcs_trade::config::ClientConfig;
use bcs_trade::events::{callback, Callback};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/trade-api-keycloak/realms/tradeapi/protocol/openid-connect/token";
pub const TEST_SECRET: &str = "test-refresh-secret";

/// Config pointing both hosts at a local server.
pub fn test_config(base: &str) -> ClientConfig {
    ClientConfig::default()
        .with_http_base(base)
        .with_ws_base("wss://ws.test")
        .with_request_timeout(Duration::from_secs(5))
        .with_shutdown_timeout(Duration::from_secs(1))
}

pub fn token_json(token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": token,
        "expires_in": expires_in,
        "token_type": "Bearer",
        "refresh_token": "rotated-but-ignored"
    })
}

/// Serve `token` from the token endpoint of `server`.
pub async fn mount_token(server: &MockServer, token: &str, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json(token, expires_in)))
        .mount(server)
        .await;
}

/// Token manager over a mock client that always issues `jwt`.
pub fn mock_tokens(config: &ClientConfig) -> (MockHttpClient, Arc<TokenManager>) {
    let http = MockHttpClient::new();
    http.set_response(&config.token_url(), MockResponse::json(200, token_json("jwt", 3600)));
    let tokens = Arc::new(TokenManager::new(
        Arc::new(http.clone()),
        config,
        Some(TEST_SECRET.to_string()),
    ));
    (http, tokens)
}

/// Callback forwarding every frame into a channel the test can await.
pub fn forwarding_callback() -> (Callback<Value>, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cb = callback(move |frame: &Value| {
        let _ = tx.send(frame.clone());
        Ok(())
    });
    (cb, rx)
}

/// Next forwarded frame, failing the test after two seconds.
pub async fn next_frame(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("callback channel closed")
}

/// Poll `check` until it returns true, failing after two seconds.
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 2s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
