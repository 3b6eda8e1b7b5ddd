//! Access token lifecycle.
//!
//! The refresh secret is exchanged for a short-lived access token at the
//! Keycloak token endpoint and cached until it expires. The cache lives
//! behind an async mutex held across the whole check-and-refresh sequence,
//! so concurrent callers wait for one refresh instead of racing.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::traits::{Headers, HttpClient};

/// Token endpoint response. Extra Keycloak fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Default)]
struct TokenCache {
    refresh_secret: Option<String>,
    access_token: Option<String>,
    /// Unix seconds; the token is stale once `now >= expires_at`
    expires_at: i64,
}

impl TokenCache {
    fn valid_token(&self, now: i64) -> Option<&str> {
        match &self.access_token {
            Some(token) if now < self.expires_at => Some(token),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.access_token = None;
        self.expires_at = 0;
    }
}

/// Hands out access tokens, refreshing them when stale.
pub struct TokenManager {
    http: Arc<dyn HttpClient>,
    token_url: String,
    client_id: String,
    expiry_margin: Duration,
    cache: Mutex<TokenCache>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("expiry_margin", &self.expiry_margin)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager for `refresh_secret`. No request is made until the
    /// first [`access_token`](Self::access_token) call.
    pub fn new(
        http: Arc<dyn HttpClient>,
        config: &ClientConfig,
        refresh_secret: Option<String>,
    ) -> Self {
        Self {
            http,
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            expiry_margin: config.expiry_margin,
            cache: Mutex::new(TokenCache {
                refresh_secret,
                ..TokenCache::default()
            }),
        }
    }

    /// Return a valid access token, refreshing it if missing or expired.
    ///
    /// Any refresh failure clears the cached token, so the next call tries
    /// again.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut cache = self.cache.lock().await;
        let now = chrono::Utc::now().timestamp();

        if let Some(token) = cache.valid_token(now) {
            return Ok(token.to_string());
        }

        let refresh_secret = match cache.refresh_secret.clone() {
            Some(secret) => secret,
            None => {
                error!("No refresh secret available, cannot obtain an access token");
                cache.reset();
                return Err(AuthError::NotAuthenticated);
            }
        };

        debug!("Access token missing or expired, refreshing");
        let form = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_secret.as_str()),
        ];

        let response = match self
            .http
            .post_form(&self.token_url, &form, &Headers::new())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Token request failed: {}", e);
                cache.reset();
                return Err(AuthError::Transport {
                    message: e.to_string(),
                });
            }
        };

        if !response.is_ok() {
            error!("Token request refused with status {}", response.status);
            cache.reset();
            return Err(AuthError::Refused {
                status: response.status,
                body: response.text_lossy(),
            });
        }

        let token: TokenResponse = match response.json() {
            Ok(token) => token,
            Err(e) => {
                error!("Token response could not be parsed: {}", e);
                cache.reset();
                return Err(AuthError::InvalidResponse {
                    message: e.to_string(),
                });
            }
        };

        let margin = i64::try_from(self.expiry_margin.as_secs()).unwrap_or(i64::MAX);
        let lifetime = token.expires_in.saturating_sub(margin).max(0);
        cache.access_token = Some(token.access_token.clone());
        cache.expires_at = now.saturating_add(lifetime);

        info!("Access token refreshed, valid for {}s", lifetime);
        Ok(token.access_token)
    }

    /// `Authorization: Bearer <token>` header for REST and WebSocket calls.
    pub async fn bearer_headers(&self) -> Result<Headers, AuthError> {
        let token = self.access_token().await?;
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        Ok(headers)
    }

    /// Drop the cached access token so the next call refreshes.
    pub async fn invalidate(&self) {
        self.cache.lock().await.reset();
    }

    /// Replace the refresh secret and drop the cached access token.
    pub async fn set_refresh_secret(&self, refresh_secret: Option<String>) {
        let mut cache = self.cache.lock().await;
        cache.refresh_secret = refresh_secret;
        cache.reset();
    }

    pub async fn has_refresh_secret(&self) -> bool {
        self.cache.lock().await.refresh_secret.is_some()
    }

    /// Expiry of the cached token in unix seconds, if one is cached.
    pub async fn cached_expiry(&self) -> Option<i64> {
        let cache = self.cache.lock().await;
        cache.access_token.as_ref().map(|_| cache.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse};
    use crate::traits::HttpError;
    use serde_json::json;

    fn setup(secret: Option<&str>) -> (MockHttpClient, TokenManager, ClientConfig) {
        let config = ClientConfig::default().with_http_base("https://auth.test");
        let http = MockHttpClient::new();
        let manager = TokenManager::new(
            Arc::new(http.clone()),
            &config,
            secret.map(str::to_string),
        );
        (http, manager, config)
    }

    fn token_body(token: &str, expires_in: i64) -> MockResponse {
        MockResponse::json(200, json!({"access_token": token, "expires_in": expires_in}))
    }

    #[tokio::test]
    async fn test_refresh_sends_grant_form() {
        let (http, manager, config) = setup(Some("long-secret"));
        http.set_response(&config.token_url(), token_body("jwt-1", 3600));

        assert_eq!(manager.access_token().await.unwrap(), "jwt-1");

        let requests = http.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, config.token_url());
        assert_eq!(requests[0].form_field("client_id"), Some("trade-api-write"));
        assert_eq!(requests[0].form_field("grant_type"), Some("refresh_token"));
        assert_eq!(requests[0].form_field("refresh_token"), Some("long-secret"));
    }

    #[tokio::test]
    async fn test_cached_until_expiry() {
        let (http, manager, config) = setup(Some("s"));
        http.set_response(&config.token_url(), token_body("jwt-1", 3600));

        let first = manager.access_token().await.unwrap();
        let second = manager.access_token().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(http.request_count(), 1);

        let expiry = manager.cached_expiry().await.unwrap();
        let now = chrono::Utc::now().timestamp();
        assert!(expiry > now + 3500 && expiry <= now + 3600);
    }

    #[tokio::test]
    async fn test_zero_lifetime_refreshes_every_call() {
        let (http, manager, config) = setup(Some("s"));
        http.push_response(&config.token_url(), token_body("jwt-1", 0));
        http.push_response(&config.token_url(), token_body("jwt-2", 0));

        assert_eq!(manager.access_token().await.unwrap(), "jwt-1");
        assert_eq!(manager.access_token().await.unwrap(), "jwt-2");
        assert_eq!(http.request_count(), 2);
    }

    #[tokio::test]
    async fn test_expiry_margin_is_subtracted() {
        let config = ClientConfig::default()
            .with_http_base("https://auth.test")
            .with_expiry_margin(Duration::from_secs(5));
        let http = MockHttpClient::new();
        http.set_response(&config.token_url(), token_body("jwt", 5));
        let manager = TokenManager::new(Arc::new(http.clone()), &config, Some("s".to_string()));

        manager.access_token().await.unwrap();
        manager.access_token().await.unwrap();
        assert_eq!(http.request_count(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_clears_cache() {
        let (http, manager, config) = setup(Some("s"));
        http.push_response(&config.token_url(), token_body("jwt-1", 0));
        http.push_response(
            &config.token_url(),
            MockResponse::Error(HttpError::ConnectionFailed("tls".to_string())),
        );

        manager.access_token().await.unwrap();
        let err = manager.access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Transport { .. }));
        assert_eq!(manager.cached_expiry().await, None);
    }

    #[tokio::test]
    async fn test_refused_reports_status() {
        let (http, manager, config) = setup(Some("revoked"));
        http.set_response(
            &config.token_url(),
            MockResponse::text(400, "{\"error\":\"invalid_grant\"}"),
        );

        let err = manager.access_token().await.unwrap_err();
        assert_eq!(
            err,
            AuthError::Refused {
                status: 400,
                body: "{\"error\":\"invalid_grant\"}".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let (http, manager, config) = setup(Some("s"));
        http.set_response(&config.token_url(), MockResponse::text(200, "not json"));

        let err = manager.access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_no_secret_makes_no_request() {
        let (http, manager, _) = setup(None);

        assert_eq!(
            manager.access_token().await.unwrap_err(),
            AuthError::NotAuthenticated
        );
        assert_eq!(http.request_count(), 0);
        assert!(!manager.has_refresh_secret().await);
    }

    #[tokio::test]
    async fn test_invalidate_and_replace_secret() {
        let (http, manager, config) = setup(Some("old"));
        http.set_response(&config.token_url(), token_body("jwt", 3600));

        manager.access_token().await.unwrap();
        manager.invalidate().await;
        manager.access_token().await.unwrap();
        assert_eq!(http.request_count(), 2);

        manager.set_refresh_secret(Some("new".to_string())).await;
        manager.access_token().await.unwrap();
        let requests = http.get_requests();
        assert_eq!(requests[2].form_field("refresh_token"), Some("new"));
    }

    #[tokio::test]
    async fn test_bearer_headers() {
        let (http, manager, config) = setup(Some("s"));
        http.set_response(&config.token_url(), token_body("jwt-9", 60));

        let headers = manager.bearer_headers().await.unwrap();
        assert_eq!(headers.get("Authorization"), Some(&"Bearer jwt-9".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let (http, manager, config) = setup(Some("s"));
        http.set_response(&config.token_url(), token_body("jwt", 3600));
        let manager = Arc::new(manager);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.access_token().await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "jwt");
        }
        assert_eq!(http.request_count(), 1);
    }
}
