//! Session facade wiring storage, tokens, REST and subscriptions together.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::{ReqwestHttpClient, TungsteniteConnector};
use crate::auth::{CredentialStore, TokenManager};
use crate::config::ClientConfig;
use crate::error::{AuthError, BcsError, BcsResult, NetworkError};
use crate::rest::RestClient;
use crate::subscriptions::SubscriptionManager;
use crate::traits::{HttpClient, SecretStore, StorageError, WsConnector};

/// One authenticated connection to the broker API.
#[derive(Debug)]
pub struct BcsSession {
    config: ClientConfig,
    credentials: CredentialStore,
    tokens: Arc<TokenManager>,
    rest: RestClient,
    subscriptions: SubscriptionManager,
}

impl BcsSession {
    /// Open a session over reqwest and tokio-tungstenite.
    ///
    /// A given `refresh_secret` is persisted to `store` for later runs;
    /// otherwise the stored one is used.
    pub fn open(
        config: ClientConfig,
        refresh_secret: Option<String>,
        store: Arc<dyn SecretStore>,
    ) -> BcsResult<Self> {
        let http = ReqwestHttpClient::with_timeout(config.request_timeout)
            .map_err(|e| BcsError::Network(NetworkError::from(&e)))?;
        let session = Self::with_transports(
            config,
            refresh_secret,
            store,
            Arc::new(http),
            Arc::new(TungsteniteConnector::new()),
        )?;
        Ok(session)
    }

    /// Open a session over caller-supplied transports.
    pub fn with_transports(
        config: ClientConfig,
        refresh_secret: Option<String>,
        store: Arc<dyn SecretStore>,
        http: Arc<dyn HttpClient>,
        connector: Arc<dyn WsConnector>,
    ) -> Result<Self, AuthError> {
        let credentials = CredentialStore::from_config(store, &config);
        let secret = resolve_secret(&credentials, refresh_secret)?;

        let tokens = Arc::new(TokenManager::new(http.clone(), &config, Some(secret)));
        let rest = RestClient::new(http, tokens.clone(), &config);
        let subscriptions = SubscriptionManager::new(tokens.clone(), connector, &config);

        info!("Session ready for {}", config.http_base);
        Ok(Self {
            config,
            credentials,
            tokens,
            rest,
            subscriptions,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Close every channel, forget the access token and remove the stored
    /// refresh secret.
    pub async fn logout(&self) -> Result<(), StorageError> {
        self.subscriptions.close_all().await;
        self.tokens.set_refresh_secret(None).await;
        let removed = self.credentials.clear()?;
        info!("Logged out, removed {} stored chunks", removed);
        Ok(())
    }

    /// Close every channel. The session stays usable.
    pub async fn close(&self) {
        self.subscriptions.close_all().await;
    }
}

fn resolve_secret(
    credentials: &CredentialStore,
    refresh_secret: Option<String>,
) -> Result<String, AuthError> {
    if let Some(secret) = refresh_secret {
        if let Err(e) = credentials.save(&secret) {
            warn!(
                code = e.error_code(),
                "Refresh secret not persisted, continuing with it in memory: {}", e
            );
        }
        return Ok(secret);
    }

    match credentials.load() {
        Ok(Some(secret)) => Ok(secret),
        Ok(None) => Err(AuthError::NotAuthenticated),
        Err(e) => Err(AuthError::Storage {
            message: e.to_string(),
        }),
    }
}
