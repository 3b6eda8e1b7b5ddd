//! Client configuration.
//!
//! Use the builder pattern to customize hosts, storage naming and timing.
//!
//! # Example
//!
//! ```ignore
//! use bcs_trade::config::ClientConfig;
//!
//! let config = ClientConfig::default()
//!     .with_chunk_size(256)
//!     .with_expiry_margin(Duration::from_secs(5));
//! ```

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Default REST host.
pub const DEFAULT_HTTP_BASE: &str = "https://be.broker.ru";
/// Default WebSocket host.
pub const DEFAULT_WS_BASE: &str = "wss://ws.broker.ru";
/// OAuth client id with trading scope.
pub const DEFAULT_CLIENT_ID: &str = "trade-api-write";
/// Secure storage service the refresh secret is filed under.
pub const DEFAULT_STORAGE_SERVICE: &str = "BCSPy";
/// Key prefix for the refresh secret chunks.
pub const DEFAULT_STORAGE_USERNAME: &str = "refresh_token";
/// Characters per stored chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

const TOKEN_PATH: &str = "/trade-api-keycloak/realms/tradeapi/protocol/openid-connect/token";

/// Settings shared by the token manager, REST client and subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST base URL without a trailing slash
    pub http_base: String,
    /// WebSocket base URL without a trailing slash
    pub ws_base: String,
    /// OAuth client id sent with the refresh grant
    pub client_id: String,
    /// Secure storage service name
    pub storage_service: String,
    /// Secure storage key prefix; chunk `i` is stored as `{prefix}{i}`
    pub storage_username: String,
    /// Characters per stored chunk (default: 500)
    pub chunk_size: usize,
    /// Subtracted from `expires_in` when caching an access token (default: 0)
    pub expiry_margin: Duration,
    /// Timeout for every REST and token request (default: 30s)
    pub request_timeout: Duration,
    /// How long `unsubscribe` waits for a receive task to finish (default: 5s)
    pub shutdown_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http_base: DEFAULT_HTTP_BASE.to_string(),
            ws_base: DEFAULT_WS_BASE.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            storage_service: DEFAULT_STORAGE_SERVICE.to_string(),
            storage_username: DEFAULT_STORAGE_USERNAME.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            expiry_margin: Duration::ZERO,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Create a new ClientConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the REST base URL.
    pub fn with_http_base(mut self, base: impl Into<String>) -> Self {
        self.http_base = trim_base(base.into());
        self
    }

    /// Set the WebSocket base URL.
    pub fn with_ws_base(mut self, base: impl Into<String>) -> Self {
        self.ws_base = trim_base(base.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the secure storage service and key prefix.
    pub fn with_storage(mut self, service: impl Into<String>, username: impl Into<String>) -> Self {
        self.storage_service = service.into();
        self.storage_username = username.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Refresh-token grant endpoint.
    pub fn token_url(&self) -> String {
        format!("{}{}", self.http_base, TOKEN_PATH)
    }

    /// Absolute REST URL for `path`.
    pub fn http_url(&self, path: &str) -> String {
        format!("{}{}", self.http_base, path)
    }

    /// Absolute WebSocket URL for `path`.
    pub fn ws_url(&self, path: &str) -> String {
        format!("{}{}", self.ws_base, path)
    }

    /// Create config from `BCS_*` environment variables over the defaults.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(base) = lookup("BCS_HTTP_BASE") {
            config = config.with_http_base(base);
        }
        if let Some(base) = lookup("BCS_WS_BASE") {
            config = config.with_ws_base(base);
        }
        if let Some(client_id) = lookup("BCS_CLIENT_ID") {
            config.client_id = client_id;
        }
        if let Some(service) = lookup("BCS_STORAGE_SERVICE") {
            config.storage_service = service;
        }
        if let Some(username) = lookup("BCS_STORAGE_USERNAME") {
            config.storage_username = username;
        }
        if let Some(size) = parse_var::<usize>(&lookup, "BCS_CHUNK_SIZE") {
            if size == 0 {
                warn!("Ignoring BCS_CHUNK_SIZE=0");
            } else {
                config.chunk_size = size;
            }
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "BCS_EXPIRY_MARGIN_SECS") {
            config.expiry_margin = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "BCS_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        config
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}
