//! Subscription channel manager.
//!
//! Each of the nine channels owns at most one WebSocket connection, a
//! dedicated receive task and an [`EventBus`] of JSON frames. Channels are
//! independent: a slow callback stalls only its own channel.
//!
//! # Lifecycle
//!
//! - `subscribe` connects on first use and otherwise reuses the open
//!   connection, sending the filter frame (if any) over it
//! - the receive task exits on remote close, transport error, a non-JSON
//!   frame or a failing callback; the slot is cleared but the bus keeps its
//!   callbacks for the next `subscribe`
//! - `unsubscribe` closes the connection and joins the receive task

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::channel::Channel;
use super::request::{Instrument, MarketDataRequest, SubscribeType};
use crate::auth::TokenManager;
use crate::config::ClientConfig;
use crate::error::SubscriptionError;
use crate::events::EventBus;
use crate::traits::{WsConnection, WsConnector, WsSink, WsSource};

type SharedConnection = Arc<Mutex<Option<ChannelConnection>>>;

struct ChannelConnection {
    sink: Box<dyn WsSink>,
    task: JoinHandle<()>,
    generation: u64,
}

impl ChannelConnection {
    fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }
}

struct ChannelSlot {
    bus: Arc<EventBus<Value>>,
    conn: SharedConnection,
}

impl ChannelSlot {
    fn new() -> Self {
        Self {
            bus: Arc::new(EventBus::new()),
            conn: Arc::new(Mutex::new(None)),
        }
    }
}

/// Owns the per-channel WebSocket connections.
pub struct SubscriptionManager {
    tokens: Arc<TokenManager>,
    connector: Arc<dyn WsConnector>,
    config: ClientConfig,
    slots: [ChannelSlot; 9],
    /// Tags connections so a finished receive task never clears a newer one
    next_generation: AtomicU64,
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("ws_base", &self.config.ws_base)
            .finish_non_exhaustive()
    }
}

impl SubscriptionManager {
    pub fn new(
        tokens: Arc<TokenManager>,
        connector: Arc<dyn WsConnector>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            tokens,
            connector,
            config: config.clone(),
            slots: Channel::ALL.map(|_| ChannelSlot::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    fn slot(&self, channel: Channel) -> &ChannelSlot {
        &self.slots[channel.index()]
    }

    /// Event bus receiving every JSON frame of `channel`.
    pub fn events(&self, channel: Channel) -> Arc<EventBus<Value>> {
        self.slot(channel).bus.clone()
    }

    /// True while `channel` has a connection with a running receive task.
    pub async fn is_connected(&self, channel: Channel) -> bool {
        self.slot(channel)
            .conn
            .lock()
            .await
            .as_ref()
            .is_some_and(ChannelConnection::is_alive)
    }

    /// Open `channel` if needed and send `request` over it.
    ///
    /// Market-data channels accept a filter; the others must be given `None`.
    /// Failures are logged before being returned.
    pub async fn subscribe(
        &self,
        channel: Channel,
        request: Option<MarketDataRequest>,
    ) -> Result<(), SubscriptionError> {
        let result = self.try_subscribe(channel, request).await;
        if let Err(e) = &result {
            error!(code = e.error_code(), "Subscription to {} failed: {}", channel, e);
        }
        result
    }

    async fn try_subscribe(
        &self,
        channel: Channel,
        request: Option<MarketDataRequest>,
    ) -> Result<(), SubscriptionError> {
        validate_request(channel, request.as_ref())?;
        let frame = request
            .map(|request| request.to_frame())
            .transpose()
            .map_err(|e| SubscriptionError::InvalidRequest {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let slot = self.slot(channel);
        // Held across connect and send so concurrent subscribers share one
        // connection and their frames are not interleaved.
        let mut guard = slot.conn.lock().await;

        let alive = guard.as_ref().is_some_and(ChannelConnection::is_alive);
        if !alive {
            *guard = Some(self.connect(channel, slot).await?);
        } else {
            debug!("Reusing open {} connection", channel);
        }

        if let (Some(frame), Some(conn)) = (frame, guard.as_mut()) {
            debug!("Sending {} filter: {}", channel, frame);
            conn.sink
                .send_text(frame)
                .await
                .map_err(|e| SubscriptionError::SendFailed {
                    channel: channel.to_string(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    async fn connect(
        &self,
        channel: Channel,
        slot: &ChannelSlot,
    ) -> Result<ChannelConnection, SubscriptionError> {
        let headers = self.tokens.bearer_headers().await?;
        let url = self.config.ws_url(channel.path());

        info!("Opening {} stream at {}", channel, url);
        let WsConnection { sink, source } =
            self.connector
                .connect(&url, &headers)
                .await
                .map_err(|e| SubscriptionError::ConnectFailed {
                    channel: channel.to_string(),
                    message: e.to_string(),
                })?;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn(receive_loop(
            channel,
            source,
            slot.bus.clone(),
            slot.conn.clone(),
            generation,
        ));

        Ok(ChannelConnection {
            sink,
            task,
            generation,
        })
    }

    /// Close `channel` and wait for its receive task to finish.
    ///
    /// Returns false, doing nothing, if the channel was not connected. The
    /// channel's callbacks stay registered.
    pub async fn unsubscribe(&self, channel: Channel) -> bool {
        let taken = self.slot(channel).conn.lock().await.take();
        let Some(ChannelConnection { mut sink, mut task, .. }) = taken else {
            debug!("{} is not connected, nothing to close", channel);
            return false;
        };

        info!("Closing {} stream", channel);
        if let Err(e) = sink.close().await {
            debug!("Close of {} stream reported: {}", channel, e);
        }
        drop(sink);

        match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => debug!("{} receive task finished", channel),
            Ok(Err(e)) => warn!("{} receive task ended abnormally: {}", channel, e),
            Err(_) => {
                warn!(
                    "{} receive task did not stop within {:?}, aborting",
                    channel, self.config.shutdown_timeout
                );
                task.abort();
            }
        }
        true
    }

    /// Unsubscribe every channel.
    pub async fn close_all(&self) {
        futures::future::join_all(Channel::ALL.map(|channel| self.unsubscribe(channel))).await;
    }

    pub async fn subscribe_limits(&self) -> Result<(), SubscriptionError> {
        self.subscribe(Channel::Limits, None).await
    }

    pub async fn subscribe_portfolio(&self) -> Result<(), SubscriptionError> {
        self.subscribe(Channel::Portfolio, None).await
    }

    pub async fn subscribe_executions(&self) -> Result<(), SubscriptionError> {
        self.subscribe(Channel::Executions, None).await
    }

    pub async fn subscribe_transactions(&self) -> Result<(), SubscriptionError> {
        self.subscribe(Channel::Transactions, None).await
    }

    pub async fn subscribe_margins(&self) -> Result<(), SubscriptionError> {
        self.subscribe(Channel::Margins, None).await
    }

    pub async fn subscribe_quotes(
        &self,
        subscribe_type: SubscribeType,
        instruments: Vec<Instrument>,
    ) -> Result<(), SubscriptionError> {
        let request = MarketDataRequest::quotes(subscribe_type, instruments);
        self.subscribe(Channel::Quotes, Some(request)).await
    }

    pub async fn subscribe_last_candles(
        &self,
        subscribe_type: SubscribeType,
        instruments: Vec<Instrument>,
        time_frame: &str,
    ) -> Result<(), SubscriptionError> {
        let request = MarketDataRequest::last_candle(subscribe_type, instruments, time_frame);
        self.subscribe(Channel::LastCandle, Some(request)).await
    }

    /// `depth` is forwarded as given (the broker serves 1..=20); `None` requests 20.
    pub async fn subscribe_order_book(
        &self,
        subscribe_type: SubscribeType,
        instruments: Vec<Instrument>,
        depth: Option<u8>,
    ) -> Result<(), SubscriptionError> {
        let request = MarketDataRequest::order_book(subscribe_type, instruments, depth);
        self.subscribe(Channel::OrderBook, Some(request)).await
    }

    pub async fn subscribe_trades(
        &self,
        subscribe_type: SubscribeType,
        instruments: Vec<Instrument>,
    ) -> Result<(), SubscriptionError> {
        let request = MarketDataRequest::trades(subscribe_type, instruments);
        self.subscribe(Channel::Trades, Some(request)).await
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        for slot in &self.slots {
            if let Ok(mut guard) = slot.conn.try_lock() {
                if let Some(conn) = guard.take() {
                    conn.task.abort();
                }
            }
        }
    }
}

fn validate_request(
    channel: Channel,
    request: Option<&MarketDataRequest>,
) -> Result<(), SubscriptionError> {
    let invalid = |reason: String| SubscriptionError::InvalidRequest {
        channel: channel.to_string(),
        reason,
    };
    match (channel.data_type(), request) {
        (None, Some(_)) => Err(invalid("channel does not accept a filter".to_string())),
        (Some(expected), Some(request)) if request.data_type != expected => Err(invalid(format!(
            "dataType {} does not match channel dataType {}",
            u8::from(request.data_type),
            u8::from(expected)
        ))),
        _ => Ok(()),
    }
}

/// Deliver frames from `source` to `bus` until the stream ends or fails.
async fn receive_loop(
    channel: Channel,
    mut source: Box<dyn WsSource>,
    bus: Arc<EventBus<Value>>,
    slot: SharedConnection,
    generation: u64,
) {
    loop {
        let text = match source.next_frame().await {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                error!("{} stream failed: {}", channel, e);
                break;
            }
            None => {
                info!("{} stream closed", channel);
                break;
            }
        };

        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                error!("{} frame is not valid JSON: {}", channel, e);
                break;
            }
        };

        debug!(channel = channel.name(), "Frame received");
        match std::panic::catch_unwind(AssertUnwindSafe(|| bus.trigger(&value))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{} callback failed, ending subscription: {}", channel, e);
                break;
            }
            Err(_) => {
                error!("{} callback panicked, ending subscription", channel);
                break;
            }
        }
    }
    drop(source);

    let mut guard = slot.lock().await;
    if guard.as_ref().is_some_and(|conn| conn.generation == generation) {
        *guard = None;
        debug!("{} connection released", channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse, MockWsConnector};
    use crate::error::AuthError;
    use serde_json::json;
    use std::time::Duration;

    fn manager_with(http: &MockHttpClient, ws: &MockWsConnector) -> SubscriptionManager {
        let config = ClientConfig::default()
            .with_http_base("https://rest.test")
            .with_ws_base("wss://ws.test")
            .with_shutdown_timeout(Duration::from_secs(1));
        http.set_response(
            &config.token_url(),
            MockResponse::json(200, json!({"access_token": "jwt", "expires_in": 3600})),
        );
        let tokens = Arc::new(TokenManager::new(
            Arc::new(http.clone()),
            &config,
            Some("secret".to_string()),
        ));
        SubscriptionManager::new(tokens, Arc::new(ws.clone()), &config)
    }

    #[test]
    fn test_validate_request() {
        let request = MarketDataRequest::quotes(SubscribeType::Subscribe, vec![]);
        assert!(validate_request(Channel::Quotes, Some(&request)).is_ok());
        assert!(validate_request(Channel::Quotes, None).is_ok());
        assert!(validate_request(Channel::Limits, None).is_ok());
        assert!(matches!(
            validate_request(Channel::Trades, Some(&request)),
            Err(SubscriptionError::InvalidRequest { .. })
        ));
        assert!(matches!(
            validate_request(Channel::Portfolio, Some(&request)),
            Err(SubscriptionError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_handshake_url_and_bearer() {
        let http = MockHttpClient::new();
        let ws = MockWsConnector::new();
        let manager = manager_with(&http, &ws);

        manager.subscribe_portfolio().await.unwrap();

        let conn = ws.last_connection().unwrap();
        assert_eq!(
            conn.url(),
            "wss://ws.test/trade-api-bff-portfolio/api/v1/portfolio/ws"
        );
        assert_eq!(conn.header("Authorization"), Some("Bearer jwt"));
        assert!(conn.sent_frames().is_empty());
        assert!(manager.is_connected(Channel::Portfolio).await);
        assert!(!manager.is_connected(Channel::Limits).await);
    }

    #[tokio::test]
    async fn test_invalid_request_does_not_connect() {
        let http = MockHttpClient::new();
        let ws = MockWsConnector::new();
        let manager = manager_with(&http, &ws);

        let request = MarketDataRequest::trades(SubscribeType::Subscribe, vec![]);
        let err = manager
            .subscribe(Channel::Quotes, Some(request))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "E_SUB_REQUEST");
        assert!(ws.attempted_urls().is_empty());
    }

    #[tokio::test]
    async fn test_token_failure_surfaces_auth_error() {
        let http = MockHttpClient::new();
        let ws = MockWsConnector::new();
        let manager = manager_with(&http, &ws);
        http.set_response(
            &ClientConfig::default().with_http_base("https://rest.test").token_url(),
            MockResponse::text(401, "unauthorized"),
        );

        let err = manager.subscribe_limits().await.unwrap_err();
        assert!(matches!(
            err,
            SubscriptionError::Auth(AuthError::Refused { status: 401, .. })
        ));
        assert!(ws.attempted_urls().is_empty());
        assert!(!manager.is_connected(Channel::Limits).await);
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_channel_disconnected() {
        let http = MockHttpClient::new();
        let ws = MockWsConnector::new();
        ws.set_connect_should_fail(true);
        let manager = manager_with(&http, &ws);

        let err = manager.subscribe_margins().await.unwrap_err();
        assert_eq!(err.channel(), Some("margins"));
        assert!(!manager.is_connected(Channel::Margins).await);

        ws.set_connect_should_fail(false);
        manager.subscribe_margins().await.unwrap();
        assert!(manager.is_connected(Channel::Margins).await);
    }

    #[tokio::test]
    async fn test_send_failure_reported() {
        let http = MockHttpClient::new();
        let ws = MockWsConnector::new();
        let manager = manager_with(&http, &ws);
        let sber = vec![Instrument::new("TQBR", "SBER")];

        manager
            .subscribe_trades(SubscribeType::Subscribe, sber.clone())
            .await
            .unwrap();
        ws.last_connection().unwrap().set_send_should_fail(true);

        let err = manager
            .subscribe_trades(SubscribeType::Subscribe, sber)
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::SendFailed { .. }));
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_and_joins() {
        let http = MockHttpClient::new();
        let ws = MockWsConnector::new();
        let manager = manager_with(&http, &ws);

        manager.subscribe_executions().await.unwrap();
        let conn = ws.last_connection().unwrap();

        assert!(manager.unsubscribe(Channel::Executions).await);
        assert!(conn.closed_by_client());
        assert!(!manager.is_connected(Channel::Executions).await);
        assert!(!manager.unsubscribe(Channel::Executions).await);
    }

    #[tokio::test]
    async fn test_close_all() {
        let http = MockHttpClient::new();
        let ws = MockWsConnector::new();
        let manager = manager_with(&http, &ws);

        manager.subscribe_limits().await.unwrap();
        manager.subscribe_transactions().await.unwrap();
        manager.close_all().await;

        assert!(ws.connections().iter().all(|conn| conn.closed_by_client()));
        for channel in Channel::ALL {
            assert!(!manager.is_connected(channel).await);
        }
    }
}
