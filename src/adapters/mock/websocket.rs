//! Mock WebSocket connector for testing.
//!
//! Every successful `connect` creates a [`MockWsHandle`] the test can use to
//! inspect frames written by the code under test, inject frames from the
//! "server" and simulate a remote close.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

use super::lock;
use crate::traits::{Headers, WsConnection, WsConnector, WsError, WsSink, WsSource};

/// Mock WebSocket connector.
///
/// # Example
///
/// ```ignore
/// use bcs_trade::adapters::mock::MockWsConnector;
///
/// let connector = MockWsConnector::new();
/// // ... subscribe through a manager built on `connector.clone()` ...
/// let conn = connector.last_connection().unwrap();
/// conn.inject_json(&serde_json::json!({"ticker": "SBER"}));
/// assert_eq!(connector.connect_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockWsConnector {
    connections: Arc<Mutex<Vec<MockWsHandle>>>,
    attempts: Arc<Mutex<Vec<String>>>,
    connect_should_fail: Arc<AtomicBool>,
}

impl MockWsConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure whether the handshake should fail.
    pub fn set_connect_should_fail(&self, should_fail: bool) {
        self.connect_should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Number of successful connections opened so far.
    pub fn connect_count(&self) -> usize {
        lock(&self.connections).len()
    }

    /// URLs of every connection attempt, including failed ones.
    pub fn attempted_urls(&self) -> Vec<String> {
        lock(&self.attempts).clone()
    }

    /// All connections opened so far, oldest first.
    pub fn connections(&self) -> Vec<MockWsHandle> {
        lock(&self.connections).clone()
    }

    /// The most recently opened connection.
    pub fn last_connection(&self) -> Option<MockWsHandle> {
        lock(&self.connections).last().cloned()
    }

    /// Connections opened to `url`, oldest first.
    pub fn connections_to(&self, url: &str) -> Vec<MockWsHandle> {
        lock(&self.connections)
            .iter()
            .filter(|conn| conn.url() == url)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WsConnector for MockWsConnector {
    async fn connect(&self, url: &str, headers: &Headers) -> Result<WsConnection, WsError> {
        lock(&self.attempts).push(url.to_string());

        if self.connect_should_fail.load(Ordering::SeqCst) {
            return Err(WsError::ConnectionFailed("Mock connect failure".to_string()));
        }

        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        let handle = MockWsHandle {
            inner: Arc::new(HandleInner {
                url: url.to_string(),
                headers: headers.clone(),
                sent: Mutex::new(Vec::new()),
                incoming_tx,
                closed_tx,
                closed_by_client: AtomicBool::new(false),
                send_should_fail: AtomicBool::new(false),
            }),
        };
        lock(&self.connections).push(handle.clone());

        Ok(WsConnection {
            sink: Box::new(MockSink {
                inner: handle.inner.clone(),
            }),
            source: Box::new(MockSource {
                incoming_rx,
                closed_rx,
            }),
        })
    }
}

#[derive(Debug)]
struct HandleInner {
    url: String,
    headers: Headers,
    sent: Mutex<Vec<String>>,
    incoming_tx: mpsc::UnboundedSender<Result<String, WsError>>,
    closed_tx: watch::Sender<bool>,
    closed_by_client: AtomicBool,
    send_should_fail: AtomicBool,
}

/// Test-side view of one mock connection.
#[derive(Debug, Clone)]
pub struct MockWsHandle {
    inner: Arc<HandleInner>,
}

impl MockWsHandle {
    /// URL passed to `connect`.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Handshake header value, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).map(String::as_str)
    }

    /// Text frames sent by the client, in order.
    pub fn sent_frames(&self) -> Vec<String> {
        lock(&self.inner.sent).clone()
    }

    /// Sent frames parsed as JSON. Frames that are not JSON are skipped.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent_frames()
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    /// Deliver a raw text frame to the client.
    pub fn inject_text(&self, text: &str) {
        let _ = self.inner.incoming_tx.send(Ok(text.to_string()));
    }

    /// Deliver a JSON frame to the client.
    pub fn inject_json(&self, value: &serde_json::Value) {
        self.inject_text(&value.to_string());
    }

    /// Deliver a transport error to the client.
    pub fn inject_error(&self, err: WsError) {
        let _ = self.inner.incoming_tx.send(Err(err));
    }

    /// Close the connection from the server side.
    pub fn close_from_server(&self) {
        self.inner.closed_tx.send_replace(true);
    }

    /// Configure whether client sends should fail.
    pub fn set_send_should_fail(&self, should_fail: bool) {
        self.inner.send_should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// True once either side closed the connection.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed_tx.borrow()
    }

    /// True if the client called `close`.
    pub fn closed_by_client(&self) -> bool {
        self.inner.closed_by_client.load(Ordering::SeqCst)
    }
}

struct MockSink {
    inner: Arc<HandleInner>,
}

#[async_trait]
impl WsSink for MockSink {
    async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        if *self.inner.closed_tx.borrow() {
            return Err(WsError::Disconnected);
        }
        if self.inner.send_should_fail.load(Ordering::SeqCst) {
            return Err(WsError::SendFailed("Mock send failure".to_string()));
        }
        lock(&self.inner.sent).push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WsError> {
        self.inner.closed_by_client.store(true, Ordering::SeqCst);
        self.inner.closed_tx.send_replace(true);
        Ok(())
    }
}

struct MockSource {
    incoming_rx: mpsc::UnboundedReceiver<Result<String, WsError>>,
    closed_rx: watch::Receiver<bool>,
}

#[async_trait]
impl WsSource for MockSource {
    async fn next_frame(&mut self) -> Option<Result<String, WsError>> {
        // Frames injected before a close are still delivered.
        tokio::select! {
            biased;
            frame = self.incoming_rx.recv() => frame,
            _ = self.closed_rx.wait_for(|closed| *closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_records_url_and_headers() {
        let connector = MockWsConnector::new();
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), "Bearer t".to_string());

        connector.connect("wss://example/ws", &headers).await.unwrap();

        let conn = connector.last_connection().unwrap();
        assert_eq!(conn.url(), "wss://example/ws");
        assert_eq!(conn.header("Authorization"), Some("Bearer t"));
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let connector = MockWsConnector::new();
        connector.set_connect_should_fail(true);

        let result = connector.connect("wss://example/ws", &Headers::new()).await;
        assert!(matches!(result, Err(WsError::ConnectionFailed(_))));
        assert_eq!(connector.connect_count(), 0);
        assert_eq!(connector.attempted_urls(), vec!["wss://example/ws".to_string()]);
    }

    #[tokio::test]
    async fn test_frames_roundtrip_and_close() {
        let connector = MockWsConnector::new();
        let WsConnection {
            mut sink,
            mut source,
        } = connector.connect("wss://example/ws", &Headers::new()).await.unwrap();
        let conn = connector.last_connection().unwrap();

        sink.send_text("{\"a\":1}".to_string()).await.unwrap();
        assert_eq!(conn.sent_json(), vec![serde_json::json!({"a": 1})]);

        conn.inject_text("hello");
        assert_eq!(source.next_frame().await, Some(Ok("hello".to_string())));

        sink.close().await.unwrap();
        assert!(conn.is_closed());
        assert!(conn.closed_by_client());
        assert_eq!(source.next_frame().await, None);
        assert_eq!(
            sink.send_text("late".to_string()).await,
            Err(WsError::Disconnected)
        );
    }

    #[tokio::test]
    async fn test_frames_before_server_close_are_delivered() {
        let connector = MockWsConnector::new();
        let WsConnection { mut source, .. } =
            connector.connect("wss://example/ws", &Headers::new()).await.unwrap();
        let conn = connector.last_connection().unwrap();

        conn.inject_text("1");
        conn.inject_text("2");
        conn.close_from_server();

        assert_eq!(source.next_frame().await, Some(Ok("1".to_string())));
        assert_eq!(source.next_frame().await, Some(Ok("2".to_string())));
        assert_eq!(source.next_frame().await, None);
        assert!(!conn.closed_by_client());
    }
}
