//! tokio-tungstenite WebSocket adapter.
//!
//! Each connection is driven by a pump task that owns the socket: it
//! forwards text frames to the [`WsSource`] half, answers pings and writes
//! frames queued by the [`WsSink`] half, reporting each write result back to
//! the sender. Closing the sink, or a failed write, makes the pump exit, which
//! ends the source.

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info};

use crate::traits::{Headers, WsConnection, WsConnector, WsError, WsSink, WsSource};

/// Frames queued before the pump applies backpressure to readers.
const INCOMING_BUFFER: usize = 256;
const OUTGOING_BUFFER: usize = 32;

enum Outgoing {
    Text {
        text: String,
        ack: oneshot::Sender<Result<(), WsError>>,
    },
    Close,
}

/// Production [`WsConnector`] backed by tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WsConnector for TungsteniteConnector {
    async fn connect(&self, url: &str, headers: &Headers) -> Result<WsConnection, WsError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| WsError::ConnectionFailed(format!("header {}: {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| WsError::ConnectionFailed(format!("header {}: {}", key, e)))?;
            request.headers_mut().insert(name, value);
        }

        let (socket, _) = connect_async(request)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        info!("Connected to WebSocket server at {}", url);

        let (incoming_tx, incoming_rx) = mpsc::channel(INCOMING_BUFFER);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_BUFFER);

        let label = url.to_string();
        let (ws_sink, ws_stream) = socket.split();
        let pump = tokio::spawn(async move {
            run_pump(label, ws_sink, ws_stream, incoming_tx, outgoing_rx).await;
        });

        Ok(WsConnection {
            sink: Box::new(TungsteniteSink { outgoing_tx }),
            source: Box::new(TungsteniteSource { incoming_rx, pump }),
        })
    }
}

struct TungsteniteSink {
    outgoing_tx: mpsc::Sender<Outgoing>,
}

#[async_trait]
impl WsSink for TungsteniteSink {
    async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        let (ack, written) = oneshot::channel();
        self.outgoing_tx
            .send(Outgoing::Text { text, ack })
            .await
            .map_err(|_| WsError::Disconnected)?;
        // A dropped ack means the pump stopped before writing.
        written.await.map_err(|_| WsError::Disconnected)?
    }

    async fn close(&mut self) -> Result<(), WsError> {
        // The pump may already be gone after a remote close.
        let _ = self.outgoing_tx.send(Outgoing::Close).await;
        Ok(())
    }
}

struct TungsteniteSource {
    incoming_rx: mpsc::Receiver<Result<String, WsError>>,
    pump: JoinHandle<()>,
}

#[async_trait]
impl WsSource for TungsteniteSource {
    async fn next_frame(&mut self) -> Option<Result<String, WsError>> {
        self.incoming_rx.recv().await
    }
}

impl Drop for TungsteniteSource {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn run_pump<Si, St>(
    url: String,
    mut ws_sink: Si,
    mut ws_stream: St,
    incoming_tx: mpsc::Sender<Result<String, WsError>>,
    mut outgoing_rx: mpsc::Receiver<Outgoing>,
) where
    Si: Sink<Message, Error = tungstenite::Error> + Unpin,
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if incoming_tx.send(Ok(text)).await.is_err() {
                            debug!("Reader for {} dropped, stopping pump", url);
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let frame = String::from_utf8(data)
                            .map_err(|e| WsError::ParseError(e.to_string()));
                        if incoming_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        debug!("Received ping, sending pong");
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Received close frame from {}: {:?}", url, frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error on {}: {}", url, e);
                        let _ = incoming_tx.send(Err(WsError::Protocol(e.to_string()))).await;
                        break;
                    }
                    None => {
                        info!("WebSocket stream {} ended", url);
                        break;
                    }
                }
            }
            cmd = outgoing_rx.recv() => {
                match cmd {
                    Some(Outgoing::Text { text, ack }) => {
                        debug!("Sending frame to {}: {}", url, text);
                        match ws_sink.send(Message::Text(text)).await {
                            Ok(()) => {
                                let _ = ack.send(Ok(()));
                            }
                            Err(e) => {
                                error!("Failed to send frame to {}: {}", url, e);
                                let _ = ack.send(Err(WsError::SendFailed(e.to_string())));
                                break;
                            }
                        }
                    }
                    Some(Outgoing::Close) | None => {
                        debug!("Closing connection to {}", url);
                        let _ = ws_sink.close().await;
                        break;
                    }
                }
            }
        }
    }

    debug!("Pump for {} finished", url);
}
