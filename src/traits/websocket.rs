//! WebSocket transport trait abstraction.
//!
//! A connection is split into a writing half ([`WsSink`]) kept by the
//! subscription manager and a reading half ([`WsSource`]) owned by the
//! channel's receive task. Closing the sink ends the source.

use async_trait::async_trait;

use super::http::Headers;

/// WebSocket connection errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsError {
    /// Handshake failed
    ConnectionFailed(String),
    /// Connection is no longer open
    Disconnected,
    /// Failed to send a frame
    SendFailed(String),
    /// Received a frame that is not valid text
    ParseError(String),
    /// Transport error while reading
    Protocol(String),
}

impl std::fmt::Display for WsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WsError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            WsError::Disconnected => write!(f, "Disconnected from server"),
            WsError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            WsError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            WsError::Protocol(msg) => write!(f, "WebSocket error: {}", msg),
        }
    }
}

impl std::error::Error for WsError {}

/// Writing half of an open connection.
#[async_trait]
pub trait WsSink: Send + Sync {
    /// Send a text frame.
    async fn send_text(&mut self, text: String) -> Result<(), WsError>;

    /// Close the connection. The paired [`WsSource`] yields `None` afterwards.
    ///
    /// Closing an already closed connection is not an error.
    async fn close(&mut self) -> Result<(), WsError>;
}

/// Reading half of an open connection.
#[async_trait]
pub trait WsSource: Send {
    /// Wait for the next text frame.
    ///
    /// # Returns
    /// - `Some(Ok(text))` for each data frame, in wire order
    /// - `Some(Err(_))` on a transport error
    /// - `None` once the connection is closed by either side
    async fn next_frame(&mut self) -> Option<Result<String, WsError>>;
}

/// Both halves of a freshly opened connection.
pub struct WsConnection {
    pub sink: Box<dyn WsSink>,
    pub source: Box<dyn WsSource>,
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection").finish_non_exhaustive()
    }
}

/// Opens WebSocket connections.
///
/// # Example
///
/// ```ignore
/// use bcs_trade::traits::{Headers, WsConnector};
///
/// async fn open<C: WsConnector>(connector: &C, token: &str) {
///     let mut headers = Headers::new();
///     headers.insert("Authorization".to_string(), format!("Bearer {}", token));
///     let conn = connector
///         .connect("wss://ws.broker.ru/trade-api-bff-limit/api/v1/limits/ws", &headers)
///         .await;
/// }
/// ```
#[async_trait]
pub trait WsConnector: Send + Sync {
    /// Perform the handshake with the given extra request headers.
    async fn connect(&self, url: &str, headers: &Headers) -> Result<WsConnection, WsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_error_display() {
        assert_eq!(
            WsError::ConnectionFailed("timeout".to_string()).to_string(),
            "Connection failed: timeout"
        );
        assert_eq!(WsError::Disconnected.to_string(), "Disconnected from server");
        assert_eq!(
            WsError::SendFailed("closed".to_string()).to_string(),
            "Send failed: closed"
        );
        assert_eq!(
            WsError::ParseError("binary".to_string()).to_string(),
            "Parse error: binary"
        );
        assert_eq!(
            WsError::Protocol("reset".to_string()).to_string(),
            "WebSocket error: reset"
        );
    }
}
