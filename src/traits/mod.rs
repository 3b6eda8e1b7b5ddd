//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP operations (GET, JSON POST, form POST)
//! - [`SecretStore`] - Secure `get/set/delete(service, key)` storage
//! - [`WsConnector`] - Opens WebSocket connections split into [`WsSink`] and [`WsSource`]

pub mod http;
pub mod secret_store;
pub mod websocket;

pub use http::{Headers, HttpClient, HttpError, Response};
pub use secret_store::{SecretStore, StorageError};
pub use websocket::{WsConnection, WsConnector, WsError, WsSink, WsSource};
