//! Concrete implementations of the trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`TungsteniteConnector`] - WebSocket connections using tokio-tungstenite
//! - [`FileSecretStore`] - JSON file secret storage
//! - `KeyringSecretStore` - OS keychain storage (feature `keyring-store`)
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockHttpClient`] - Configurable HTTP responses
//! - [`mock::MockWsConnector`] - Frame injection for subscription tests
//! - [`mock::InMemorySecretStore`] - In-memory secret storage

pub mod file_secret_store;
#[cfg(feature = "keyring-store")]
pub mod keyring_store;
pub mod mock;
pub mod reqwest_http;
pub mod tungstenite_ws;

pub use file_secret_store::FileSecretStore;
#[cfg(feature = "keyring-store")]
pub use keyring_store::KeyringSecretStore;
pub use mock::{InMemorySecretStore, MockHttpClient, MockWsConnector};
pub use reqwest_http::ReqwestHttpClient;
pub use tungstenite_ws::TungsteniteConnector;
