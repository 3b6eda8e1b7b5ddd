//! Mock implementations for testing.
//!
//! Test doubles for every trait seam, usable from unit tests and from
//! integration tests under `tests/`.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable and queued responses
//! - [`MockWsConnector`] - WebSocket connector with frame injection
//! - [`InMemorySecretStore`] - In-memory secure storage with failure toggles

pub mod http;
pub mod secret_store;
pub mod websocket;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use secret_store::InMemorySecretStore;
pub use websocket::{MockWsConnector, MockWsHandle};

use std::sync::{Mutex, MutexGuard};

/// Lock a mock's state, recovering from a panic in another test thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
