//! Authentication: refresh secret persistence and access token lifecycle.
//!
//! - [`CredentialStore`] keeps the long-lived refresh secret in secure
//!   storage, split into chunks
//! - [`TokenManager`] exchanges it for short-lived access tokens and caches
//!   them until expiry

pub mod credential_store;
pub mod token_manager;

pub use credential_store::CredentialStore;
pub use token_manager::{TokenManager, TokenResponse};
