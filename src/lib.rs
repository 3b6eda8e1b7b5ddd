//! Session and subscription core for the BCS trade API.
//!
//! - [`auth`]: chunked refresh-secret storage and the access token cache
//! - [`rest`]: REST endpoints with uniform response normalization
//! - [`subscriptions`]: nine independent WebSocket channels, each feeding an
//!   [`events::EventBus`]
//! - [`session`]: [`session::BcsSession`] ties them together
//!
//! Transports and secure storage sit behind the seams in [`traits`], with
//! production and mock implementations in [`adapters`].

pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod rest;
pub mod session;
pub mod subscriptions;
pub mod traits;

pub use config::ClientConfig;
pub use error::{BcsError, BcsResult};
pub use session::BcsSession;
