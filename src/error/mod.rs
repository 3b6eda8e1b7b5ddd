//! Error handling for the session core.
//!
//! - **Domain errors**: [`AuthError`], [`NetworkError`], [`SubscriptionError`]
//!   plus the storage seam's [`StorageError`](crate::traits::StorageError)
//! - **Categories**: [`ErrorCategory`] drives retry and re-auth decisions
//! - **Unified type**: [`BcsError`] with `From` impls for every domain error
//!
//! # Error Categories
//!
//! | Category | Description | Retryable |
//! |----------|-------------|-----------|
//! | Network | Connection, TLS, timeout | Yes |
//! | Auth | Refresh secret missing or refused | No |
//! | Server | Broker 5xx | Yes |
//! | Client | Invalid call arguments | No |
//! | System | Secure storage failures | Sometimes |
//! | Configuration | Invalid settings | No |

mod auth;
mod bcs_error;
mod category;
mod network;
mod subscription;

pub use auth::AuthError;
pub use bcs_error::BcsError;
pub use category::ErrorCategory;
pub use network::NetworkError;
pub use subscription::SubscriptionError;

/// Type alias for Results using [`BcsError`].
pub type BcsResult<T> = Result<T, BcsError>;
