//! Unified error type for the crate.

use std::fmt;

use super::auth::AuthError;
use super::category::ErrorCategory;
use super::network::NetworkError;
use super::subscription::SubscriptionError;
use crate::traits::StorageError;

/// Any error surfaced by the session core.
///
/// Most operations return their narrow domain error. `BcsError` exists for
/// code that composes several of them, such as the session facade and the
/// command-line binary.
#[derive(Debug)]
pub enum BcsError {
    /// Transport or resource endpoint failures.
    Network(NetworkError),

    /// Token lifecycle failures.
    Auth(AuthError),

    /// Secure storage backend failures.
    Storage(StorageError),

    /// Subscription channel failures.
    Subscription(SubscriptionError),
}

impl BcsError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            BcsError::Network(NetworkError::HttpStatus { status, .. }) if *status >= 500 => {
                ErrorCategory::Server
            }
            BcsError::Network(_) => ErrorCategory::Network,
            BcsError::Auth(AuthError::Transport { .. }) => ErrorCategory::Network,
            BcsError::Auth(AuthError::Storage { .. }) => ErrorCategory::System,
            BcsError::Auth(_) => ErrorCategory::Auth,
            BcsError::Storage(StorageError::InvalidChunkSize) => ErrorCategory::Configuration,
            BcsError::Storage(_) => ErrorCategory::System,
            BcsError::Subscription(SubscriptionError::Auth(err)) => {
                BcsError::Auth(err.clone()).category()
            }
            BcsError::Subscription(SubscriptionError::InvalidRequest { .. }) => {
                ErrorCategory::Client
            }
            BcsError::Subscription(_) => ErrorCategory::Network,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            BcsError::Network(err) => err.is_retryable(),
            BcsError::Auth(err) => err.is_recoverable(),
            BcsError::Storage(err) => err.is_transient(),
            BcsError::Subscription(err) => err.is_retryable(),
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            BcsError::Network(err) => err.user_message(),
            BcsError::Auth(err) => err.user_message(),
            BcsError::Storage(err) => err.user_message(),
            BcsError::Subscription(err) => err.user_message(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            BcsError::Network(err) => err.error_code(),
            BcsError::Auth(err) => err.error_code(),
            BcsError::Storage(err) => err.error_code(),
            BcsError::Subscription(err) => err.error_code(),
        }
    }

    /// Get the recovery hint for this error.
    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }
}

impl fmt::Display for BcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BcsError::Network(err) => write!(f, "{}", err),
            BcsError::Auth(err) => write!(f, "{}", err),
            BcsError::Storage(err) => write!(f, "{}", err),
            BcsError::Subscription(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for BcsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BcsError::Network(err) => Some(err),
            BcsError::Auth(err) => Some(err),
            BcsError::Storage(err) => Some(err),
            BcsError::Subscription(err) => Some(err),
        }
    }
}

impl From<NetworkError> for BcsError {
    fn from(err: NetworkError) -> Self {
        BcsError::Network(err)
    }
}

impl From<AuthError> for BcsError {
    fn from(err: AuthError) -> Self {
        BcsError::Auth(err)
    }
}

impl From<StorageError> for BcsError {
    fn from(err: StorageError) -> Self {
        BcsError::Storage(err)
    }
}

impl From<SubscriptionError> for BcsError {
    fn from(err: SubscriptionError) -> Self {
        BcsError::Subscription(err)
    }
}
