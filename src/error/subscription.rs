//! Subscription channel error types.

use std::fmt;

use super::auth::AuthError;

/// Failures while opening or feeding a subscription channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// No access token could be obtained for the handshake.
    Auth(AuthError),

    /// The WebSocket handshake failed.
    ConnectFailed { channel: String, message: String },

    /// A control frame could not be written to the open connection.
    SendFailed { channel: String, message: String },

    /// The filter request does not fit the channel.
    InvalidRequest { channel: String, reason: String },
}

impl SubscriptionError {
    /// Name of the channel the error belongs to, if any.
    pub fn channel(&self) -> Option<&str> {
        match self {
            SubscriptionError::Auth(_) => None,
            SubscriptionError::ConnectFailed { channel, .. }
            | SubscriptionError::SendFailed { channel, .. }
            | SubscriptionError::InvalidRequest { channel, .. } => Some(channel),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            SubscriptionError::Auth(err) => err.is_recoverable(),
            SubscriptionError::ConnectFailed { .. } | SubscriptionError::SendFailed { .. } => true,
            SubscriptionError::InvalidRequest { .. } => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            SubscriptionError::Auth(err) => err.user_message(),
            SubscriptionError::ConnectFailed { channel, .. } => {
                format!("Could not open the {} stream.", channel)
            }
            SubscriptionError::SendFailed { channel, .. } => {
                format!("Could not update the {} subscription.", channel)
            }
            SubscriptionError::InvalidRequest { channel, reason } => {
                format!("Invalid {} subscription: {}", channel, reason)
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            SubscriptionError::Auth(err) => err.error_code(),
            SubscriptionError::ConnectFailed { .. } => "E_SUB_CONNECT",
            SubscriptionError::SendFailed { .. } => "E_SUB_SEND",
            SubscriptionError::InvalidRequest { .. } => "E_SUB_REQUEST",
        }
    }
}

impl From<AuthError> for SubscriptionError {
    fn from(err: AuthError) -> Self {
        SubscriptionError::Auth(err)
    }
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::Auth(err) => write!(f, "{}", err),
            SubscriptionError::ConnectFailed { channel, message } => {
                write!(f, "{}: connection failed: {}", channel, message)
            }
            SubscriptionError::SendFailed { channel, message } => {
                write!(f, "{}: send failed: {}", channel, message)
            }
            SubscriptionError::InvalidRequest { channel, reason } => {
                write!(f, "{}: invalid request: {}", channel, reason)
            }
        }
    }
}

impl std::error::Error for SubscriptionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubscriptionError::Auth(err) => Some(err),
            _ => None,
        }
    }
}
