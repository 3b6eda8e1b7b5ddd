//! Error category classification.
//!
//! Categories group the domain errors so callers can decide whether to
//! retry, re-authenticate or give up without matching on every variant.

use std::fmt;

/// High-level classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, TLS or timeout failures talking to the broker.
    Network,

    /// The authorization server refused the refresh secret, or none is stored.
    Auth,

    /// The broker answered with a 5xx status.
    Server,

    /// Misuse of the API by the caller (invalid request for a channel, etc.).
    Client,

    /// Secure storage or filesystem problems on the local machine.
    System,

    /// Invalid configuration values.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Short label suitable for structured logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::System => "system",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Suggested next step for an operator.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check connectivity to the broker and try again",
            ErrorCategory::Auth => "Issue a new refresh token in the broker cabinet and log in again",
            ErrorCategory::Server => "The broker API is having trouble, try again later",
            ErrorCategory::Client => "Check the arguments passed to the call",
            ErrorCategory::System => "Check access to the secure storage backend",
            ErrorCategory::Configuration => "Check the BCS_* environment variables",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
