//! Network-related error types.
//!
//! Transport failures and non-200 answers from resource endpoints. The REST
//! layer collapses these into `None` for callers, but they are logged with
//! their error code first.

use std::fmt;

use crate::traits::HttpError;

/// Network-specific error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Connection or TLS failure.
    ConnectionFailed { message: String },

    /// The request did not complete in time.
    Timeout { message: String },

    /// A resource endpoint answered with a status other than 200.
    HttpStatus {
        status: u16,
        path: String,
        body: String,
    },

    /// The body could not be decoded.
    InvalidResponse { message: String },

    /// Anything else the HTTP stack reported.
    Other { message: String },
}

impl NetworkError {
    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::ConnectionFailed { .. } => true,
            NetworkError::Timeout { .. } => true,
            NetworkError::HttpStatus { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            NetworkError::InvalidResponse { .. } => false,
            NetworkError::Other { .. } => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::ConnectionFailed { .. } => {
                "Unable to connect to the broker API.".to_string()
            }
            NetworkError::Timeout { .. } => "The broker API did not answer in time.".to_string(),
            NetworkError::HttpStatus { status, path, .. } => match *status {
                401 => format!("Request to {} was not authorized.", path),
                404 => format!("{} was not found.", path),
                429 => "Too many requests. Please wait a moment and try again.".to_string(),
                500..=599 => "The broker API is experiencing issues.".to_string(),
                _ => format!("Request to {} failed with HTTP {}.", path, status),
            },
            NetworkError::InvalidResponse { .. } => {
                "Received an invalid response from the broker API.".to_string()
            }
            NetworkError::Other { message } => format!("Network error: {}", message),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed { .. } => "E_NET_CONN",
            NetworkError::Timeout { .. } => "E_NET_TIMEOUT",
            NetworkError::HttpStatus { .. } => "E_NET_HTTP",
            NetworkError::InvalidResponse { .. } => "E_NET_INVALID",
            NetworkError::Other { .. } => "E_NET_OTHER",
        }
    }
}

impl From<&HttpError> for NetworkError {
    fn from(err: &HttpError) -> Self {
        match err {
            HttpError::ConnectionFailed(message) => NetworkError::ConnectionFailed {
                message: message.clone(),
            },
            HttpError::Timeout(message) => NetworkError::Timeout {
                message: message.clone(),
            },
            HttpError::InvalidUrl(message) | HttpError::Other(message) => NetworkError::Other {
                message: message.clone(),
            },
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed { message } => {
                write!(f, "Connection failed: {}", message)
            }
            NetworkError::Timeout { message } => write!(f, "Request timeout: {}", message),
            NetworkError::HttpStatus { status, path, body } => {
                write!(f, "HTTP {} for {}: {}", status, path, body)
            }
            NetworkError::InvalidResponse { message } => {
                write!(f, "Invalid response: {}", message)
            }
            NetworkError::Other { message } => write!(f, "Network error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}
