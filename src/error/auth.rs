//! Authentication error types.
//!
//! Errors produced while turning the long-lived refresh secret into a
//! short-lived access token.

use std::fmt;

/// Token lifecycle failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No refresh secret is available (not passed in and not stored).
    NotAuthenticated,

    /// The token endpoint could not be reached (connection, TLS, timeout).
    Transport { message: String },

    /// The token endpoint answered with a non-200 status.
    Refused { status: u16, body: String },

    /// The token endpoint answered 200 but the body was not a token.
    InvalidResponse { message: String },

    /// Loading the refresh secret from secure storage failed.
    Storage { message: String },
}

impl AuthError {
    /// True when the refresh secret itself must be replaced.
    pub fn requires_reauth(&self) -> bool {
        match self {
            AuthError::NotAuthenticated => true,
            AuthError::Refused { status, .. } => matches!(*status, 400 | 401 | 403),
            _ => false,
        }
    }

    /// True when the same call may succeed later without user action.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AuthError::Transport { .. } => true,
            AuthError::Refused { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::NotAuthenticated => {
                "No refresh token found. Run `bcs-trade login <token>` first.".to_string()
            }
            AuthError::Transport { .. } => {
                "Could not reach the authorization server. Check your connection.".to_string()
            }
            AuthError::Refused { status, .. } => match *status {
                400 | 401 => "The refresh token was rejected. Issue a new one and log in again."
                    .to_string(),
                403 => "The refresh token does not grant trading access.".to_string(),
                _ => format!("The authorization server returned HTTP {}.", status),
            },
            AuthError::InvalidResponse { .. } => {
                "The authorization server sent an unexpected response.".to_string()
            }
            AuthError::Storage { .. } => {
                "The refresh token could not be read from secure storage.".to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NotAuthenticated => "E_AUTH_NOT_AUTH",
            AuthError::Transport { .. } => "E_AUTH_TRANSPORT",
            AuthError::Refused { .. } => "E_AUTH_REFUSED",
            AuthError::InvalidResponse { .. } => "E_AUTH_INVALID",
            AuthError::Storage { .. } => "E_AUTH_STORAGE",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NotAuthenticated => write!(f, "Not authenticated: no refresh secret"),
            AuthError::Transport { message } => {
                write!(f, "Token request transport error: {}", message)
            }
            AuthError::Refused { status, body } => {
                write!(f, "Token request refused ({}): {}", status, body)
            }
            AuthError::InvalidResponse { message } => {
                write!(f, "Invalid token response: {}", message)
            }
            AuthError::Storage { message } => {
                write!(f, "Failed to load refresh secret: {}", message)
            }
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_authenticated() {
        let err = AuthError::NotAuthenticated;
        assert!(err.requires_reauth());
        assert!(!err.is_recoverable());
        assert_eq!(err.error_code(), "E_AUTH_NOT_AUTH");
        assert!(err.user_message().contains("login"));
    }

    #[test]
    fn test_refused_unauthorized_requires_reauth() {
        let err = AuthError::Refused {
            status: 401,
            body: "invalid_grant".to_string(),
        };
        assert!(err.requires_reauth());
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Token request refused (401): invalid_grant");
    }

    #[test]
    fn test_refused_server_error_is_recoverable() {
        let err = AuthError::Refused {
            status: 503,
            body: String::new(),
        };
        assert!(!err.requires_reauth());
        assert!(err.is_recoverable());
        assert!(err.user_message().contains("503"));
    }

    #[test]
    fn test_transport_is_recoverable() {
        let err = AuthError::Transport {
            message: "tls handshake eof".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.error_code(), "E_AUTH_TRANSPORT");
        assert!(err.to_string().contains("tls handshake eof"));
    }

    #[test]
    fn test_storage_display() {
        let err = AuthError::Storage {
            message: "keychain locked".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load refresh secret: keychain locked"
        );
        assert!(!err.requires_reauth());
    }
}
