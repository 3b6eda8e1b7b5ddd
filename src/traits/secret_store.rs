//! Secure storage trait abstraction.
//!
//! The credential store only needs three primitives keyed by
//! `(service, key)`. Backends are an OS keychain, a JSON file and an
//! in-memory map for tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! let store: Arc<dyn SecretStore> = Arc::new(FileSecretStore::new()?);
//! store.set("BCSPy", "refresh_token0", "eyJhbGciOi...")?;
//! assert!(store.get("BCSPy", "refresh_token0")?.is_some());
//! ```

use thiserror::Error;

/// Secure storage backend failures.
///
/// A missing entry is never an error: `get` returns `Ok(None)` and `delete`
/// succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backend cannot be reached (no keychain daemon, locked keyring).
    #[error("secure storage unavailable: {0}")]
    Unavailable(String),

    /// The backend refused access to the entry.
    #[error("secure storage access denied: {0}")]
    AccessDenied(String),

    /// The backend rejects values of this length.
    #[error("value for '{key}' exceeds the backend limit of {limit} characters")]
    ValueTooLong { key: String, limit: usize },

    /// A chunk size of zero was requested.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    /// Reading or writing the backing file failed.
    #[error("secure storage i/o error: {0}")]
    Io(String),

    /// The backing file exists but cannot be parsed.
    #[error("secure storage is corrupt: {0}")]
    Corrupt(String),

    #[error("secure storage error: {0}")]
    Other(String),
}

impl StorageError {
    /// True when retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Io(_))
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StorageError::Unavailable(_) => {
                "The system keychain is not available.".to_string()
            }
            StorageError::AccessDenied(_) => {
                "Access to the stored refresh token was denied.".to_string()
            }
            StorageError::ValueTooLong { limit, .. } => format!(
                "The storage backend only accepts {} characters per entry. Use a smaller chunk size.",
                limit
            ),
            StorageError::InvalidChunkSize => "Chunk size must be at least 1.".to_string(),
            StorageError::Io(_) | StorageError::Corrupt(_) => {
                "The secrets file could not be used.".to_string()
            }
            StorageError::Other(msg) => format!("Secure storage error: {}", msg),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Unavailable(_) => "E_STORE_UNAVAILABLE",
            StorageError::AccessDenied(_) => "E_STORE_DENIED",
            StorageError::ValueTooLong { .. } => "E_STORE_TOO_LONG",
            StorageError::InvalidChunkSize => "E_STORE_CHUNK",
            StorageError::Io(_) => "E_STORE_IO",
            StorageError::Corrupt(_) => "E_STORE_CORRUPT",
            StorageError::Other(_) => "E_STORE_OTHER",
        }
    }
}

/// Minimal secure storage capability.
///
/// Implementations must be thread-safe (Send + Sync); the session shares one
/// store between the credential store and the command-line binary.
pub trait SecretStore: Send + Sync {
    /// Read the value stored under `(service, key)`.
    ///
    /// # Returns
    /// - `Ok(Some(value))` if an entry exists
    /// - `Ok(None)` if there is no entry
    /// - `Err(StorageError)` if the backend failed
    fn get(&self, service: &str, key: &str) -> Result<Option<String>, StorageError>;

    /// Create or overwrite the entry under `(service, key)`.
    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the entry under `(service, key)`. Missing entries are ignored.
    fn delete(&self, service: &str, key: &str) -> Result<(), StorageError>;
}
