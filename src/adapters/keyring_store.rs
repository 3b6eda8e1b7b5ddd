//! OS keychain secret store (feature `keyring-store`).
//!
//! Uses the platform credential store through the `keyring` crate: macOS
//! Keychain, Windows Credential Manager, or the Secret Service on Linux.
//! Some of these cap entry length, which is why the refresh secret is
//! chunked.

use tracing::debug;

use crate::traits::{SecretStore, StorageError};

/// Secret store backed by the OS keychain.
#[derive(Debug, Clone, Default)]
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(service: &str, key: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(service, key).map_err(|e| convert_error(key, e))
    }
}

fn convert_error(key: &str, err: keyring::Error) -> StorageError {
    match err {
        keyring::Error::NoStorageAccess(e) => StorageError::Unavailable(e.to_string()),
        keyring::Error::PlatformFailure(e) => StorageError::Unavailable(e.to_string()),
        keyring::Error::TooLong(_, limit) => StorageError::ValueTooLong {
            key: key.to_string(),
            limit: limit as usize,
        },
        keyring::Error::BadEncoding(_) => {
            StorageError::Corrupt(format!("entry {} is not valid UTF-8", key))
        }
        other => StorageError::Other(other.to_string()),
    }
}

impl SecretStore for KeyringSecretStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>, StorageError> {
        match Self::entry(service, key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(convert_error(key, e)),
        }
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), StorageError> {
        Self::entry(service, key)?
            .set_password(value)
            .map_err(|e| convert_error(key, e))
    }

    fn delete(&self, service: &str, key: &str) -> Result<(), StorageError> {
        match Self::entry(service, key)?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => {
                debug!("No keychain entry {}/{} to delete", service, key);
                Ok(())
            }
            Err(e) => Err(convert_error(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_long_maps_limit() {
        let err = convert_error(
            "refresh_token0",
            keyring::Error::TooLong("password".to_string(), 512),
        );
        assert_eq!(
            err,
            StorageError::ValueTooLong {
                key: "refresh_token0".to_string(),
                limit: 512
            }
        );
    }
}
