//! Chunked persistence of the refresh secret.
//!
//! Keychains limit the size of a single entry, so the secret is split into
//! chunks stored under `{username}0`, `{username}1`, ... within one service.
//! Reads stop at the first missing index.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::{ClientConfig, DEFAULT_CHUNK_SIZE};
use crate::traits::{SecretStore, StorageError};

/// Refresh secret storage on top of a [`SecretStore`].
///
/// # Example
///
/// ```ignore
/// use bcs_trade::adapters::InMemorySecretStore;
/// use bcs_trade::auth::CredentialStore;
///
/// let store = CredentialStore::new(Arc::new(InMemorySecretStore::new()), "BCSPy", "refresh_token");
/// store.save("eyJhbGciOi...")?;
/// assert!(store.load()?.is_some());
/// ```
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn SecretStore>,
    service: String,
    username: String,
    chunk_size: usize,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("service", &self.service)
            .field("username", &self.username)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl CredentialStore {
    /// Create a store for `(service, username)` with the default chunk size.
    pub fn new(
        backend: Arc<dyn SecretStore>,
        service: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            service: service.into(),
            username: username.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Create a store using the naming and chunk size from `config`.
    pub fn from_config(backend: Arc<dyn SecretStore>, config: &ClientConfig) -> Self {
        Self::new(backend, &config.storage_service, &config.storage_username)
            .with_chunk_size(config.chunk_size)
    }

    /// Set the chunk size used by [`save`](Self::save).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Storage key of chunk `index`.
    pub fn chunk_key(&self, index: usize) -> String {
        format!("{}{}", self.username, index)
    }

    /// Reassemble the stored secret.
    ///
    /// # Returns
    /// - `Ok(Some(secret))` if chunk 0 exists
    /// - `Ok(None)` if nothing is stored
    /// - `Err(StorageError)` if the backend failed
    pub fn load(&self) -> Result<Option<String>, StorageError> {
        let mut secret = String::new();
        let mut count = 0;

        loop {
            let key = self.chunk_key(count);
            match self.backend.get(&self.service, &key) {
                Ok(Some(part)) => {
                    secret.push_str(&part);
                    count += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    error!(
                        code = e.error_code(),
                        "Failed to read {}/{} from secure storage: {}", self.service, key, e
                    );
                    return Err(e);
                }
            }
        }

        if count == 0 {
            debug!("No refresh secret stored under {}", self.service);
            return Ok(None);
        }

        debug!("Loaded refresh secret from {} chunk(s)", count);
        Ok(Some(secret))
    }

    /// Replace the stored secret, splitting it with the configured chunk size.
    ///
    /// # Returns
    /// The number of chunks written.
    pub fn save(&self, secret: &str) -> Result<usize, StorageError> {
        self.save_with_chunk_size(secret, self.chunk_size)
    }

    /// Replace the stored secret using an explicit chunk size.
    ///
    /// The previous chunk set is cleared first. If a write fails, chunks
    /// already written are removed again so a later [`load`](Self::load)
    /// never returns a truncated secret.
    pub fn save_with_chunk_size(&self, secret: &str, chunk_size: usize) -> Result<usize, StorageError> {
        if chunk_size == 0 {
            return Err(StorageError::InvalidChunkSize);
        }

        self.clear()?;

        let chunks = split_chunks(secret, chunk_size);
        for (index, chunk) in chunks.iter().enumerate() {
            let key = self.chunk_key(index);
            if let Err(e) = self.backend.set(&self.service, &key, chunk) {
                error!(
                    code = e.error_code(),
                    "Failed to write {}/{} to secure storage: {}", self.service, key, e
                );
                let _ = self.clear();
                return Err(e);
            }
        }

        debug!("Saved refresh secret in {} chunk(s)", chunks.len());
        Ok(chunks.len())
    }

    /// Remove every stored chunk.
    ///
    /// # Returns
    /// The number of chunks removed.
    pub fn clear(&self) -> Result<usize, StorageError> {
        let mut removed = 0;

        loop {
            let key = self.chunk_key(removed);
            let exists = self
                .backend
                .get(&self.service, &key)
                .map_err(|e| {
                    error!("Failed to read {}/{} from secure storage: {}", self.service, key, e);
                    e
                })?
                .is_some();
            if !exists {
                break;
            }
            self.backend.delete(&self.service, &key).map_err(|e| {
                error!("Failed to delete {}/{} from secure storage: {}", self.service, key, e);
                e
            })?;
            removed += 1;
        }

        if removed > 0 {
            debug!("Removed {} chunk(s) from {}", removed, self.service);
        }
        Ok(removed)
    }
}

/// Split on character boundaries into pieces of at most `chunk_size` chars.
fn split_chunks(secret: &str, chunk_size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in secret.char_indices() {
        if count == chunk_size {
            chunks.push(&secret[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < secret.len() {
        chunks.push(&secret[start..]);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::InMemorySecretStore;

    fn create_store(backend: &InMemorySecretStore) -> CredentialStore {
        CredentialStore::new(Arc::new(backend.clone()), "BCSPy", "refresh_token")
    }

    #[test]
    fn test_split_chunks() {
        assert_eq!(split_chunks("abcde", 2), vec!["ab", "cd", "e"]);
        assert_eq!(split_chunks("abcd", 2), vec!["ab", "cd"]);
        assert_eq!(split_chunks("abc", 10), vec!["abc"]);
        assert!(split_chunks("", 3).is_empty());
    }

    #[test]
    fn test_split_chunks_respects_char_boundaries() {
        assert_eq!(split_chunks("жжж", 2), vec!["жж", "ж"]);
    }

    #[test]
    fn test_load_empty_is_none() {
        let backend = InMemorySecretStore::new();
        assert_eq!(create_store(&backend).load().unwrap(), None);
    }

    #[test]
    fn test_save_writes_indexed_keys() {
        let backend = InMemorySecretStore::new();
        let store = create_store(&backend);

        let written = store.save_with_chunk_size("abcdefg", 3).unwrap();
        assert_eq!(written, 3);
        assert_eq!(backend.entry("BCSPy", "refresh_token0"), Some("abc".to_string()));
        assert_eq!(backend.entry("BCSPy", "refresh_token1"), Some("def".to_string()));
        assert_eq!(backend.entry("BCSPy", "refresh_token2"), Some("g".to_string()));
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let backend = InMemorySecretStore::new();
        let store = create_store(&backend);
        let secret = "x".repeat(1234);

        assert_eq!(store.save(&secret).unwrap(), 3);
        assert_eq!(store.load().unwrap(), Some(secret));
    }

    #[test]
    fn test_save_clears_longer_previous_secret() {
        let backend = InMemorySecretStore::new();
        let store = create_store(&backend);

        store.save_with_chunk_size("aaaabbbbcccc", 4).unwrap();
        store.save_with_chunk_size("zz", 4).unwrap();

        assert_eq!(store.load().unwrap(), Some("zz".to_string()));
        assert_eq!(backend.keys("BCSPy"), vec!["refresh_token0".to_string()]);
    }

    #[test]
    fn test_load_stops_at_gap() {
        let backend = InMemorySecretStore::new();
        backend.insert("BCSPy", "refresh_token0", "one");
        backend.insert("BCSPy", "refresh_token2", "three");

        assert_eq!(create_store(&backend).load().unwrap(), Some("one".to_string()));
    }

    #[test]
    fn test_clear_returns_removed_count() {
        let backend = InMemorySecretStore::new();
        let store = create_store(&backend);
        store.save_with_chunk_size("abcdef", 2).unwrap();

        assert_eq!(store.clear().unwrap(), 3);
        assert!(backend.is_empty());
        assert_eq!(store.clear().unwrap(), 0);
    }

    #[test]
    fn test_zero_chunk_size_rejected_without_touching_store() {
        let backend = InMemorySecretStore::new();
        let store = create_store(&backend);
        store.save("keep").unwrap();

        assert_eq!(
            store.save_with_chunk_size("new", 0),
            Err(StorageError::InvalidChunkSize)
        );
        assert_eq!(store.load().unwrap(), Some("keep".to_string()));
    }

    #[test]
    fn test_load_failure_is_distinct_from_absence() {
        let backend = InMemorySecretStore::new();
        let store = create_store(&backend);
        store.save("secret").unwrap();
        backend.set_get_should_fail(true);

        assert!(matches!(store.load(), Err(StorageError::Unavailable(_))));
    }

    #[test]
    fn test_failed_write_leaves_no_partial_secret() {
        let backend = InMemorySecretStore::with_max_value_len(4);
        let store = create_store(&backend);

        let result = store.save_with_chunk_size("abcdefgh", 5);
        assert!(matches!(result, Err(StorageError::ValueTooLong { .. })));
        assert!(backend.is_empty());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_from_config_uses_naming() {
        let backend = InMemorySecretStore::new();
        let config = ClientConfig::default()
            .with_storage("svc", "tok")
            .with_chunk_size(2);
        let store = CredentialStore::from_config(Arc::new(backend.clone()), &config);

        store.save("abc").unwrap();
        assert_eq!(backend.keys("svc"), vec!["tok0".to_string(), "tok1".to_string()]);
        assert_eq!(store.chunk_size(), 2);
    }
}
