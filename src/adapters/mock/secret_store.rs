//! In-memory secret store for testing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::lock;
use crate::traits::{SecretStore, StorageError};

/// In-memory secret store.
///
/// Clones share the same entries, so a test can keep one handle for
/// inspection while the code under test owns another. Each operation can be
/// made to fail, and an optional per-entry length limit mimics keychains
/// that reject long values.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    entries: Arc<Mutex<BTreeMap<(String, String), String>>>,
    max_value_len: Arc<Mutex<Option<usize>>>,
    get_should_fail: Arc<Mutex<bool>>,
    set_should_fail: Arc<Mutex<bool>>,
    delete_should_fail: Arc<Mutex<bool>>,
}

impl InMemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects values longer than `limit` characters.
    pub fn with_max_value_len(limit: usize) -> Self {
        let store = Self::default();
        *lock(&store.max_value_len) = Some(limit);
        store
    }

    /// Read an entry directly, bypassing failure toggles.
    pub fn entry(&self, service: &str, key: &str) -> Option<String> {
        lock(&self.entries)
            .get(&(service.to_string(), key.to_string()))
            .cloned()
    }

    /// Write an entry directly, bypassing failure toggles and limits.
    pub fn insert(&self, service: &str, key: &str, value: &str) {
        lock(&self.entries).insert((service.to_string(), key.to_string()), value.to_string());
    }

    /// Keys stored under `service`, sorted.
    pub fn keys(&self, service: &str) -> Vec<String> {
        lock(&self.entries)
            .keys()
            .filter(|(s, _)| s == service)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Total number of entries across all services.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configure whether get should fail.
    pub fn set_get_should_fail(&self, should_fail: bool) {
        *lock(&self.get_should_fail) = should_fail;
    }

    /// Configure whether set should fail.
    pub fn set_set_should_fail(&self, should_fail: bool) {
        *lock(&self.set_should_fail) = should_fail;
    }

    /// Configure whether delete should fail.
    pub fn set_delete_should_fail(&self, should_fail: bool) {
        *lock(&self.delete_should_fail) = should_fail;
    }
}

impl SecretStore for InMemorySecretStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>, StorageError> {
        if *lock(&self.get_should_fail) {
            return Err(StorageError::Unavailable("Mock get failure".to_string()));
        }
        Ok(self.entry(service, key))
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), StorageError> {
        if *lock(&self.set_should_fail) {
            return Err(StorageError::AccessDenied("Mock set failure".to_string()));
        }
        if let Some(limit) = *lock(&self.max_value_len) {
            if value.chars().count() > limit {
                return Err(StorageError::ValueTooLong {
                    key: key.to_string(),
                    limit,
                });
            }
        }
        self.insert(service, key, value);
        Ok(())
    }

    fn delete(&self, service: &str, key: &str) -> Result<(), StorageError> {
        if *lock(&self.delete_should_fail) {
            return Err(StorageError::AccessDenied("Mock delete failure".to_string()));
        }
        lock(&self.entries).remove(&(service.to_string(), key.to_string()));
        Ok(())
    }
}
