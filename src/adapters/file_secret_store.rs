//! File-backed secret store.
//!
//! Entries live in one JSON object keyed by `"{service}/{key}"`. This is the
//! default backend when the `keyring-store` feature is off; it offers no
//! protection beyond owner-only file permissions.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::traits::{SecretStore, StorageError};

type Entries = BTreeMap<String, String>;

/// Secret store persisted to `~/.bcs-trade/secrets.json`.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileSecretStore {
    /// Create a store at the default location.
    ///
    /// # Returns
    /// The store, or an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, StorageError> {
        let home = dirs::home_dir()
            .ok_or_else(|| StorageError::Io("failed to determine home directory".to_string()))?;
        Ok(Self::with_path(home.join(".bcs-trade").join("secrets.json")))
    }

    /// Create a store backed by an explicit file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Get the path to the secrets file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entry_key(service: &str, key: &str) -> String {
        format!("{}/{}", service, key)
    }

    fn read_entries(&self) -> Result<Entries, StorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }

        let file = File::create(&self.path).map_err(|e| StorageError::Io(e.to_string()))?;
        restrict_permissions(&self.path)?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, entries)
            .map_err(|e| StorageError::Io(e.to_string()))?;
        writer.flush().map_err(|e| StorageError::Io(e.to_string()))
    }

    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T, StorageError>) -> Result<T, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| StorageError::Io(e.to_string()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

impl SecretStore for FileSecretStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>, StorageError> {
        self.with_lock(|| {
            let entries = self.read_entries()?;
            Ok(entries.get(&Self::entry_key(service, key)).cloned())
        })
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_lock(|| {
            let mut entries = self.read_entries()?;
            entries.insert(Self::entry_key(service, key), value.to_string());
            self.write_entries(&entries)
        })
    }

    fn delete(&self, service: &str, key: &str) -> Result<(), StorageError> {
        self.with_lock(|| {
            let mut entries = self.read_entries()?;
            if entries.remove(&Self::entry_key(service, key)).is_none() {
                return Ok(());
            }
            debug!("Removed {}/{} from {}", service, key, self.path.display());
            if entries.is_empty() {
                return match fs::remove_file(&self.path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(StorageError::Io(e.to_string())),
                };
            }
            self.write_entries(&entries)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store(temp_dir: &TempDir) -> FileSecretStore {
        FileSecretStore::with_path(temp_dir.path().join("nested").join("secrets.json"))
    }

    #[test]
    fn test_default_path() {
        let store = FileSecretStore::new().unwrap();
        assert!(store.path().ends_with(".bcs-trade/secrets.json"));
    }

    #[test]
    fn test_get_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);
        assert_eq!(store.get("BCSPy", "refresh_token0").unwrap(), None);
    }

    #[test]
    fn test_set_get_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);

        store.set("BCSPy", "refresh_token0", "part-a").unwrap();
        assert!(store.path().exists());
        assert_eq!(
            store.get("BCSPy", "refresh_token0").unwrap(),
            Some("part-a".to_string())
        );
        assert_eq!(store.get("other", "refresh_token0").unwrap(), None);
    }

    #[test]
    fn test_delete_last_entry_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);

        store.set("BCSPy", "refresh_token0", "a").unwrap();
        store.set("BCSPy", "refresh_token1", "b").unwrap();
        store.delete("BCSPy", "refresh_token0").unwrap();
        assert!(store.path().exists());
        assert_eq!(
            store.get("BCSPy", "refresh_token1").unwrap(),
            Some("b".to_string())
        );

        store.delete("BCSPy", "refresh_token1").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);
        assert!(store.delete("BCSPy", "refresh_token7").is_ok());
    }

    #[test]
    fn test_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not valid json").unwrap();

        let result = store.get("BCSPy", "refresh_token0");
        assert!(matches!(result, Err(StorageError::Corrupt(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);
        store.set("BCSPy", "refresh_token0", "secret").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
