//! String key-value persistence for the session token.
//!
//! # Design
//! The trait mirrors the small get/set/remove surface a platform key-value
//! store offers. `FileStorage` keeps all keys in one JSON object file and
//! rewrites it on every change, which is plenty for a handful of keys.
//! Rewrites go through a temporary file in the same directory that is then
//! renamed over the old one, so a crash never leaves a torn file behind.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::StorageError;

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Keys stored as one JSON object in a file. A missing file reads as empty.
///
/// Reads report a malformed file as `StorageError::Format`; writes replace
/// it, so `set` and `remove` always recover.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let text = serde_json::to_string_pretty(entries)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(text.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StorageError::Format(e)) => {
                warn!(path = %self.path.display(), error = %e, "replacing malformed storage file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        change(&mut entries);
        self.write_entries(&entries)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_get_set_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("token").unwrap(), None);
        storage.set("token", "abc").unwrap();
        storage.set("other", "x").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
        reopened.remove("token").unwrap();
        assert_eq!(reopened.get("token").unwrap(), None);
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn file_storage_remove_without_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        storage.remove("token").unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn file_storage_reports_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        let err = FileStorage::new(&path).get("token").unwrap_err();
        assert!(matches!(err, StorageError::Format(_)));
    }

    #[test]
    fn writes_replace_a_torn_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"sb-x-auth-tok"#).unwrap();

        let storage = FileStorage::new(&path);
        storage.remove("sb-x-auth-token").unwrap();
        assert_eq!(storage.get("sb-x-auth-token").unwrap(), None);

        fs::write(&path, "{not json").unwrap();
        storage.set("token", "abc").unwrap();
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("abc"));
        // Only the target file is left in the directory.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
