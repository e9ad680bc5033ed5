//! Extension local storage area — a flat map of JSON values by key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

/// Key/value storage shared by the popup and background contexts.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile storage, used by tests and one-shot CLI runs.
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.items.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }
}

/// Storage persisted as one pretty-printed JSON object on disk.
pub struct JsonFileStorage {
    path: PathBuf,
    items: RwLock<HashMap<String, Value>>,
}

impl JsonFileStorage {
    /// Open the storage file. A missing file starts empty; a corrupt one is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let items = match std::fs::read_to_string(path) {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| Error::Storage(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            items: RwLock::new(items),
        })
    }

    fn flush(&self, items: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(items)?;
        std::fs::write(&self.path, json)?;
        debug!("Flushed {} storage keys to {}", items.len(), self.path.display());
        Ok(())
    }
}

impl LocalStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut items = self.items.write();
        items.insert(key.to_string(), value);
        self.flush(&items)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut items = self.items.write();
        if items.remove(key).is_some() {
            self.flush(&items)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_roundtrip_and_remove() {
        let storage = MemoryStorage::new();
        storage.set("auth", json!({"username": "test"})).unwrap();
        assert_eq!(storage.get("auth").unwrap().unwrap()["username"], "test");
        storage.remove("auth").unwrap();
        storage.remove("auth").unwrap();
        assert!(storage.get("auth").unwrap().is_none());
    }

    #[test]
    fn test_file_storage_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = JsonFileStorage::open(&path).unwrap();
        storage.set("auth", json!({"username": "test"})).unwrap();
        drop(storage);

        let reopened = JsonFileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("auth").unwrap().unwrap()["username"], "test");

        reopened.remove("auth").unwrap();
        let again = JsonFileStorage::open(&path).unwrap();
        assert!(again.get("auth").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(JsonFileStorage::open(&path), Err(Error::Storage(_))));
    }
}
