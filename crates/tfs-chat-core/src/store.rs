//! Durable key-value storage for client-local state.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::Result;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-process store, used by tests and when no data directory is available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_round_trips_and_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("nested"));

        assert_eq!(store.get("recentActivity").unwrap(), None);
        store.set("recentActivity", "[]").unwrap();
        assert_eq!(store.get("recentActivity").unwrap().as_deref(), Some("[]"));
        assert!(tmp.path().join("nested/recentActivity.json").exists());
    }

    #[test]
    fn memory_store_overwrites() {
        let store = MemoryStore::new();
        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
    }
}
