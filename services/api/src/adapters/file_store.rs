//! services/api/src/adapters/file_store.rs
//!
//! A durable `KeyValueStore` kept as a single JSON object file. Values are cached
//! in memory and the whole file is rewritten (tmp file + rename) on every change.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use elearning_core::ports::{KeyValueStore, PortError, PortResult};
use tracing::info;

pub struct FileKeyValueStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// Opens the store at `path`, creating it on first write if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();
        let items = load(&path)?;
        info!("Opened key-value store at {} ({} keys)", path.display(), items.len());
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> PortResult<()> {
        save(&self.path, items).map_err(|e| PortError::Storage(e.to_string()))
    }
}

fn load(path: &Path) -> PortResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(path).map_err(|e| PortError::Storage(e.to_string()))?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&content).map_err(|e| {
        PortError::Storage(format!("{} is not a valid store file: {}", path.display(), e))
    })
}

fn save(path: &Path, items: &BTreeMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(items)?;

    let tmp_path = path.with_extension("json.tmp");
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(json.as_bytes())?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&items) {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> PortResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        if let Some(old) = items.remove(key) {
            if let Err(e) = self.persist(&items) {
                items.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elearning_core::SessionStore;
    use std::sync::Arc;

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileKeyValueStore::open(&path).unwrap();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();
        store.remove_item("a").unwrap();
        drop(store);

        let reopened = FileKeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.get_item("a").unwrap(), None);
        assert_eq!(reopened.get_item("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn corrupt_file_is_rejected_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{oops").unwrap();

        assert!(matches!(FileKeyValueStore::open(&path), Err(PortError::Storage(_))));
    }

    #[test]
    fn failed_writes_leave_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("data");
        let store = FileKeyValueStore::open(parent.join("store.json")).unwrap();
        store.set_item("a", "1").unwrap();

        // Make the parent directory unusable so every save fails.
        fs::remove_dir_all(&parent).unwrap();
        fs::write(&parent, "not a directory").unwrap();

        assert!(matches!(store.remove_item("a"), Err(PortError::Storage(_))));
        assert_eq!(store.get_item("a").unwrap().as_deref(), Some("1"));

        assert!(store.set_item("a", "2").is_err());
        assert!(store.set_item("b", "3").is_err());
        assert_eq!(store.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get_item("b").unwrap(), None);
    }

    #[test]
    fn sessions_persist_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let created = {
            let store = SessionStore::new(Arc::new(FileKeyValueStore::open(&path).unwrap()));
            store.create_new_session(None)
        };

        let store = SessionStore::new(Arc::new(FileKeyValueStore::open(&path).unwrap()));
        assert_eq!(store.get_current_session_id(), Some(created.id.clone()));
        assert_eq!(store.get_chat_session(&created.id).map(|s| s.title), Some(created.title));
    }
}
