//! crates/elearning_core/src/storage.rs
//!
//! The key-value store adapter: JSON collections stored under a single key each,
//! plus an in-memory [`KeyValueStore`] implementation.
//!
//! Every operation here fails soft. Storage and serialization errors are logged and
//! turned into a safe default, so callers never handle a persistence error.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

use crate::ports::{KeyValueStore, PortError, PortResult};

pub const CHAT_SESSIONS_KEY: &str = "elearning_chat_sessions";
pub const CURRENT_SESSION_KEY: &str = "elearning_current_session";
pub const QUIZ_RESULTS_KEY: &str = "elearning_quiz_results";

//=========================================================================================
// JSON Collections
//=========================================================================================

/// A `record id -> T` mapping persisted as one JSON object under `storage_key`.
///
/// Every write rewrites the whole collection.
pub struct JsonCollection<T> {
    kv: Arc<dyn KeyValueStore>,
    storage_key: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonCollection<T> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
            storage_key: self.storage_key,
            _record: PhantomData,
        }
    }
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(kv: Arc<dyn KeyValueStore>, storage_key: &'static str) -> Self {
        Self {
            kv,
            storage_key,
            _record: PhantomData,
        }
    }

    /// The whole collection; empty when missing or unreadable.
    pub fn get_all(&self) -> BTreeMap<String, T> {
        match self.try_get_all() {
            Ok(records) => records,
            Err(e) => {
                error!("Error reading {}: {}", self.storage_key, e);
                BTreeMap::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.get_all().remove(id)
    }

    /// Inserts or replaces the record stored under `id`.
    pub fn set(&self, id: &str, record: T) -> bool {
        let mut records = self.get_all();
        records.insert(id.to_string(), record);
        self.write_all(&records)
    }

    /// Applies `update` to the record under `id` (or `T::default()`) and writes it back.
    pub fn update<F>(&self, id: &str, update: F) -> bool
    where
        T: Default,
        F: FnOnce(&mut T),
    {
        let mut records = self.get_all();
        update(records.entry(id.to_string()).or_default());
        self.write_all(&records)
    }

    pub fn delete(&self, id: &str) -> bool {
        let mut records = self.get_all();
        records.remove(id);
        self.write_all(&records)
    }

    fn try_get_all(&self) -> PortResult<BTreeMap<String, T>> {
        match self.kv.get_item(self.storage_key)? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| PortError::Storage(e.to_string()))
            }
            None => Ok(BTreeMap::new()),
        }
    }

    fn write_all(&self, records: &BTreeMap<String, T>) -> bool {
        let result = serde_json::to_string(records)
            .map_err(|e| PortError::Storage(e.to_string()))
            .and_then(|raw| self.kv.set_item(self.storage_key, &raw));
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Error writing {}: {}", self.storage_key, e);
                false
            }
        }
    }
}

//=========================================================================================
// In-Memory Key-Value Store
//=========================================================================================

/// A process-local [`KeyValueStore`]; contents are lost on drop.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
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
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> PortResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        items.remove(key);
        Ok(())
    }
}
