// src/store/memory.rs
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::store::{DocumentStore, RawRecord};

/// In-process store for tests and demos. Can be switched "offline" to
/// simulate an unreachable backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, Vec<RawRecord>>>,
    offline: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails with a connection error.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn with_collection(self, name: &str, docs: Vec<RawRecord>) -> Self {
        self.insert(name, docs);
        self
    }

    pub fn insert(&self, name: &str, docs: Vec<RawRecord>) {
        let mut guard = match self.collections.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        guard.insert(name.to_string(), docs);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Connection("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<RawRecord>, StoreError> {
        self.check_online()?;
        let guard = self
            .collections
            .lock()
            .map_err(|_| StoreError::Query("memory store lock poisoned".into()))?;
        Ok(guard.get(collection).cloned().unwrap_or_default())
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        self.check_online()?;
        let guard = self
            .collections
            .lock()
            .map_err(|_| StoreError::Query("memory store lock poisoned".into()))?;
        Ok(guard.keys().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
