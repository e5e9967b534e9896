//! In-memory storage backend for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{StorageBackend, StorageError};

/// Process-local backend. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
