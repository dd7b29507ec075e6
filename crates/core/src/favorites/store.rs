//! # Favorite Store
//!
//! Key-value persistence seam for the favorite set. One key holds the whole
//! serialized set.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::PersistenceError;
use crate::state::HerodexDb;

#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

#[async_trait]
impl FavoriteStore for HerodexDb {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        HerodexDb::get(self, key).map_err(|e| PersistenceError::Read {
            key: key.to_string(),
            reason: format!("{:#}", e),
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        HerodexDb::set(self, key, value).map_err(|e| PersistenceError::Write {
            key: key.to_string(),
            reason: format!("{:#}", e),
        })
    }
}

/// Process-local store; nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self.entries.lock().map_err(|e| PersistenceError::Read {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().map_err(|e| PersistenceError::Write {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
