//! In-memory cache engine for tests and short-lived sessions.

use super::engine::CacheEngine;
use crate::Error;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cache engine backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CacheEngine for MemoryEngine {
    async fn contains(&self, key: &str) -> Result<bool, Error> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), Error> {
        self.entries.write().await.clear();
        Ok(())
    }
}
