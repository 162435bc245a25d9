//! In-memory cache store for tests and throwaway runs.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::CacheStore;
use crate::Error;

/// [`CacheStore`] that never touches disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, value: &Value) -> Result<(), Error> {
        self.entries.write().await.insert(key.to_string(), value.clone());
        Ok(())
    }
}
