//! Content-addressed cache for search results and contract sets.
//!
//! Entries are keyed by a deterministic fingerprint of the logical request
//! (see [`hash`]) and hold an arbitrary JSON payload. Three stores back the
//! cache:
//!
//! - [`JsonFileStore`]: one JSON document per cache, rewritten wholesale on
//!   every write through a temp file and an atomic rename
//! - [`SqliteStore`]: WAL-mode SQLite, one table shared by both caches
//! - [`MemoryStore`]: process-local map for tests
//!
//! [`ContentCache`] layers the bust-cache mode and an in-memory overlay on top
//! of a store, so a value whose persistence failed is still served for the
//! rest of the process.

pub mod file;
pub mod hash;
pub mod memory;
pub mod sqlite;

pub use crate::Error;

pub use file::JsonFileStore;
pub use hash::{contract_cache_key, round_coordinate, search_fingerprint};
pub use memory::MemoryStore;
pub use sqlite::{CacheDb, SqliteStore};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

/// Namespace for web search result lists.
pub const SEARCH_NAMESPACE: &str = "search";

/// Namespace for filtered contract sets.
pub const CONTRACT_NAMESPACE: &str = "contracts";

/// Durable key/value persistence for cache payloads.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the payload stored under `key`.
    async fn load(&self, key: &str) -> Result<Option<Value>, Error>;

    /// Replace the payload stored under `key`.
    async fn store(&self, key: &str, value: &Value) -> Result<(), Error>;
}

/// Cache facade used by the enrichment pipeline.
#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn CacheStore>,
    overlay: Arc<RwLock<HashMap<String, Value>>>,
    bypass: bool,
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache").field("bypass", &self.bypass).finish_non_exhaustive()
    }
}

impl ContentCache {
    pub fn new(store: Arc<dyn CacheStore>, bypass: bool) -> Self {
        Self { store, overlay: Arc::new(RwLock::new(HashMap::new())), bypass }
    }

    /// Cache over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()), false)
    }

    /// True when bust-cache mode is active: reads miss, writes still persist.
    pub fn should_bypass(&self) -> bool {
        self.bypass
    }

    /// Look up the raw payload for `key`.
    ///
    /// Store read errors are logged and reported as a miss.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        if self.bypass {
            return None;
        }

        if let Some(value) = self.overlay.read().await.get(key) {
            return Some(value.clone());
        }

        match self.store.load(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, "cache read failed: {}", e);
                None
            }
        }
    }

    /// Look up and decode the payload for `key`.
    ///
    /// A payload that no longer decodes into `T` counts as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key, "discarding undecodable cache entry: {}", e);
                None
            }
        }
    }

    /// Store a raw payload under `key`, replacing any previous entry.
    ///
    /// When persistence fails the value is kept in memory instead, so it stays
    /// readable for the rest of the process.
    pub async fn put_value(&self, key: &str, value: Value) -> Result<(), Error> {
        match self.store.store(key, &value).await {
            Ok(()) => {
                self.overlay.write().await.remove(key);
                Ok(())
            }
            Err(e) => {
                self.overlay.write().await.insert(key.to_string(), value);
                Err(e)
            }
        }
    }

    /// Encode and store `value` under `key`.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        let value = serde_json::to_value(value)?;
        self.put_value(key, value).await
    }
}
