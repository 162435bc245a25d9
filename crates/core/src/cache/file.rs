//! Single-file JSON cache store.
//!
//! The whole cache is one JSON object (`key -> payload`). Every write rewrites
//! the file: the map is serialized to a sibling temp file which is then renamed
//! over the previous document, so readers never observe a half-written document and
//! concurrent writers cannot interleave.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::CacheStore;
use crate::Error;

/// [`CacheStore`] persisted as one JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing or unparseable file starts an empty cache, which is written
    /// back immediately so the file exists afterwards.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, Value>>(&bytes) {
                Ok(entries) => Some(entries),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "cache file is corrupt, starting empty: {}", e);
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(Error::Io(e)),
        };

        let store = match entries {
            Some(entries) => {
                tracing::debug!(path = %path.display(), entries = entries.len(), "loaded cache file");
                Self { path, entries: Mutex::new(entries) }
            }
            None => {
                let store = Self { path, entries: Mutex::new(BTreeMap::new()) };
                let empty = BTreeMap::new();
                if let Err(e) = store.write_all(&empty).await {
                    tracing::warn!(path = %store.path.display(), "could not create cache file: {}", e);
                }
                store
            }
        };

        Ok(store)
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    async fn write_all(&self, entries: &BTreeMap<String, Value>) -> Result<(), Error> {
        let bytes = serde_json::to_vec_pretty(entries)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Persistence(format!("{}: {}", parent.display(), e)))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", self.path.display(), e)))?;

        Ok(())
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn store(&self, key: &str, value: &Value) -> Result<(), Error> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.clone());
        self.write_all(&entries).await
    }
}
