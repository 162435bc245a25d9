//! SQLite-backed cache store.
//!
//! Both caches share one database file: entries sit in a single
//! `cache_entries` table keyed by `(namespace, key)`, and the schema is
//! created on open.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio_rusqlite::rusqlite::OptionalExtension;
use tokio_rusqlite::{Connection, params};

use super::CacheStore;
use crate::Error;

const SCHEMA: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     CREATE TABLE IF NOT EXISTS cache_entries (
         namespace TEXT NOT NULL,
         key TEXT NOT NULL,
         value_json TEXT NOT NULL,
         written_at TEXT NOT NULL,
         PRIMARY KEY (namespace, key)
     );";

/// Shared cache database. Clones use the same background connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    conn: Connection,
}

impl CacheDb {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::with_schema(conn).await
    }

    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await.map_err(|e| Error::Database(e.into()))?;
        Self::with_schema(conn).await
    }

    async fn with_schema(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(SCHEMA)).await.map_err(Error::Database)?;
        Ok(Self { conn })
    }

    /// Payload JSON stored under `namespace`/`key`.
    pub async fn get_entry(&self, namespace: &str, key: &str) -> Result<Option<String>, Error> {
        let (namespace, key) = (namespace.to_string(), key.to_string());
        self.conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT value_json FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                    params![namespace, key],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(Error::Database)
    }

    /// Insert or overwrite the payload under `namespace`/`key`.
    pub async fn put_entry(&self, namespace: &str, key: &str, value_json: &str) -> Result<(), Error> {
        let (namespace, key, value_json) = (namespace.to_string(), key.to_string(), value_json.to_string());
        let written_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO cache_entries (namespace, key, value_json, written_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(namespace, key) DO UPDATE SET
                        value_json = excluded.value_json,
                        written_at = excluded.written_at",
                    params![namespace, key, value_json, written_at],
                )
            })
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    pub async fn count_entries(&self, namespace: &str) -> Result<u64, Error> {
        let namespace = namespace.to_string();
        let count: i64 = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE namespace = ?1",
                    params![namespace],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(Error::Database)?;
        Ok(count.max(0) as u64)
    }
}

/// [`CacheStore`] over one namespace of a [`CacheDb`].
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: CacheDb,
    namespace: String,
}

impl SqliteStore {
    pub fn new(db: CacheDb, namespace: impl Into<String>) -> Self {
        Self { db, namespace: namespace.into() }
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, Error> {
        match self.db.get_entry(&self.namespace, key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, value: &Value) -> Result<(), Error> {
        let json = serde_json::to_string(value)?;
        self.db
            .put_entry(&self.namespace, key, &json)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))
    }
}
