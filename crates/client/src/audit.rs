//! Append-only audit log of provider attempts.
//!
//! One JSON line per attempt. The pipeline never reads the log back; it exists
//! for external auditing of API usage. Each line is written with a single
//! `write_all` while holding the file lock, so concurrent appends never
//! interleave partial lines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One provider attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_suffix: Option<String>,
}

/// Last four characters of a credential, enough to tell keys apart in the log.
pub fn credential_suffix(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    if chars.len() <= 4 {
        return "****".into();
    }
    chars[chars.len() - 4..].iter().collect()
}

#[derive(Debug)]
enum Sink {
    File { path: PathBuf, file: Mutex<tokio::fs::File> },
    Memory(Mutex<Vec<AuditRecord>>),
    Disabled,
}

/// Shared handle to the audit log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    sink: Arc<Sink>,
}

impl AuditLog {
    /// Open (or create) the log file at `path` in append mode.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
        Ok(Self { sink: Arc::new(Sink::File { path, file: Mutex::new(file) }) })
    }

    /// Log kept in memory, readable through [`AuditLog::records`].
    pub fn in_memory() -> Self {
        Self { sink: Arc::new(Sink::Memory(Mutex::new(Vec::new()))) }
    }

    /// Log that discards every record.
    pub fn disabled() -> Self {
        Self { sink: Arc::new(Sink::Disabled) }
    }

    /// Append a record. Write failures are logged and otherwise ignored.
    pub async fn record(&self, query: &str, success: bool, credential_suffix: Option<&str>) {
        let record = AuditRecord {
            timestamp: Utc::now(),
            query: query.to_string(),
            success,
            credential_suffix: credential_suffix.map(str::to_string),
        };

        match self.sink.as_ref() {
            Sink::File { path, file } => {
                let mut line = match serde_json::to_vec(&record) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("failed to encode audit record: {}", e);
                        return;
                    }
                };
                line.push(b'\n');

                let mut file = file.lock().await;
                if let Err(e) = file.write_all(&line).await {
                    tracing::warn!(path = %path.display(), "failed to append audit record: {}", e);
                    return;
                }
                if let Err(e) = file.flush().await {
                    tracing::warn!(path = %path.display(), "failed to flush audit log: {}", e);
                }
            }
            Sink::Memory(records) => records.lock().await.push(record),
            Sink::Disabled => {}
        }
    }

    /// Records held by an in-memory log (empty for other sinks).
    pub async fn records(&self) -> Vec<AuditRecord> {
        match self.sink.as_ref() {
            Sink::Memory(records) => records.lock().await.clone(),
            _ => Vec::new(),
        }
    }
}
