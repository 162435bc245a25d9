//! Unified error types for sitelens.
//!
//! Provider failures are classified in `sitelens-client`; this enum covers the
//! local concerns: cache persistence, storage and input validation.

use tokio_rusqlite::rusqlite;

/// Unified error types for the enrichment core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (e.g., an unreadable location file).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Cache entry could not be written to durable storage.
    #[error("PERSISTENCE_FAILED: {0}")]
    Persistence(String),

    /// Payload could not be encoded or decoded.
    #[error("SERIALIZATION: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
