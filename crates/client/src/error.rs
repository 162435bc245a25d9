//! Provider error types and failure classification.

use std::sync::Arc;

/// Phrases providers use when an account's quota or billing is exhausted.
const QUOTA_MARKERS: &[&str] = &[
    "run out of searches",
    "out of searches",
    "quota",
    "billing",
    "insufficient credits",
    "plan limit",
    "payment required",
];

/// True when `text` describes a quota or billing exhaustion.
pub fn is_quota_message(text: &str) -> bool {
    let lower = text.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Errors from the search and spending providers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// No API key was configured for a provider that needs one.
    #[error("missing API key")]
    MissingApiKey,

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Account quota or billing exhausted. Retrying is futile.
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Non-success HTTP status.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Terminal failures are never retried.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProviderError::QuotaExhausted(_) | ProviderError::MissingApiKey | ProviderError::InvalidRequest(_)
        )
    }

    /// Classify a non-success response from its status and body text.
    pub fn from_status(status: u16, body: &str) -> Self {
        if is_quota_message(body) {
            ProviderError::QuotaExhausted(excerpt(body))
        } else {
            ProviderError::HttpError { status }
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ProviderError::Timeout } else { ProviderError::Network(Arc::new(err)) }
    }
}

/// First 200 characters of a response body, for error messages.
pub(crate) fn excerpt(body: &str) -> String {
    body.trim().chars().take(200).collect()
}
