//! Search API request parameters and validation.

use serde::Serialize;

use crate::ProviderError;

/// Longest query the search API accepts.
const MAX_QUERY_CHARS: usize = 400;

/// Query-string parameters of one search call.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Engine identifier (e.g. "google").
    pub engine: String,

    /// Search query.
    pub q: String,

    /// Number of results (1-100).
    pub num: usize,

    /// Country code.
    pub gl: String,

    /// Interface language.
    pub hl: String,

    /// Optional geographic bias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Optional engine domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_domain: Option<String>,
}

impl SearchRequest {
    /// Validate the request parameters.
    ///
    /// Invalid requests are terminal: sending them again cannot succeed.
    pub fn validate(&self) -> Result<(), ProviderError> {
        let q = self.q.trim();
        if q.is_empty() {
            return Err(ProviderError::InvalidRequest("query cannot be empty".into()));
        }

        let chars = q.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(ProviderError::InvalidRequest(format!(
                "query too long: {} chars (max {})",
                chars, MAX_QUERY_CHARS
            )));
        }

        if !(1..=100).contains(&self.num) {
            return Err(ProviderError::InvalidRequest(format!("num must be 1-100, got {}", self.num)));
        }

        if self.engine.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("engine cannot be empty".into()));
        }

        Ok(())
    }
}
