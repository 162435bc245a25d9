//! Search API response types and normalization.

use serde::Deserialize;
use sitelens_core::SearchResult;

/// Error text the API returns when a query simply matched nothing.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

/// Raw response from the search API.
#[derive(Debug, Deserialize)]
pub struct SerpApiResponse {
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Individual organic result. Every field may be missing.
#[derive(Debug, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl From<OrganicResult> for SearchResult {
    fn from(raw: OrganicResult) -> Self {
        Self {
            title: raw.title.unwrap_or_default(),
            link: raw.link.unwrap_or_default(),
            snippet: raw.snippet.unwrap_or_default(),
        }
    }
}

/// True when an API error message only reports an empty result page.
pub fn is_no_results_message(text: &str) -> bool {
    text.to_lowercase().contains(NO_RESULTS_MARKER)
}

impl SerpApiResponse {
    /// Normalized results, truncated to `limit`.
    pub fn into_results(self, limit: usize) -> Vec<SearchResult> {
        self.organic_results.into_iter().take(limit).map(SearchResult::from).collect()
    }
}
