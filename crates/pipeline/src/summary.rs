//! Per-location enrichment output.

use serde::{Deserialize, Serialize};
use sitelens_client::{ProviderError, RetryError};
use sitelens_core::{ContractAnalysis, Coordinates, SearchResult};

/// How a pipeline stage reached its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Fetched from the provider during this run.
    Fresh,
    /// Served from the content cache.
    Cached,
    /// Every attempt failed; the result is empty.
    Exhausted,
    /// The provider reported an exhausted quota; no retry was made.
    QuotaExhausted,
    /// A non-retryable failure other than quota exhaustion.
    Failed,
    /// The run was cancelled before the stage completed.
    Cancelled,
    /// The stage did not run (disabled, or no coordinates).
    Skipped,
}

impl StageStatus {
    /// True when the stage produced provider-backed data.
    pub fn is_success(self) -> bool {
        matches!(self, StageStatus::Fresh | StageStatus::Cached)
    }
}

/// Why a stage produced no data.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error(transparent)]
    Retry(#[from] RetryError),

    #[error("location has no coordinates")]
    MissingCoordinates,

    #[error("stage disabled")]
    Disabled,
}

impl EnrichError {
    pub fn status(&self) -> StageStatus {
        match self {
            EnrichError::Retry(RetryError::Exhausted { .. }) => StageStatus::Exhausted,
            EnrichError::Retry(RetryError::Terminal(ProviderError::QuotaExhausted(_))) => StageStatus::QuotaExhausted,
            EnrichError::Retry(RetryError::Terminal(_)) => StageStatus::Failed,
            EnrichError::Retry(RetryError::Cancelled) => StageStatus::Cancelled,
            EnrichError::MissingCoordinates | EnrichError::Disabled => StageStatus::Skipped,
        }
    }

    /// One-line explanation carried in degraded summaries.
    pub fn note(&self, stage: &str) -> String {
        match self {
            EnrichError::Retry(RetryError::Exhausted { attempts, last }) => {
                format!("{} unavailable after {} attempts: {}", stage, attempts, last)
            }
            EnrichError::Retry(RetryError::Terminal(ProviderError::QuotaExhausted(_))) => {
                format!("{} unavailable: provider quota exhausted", stage)
            }
            EnrichError::Retry(RetryError::Terminal(e)) => format!("{} unavailable: {}", stage, e),
            EnrichError::Retry(RetryError::Cancelled) => format!("{} cancelled", stage),
            EnrichError::MissingCoordinates => format!("{} skipped: location has no coordinates", stage),
            EnrichError::Disabled => format!("{} skipped", stage),
        }
    }
}

/// A stage result together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome<T> {
    pub status: StageStatus,
    pub value: T,
}

impl<T> StageOutcome<T> {
    pub fn fresh(value: T) -> Self {
        Self { status: StageStatus::Fresh, value }
    }

    pub fn cached(value: T) -> Self {
        Self { status: StageStatus::Cached, value }
    }
}

/// Web search portion of a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub status: StageStatus,
    pub query: String,
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Contract portion of a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    pub analysis: ContractAnalysis,
}

/// Everything learned about one location. Always produced, even when every
/// stage failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub search: SearchSummary,
    pub contracts: ContractSummary,
}

impl LocationSummary {
    /// True when cancellation cut either stage short.
    pub fn is_cancelled(&self) -> bool {
        self.search.status == StageStatus::Cancelled || self.contracts.status == StageStatus::Cancelled
    }
}
