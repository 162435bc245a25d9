//! Provider seams used by the enrichment pipeline.
//!
//! The HTTP clients in [`crate::serp`] and [`crate::spending`] implement these
//! traits; tests substitute in-process fakes.

use async_trait::async_trait;
use sitelens_core::{ContractFilter, ContractRecord, Coordinates, SearchResult};

use crate::ProviderError;

/// A provider-agnostic web search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: String,
    pub num: usize,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>, num: usize) -> Self {
        Self { q: q.into(), num }
    }
}

/// Free-text web search.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search attempt.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ProviderError>;

    /// Suffix of the credential in use, recorded in the audit log.
    fn credential_suffix(&self) -> Option<String> {
        None
    }
}

/// Contract award search scoped by a structured filter.
#[async_trait]
pub trait ContractProvider: Send + Sync {
    /// Run one contract search attempt.
    async fn fetch_awards(&self, filter: &ContractFilter) -> Result<Vec<ContractRecord>, ProviderError>;
}

/// Reverse lookup of the jurisdiction containing a point.
#[async_trait]
pub trait JurisdictionLookup: Send + Sync {
    /// Jurisdiction code, or `None` when the lookup failed or found nothing.
    async fn jurisdiction(&self, point: Coordinates) -> Option<String>;
}
