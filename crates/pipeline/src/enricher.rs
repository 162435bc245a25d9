//! Per-location enrichment.
//!
//! Each location runs two independent stages, web search and contract search.
//! Both follow the same path:
//!
//! ```text
//! build query -> cache lookup -> hit:  aggregate
//!                             -> miss: provider call (retried) -> cache write -> aggregate
//!                                      exhausted / terminal    -> aggregate(empty)
//! ```
//!
//! A stage failure never fails the location: it becomes a status and a note
//! on an otherwise valid [`LocationSummary`].

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use sitelens_client::{ContractProvider, JurisdictionLookup, RetryError, RetryingClient, SearchProvider, SearchQuery};
use sitelens_core::cache::{contract_cache_key, search_fingerprint};
use sitelens_core::{
    ContentCache, ContractAnalysis, ContractRecord, Coordinates, LocalityFilter, LocationRecord, SearchResult, analyze,
    build_contract_filter, build_search_query, format_usd,
};
use tokio_util::sync::CancellationToken;

use crate::{
    ContractSummary, EnrichError, EnrichSettings, LocationSummary, SearchSummary, StageOutcome, StageStatus,
};

/// Contract descriptions echoed in the per-location digest.
const SAMPLE_DESCRIPTIONS: usize = 3;

const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// Providers the enricher calls. A missing provider disables its stage.
#[derive(Clone, Default)]
pub struct Providers {
    pub search: Option<Arc<dyn SearchProvider>>,
    pub contracts: Option<Arc<dyn ContractProvider>>,
    /// Reverse lookup for contract scoping; the fallback jurisdiction is used without it.
    pub jurisdictions: Option<Arc<dyn JurisdictionLookup>>,
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("search", &self.search.is_some())
            .field("contracts", &self.contracts.is_some())
            .field("jurisdictions", &self.jurisdictions.is_some())
            .finish()
    }
}

/// The two content caches.
#[derive(Debug, Clone)]
pub struct Caches {
    pub search: ContentCache,
    pub contracts: ContentCache,
}

impl Caches {
    pub fn in_memory() -> Self {
        Self { search: ContentCache::in_memory(), contracts: ContentCache::in_memory() }
    }
}

/// Contracts qualifying around one point.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractSet {
    /// Jurisdiction the search was scoped to; unknown for cached sets.
    pub jurisdiction: Option<String>,
    pub records: Vec<ContractRecord>,
}

#[derive(Debug, Clone)]
pub struct Enricher {
    providers: Providers,
    caches: Caches,
    retry: RetryingClient,
    settings: EnrichSettings,
}

impl Enricher {
    pub fn new(providers: Providers, caches: Caches, retry: RetryingClient, settings: EnrichSettings) -> Self {
        Self { providers, caches, retry, settings }
    }

    /// Web search results for a location, served from cache when possible.
    pub async fn search_location_context(
        &self, record: &LocationRecord, cancel: &CancellationToken,
    ) -> Result<StageOutcome<Vec<SearchResult>>, EnrichError> {
        let provider = self.providers.search.as_ref().ok_or(EnrichError::Disabled)?;
        let max_results = self.settings.max_results;

        let query = build_search_query(record, &self.settings.qualifier);
        let key = search_fingerprint(&query, record.coordinates);

        if let Some(mut cached) = self.caches.search.get::<Vec<SearchResult>>(&key).await {
            tracing::debug!("cache hit for search query: {}", query);
            cached.truncate(max_results);
            return Ok(StageOutcome::cached(cached));
        }
        tracing::debug!("cache miss for search query: {}", query);

        let request = SearchQuery::new(query.clone(), max_results);
        let credential = provider.credential_suffix();
        let mut results = self
            .retry
            .execute(&query, credential.as_deref(), cancel, || provider.search(&request))
            .await?;
        results.truncate(max_results);

        if let Err(e) = self.caches.search.put(&key, &results).await {
            tracing::warn!("failed to persist search results for {}: {}", query, e);
        }

        Ok(StageOutcome::fresh(results))
    }

    /// Contracts qualifying within the configured radius of `point`.
    pub async fn search_contracts(
        &self, point: Coordinates, cancel: &CancellationToken,
    ) -> Result<StageOutcome<ContractSet>, EnrichError> {
        let provider = self.providers.contracts.as_ref().ok_or(EnrichError::Disabled)?;
        let key = contract_cache_key(point, self.settings.radius_miles);

        if let Some(records) = self.caches.contracts.get::<Vec<ContractRecord>>(&key).await {
            tracing::debug!("cache hit for contracts near {}", key);
            return Ok(StageOutcome::cached(ContractSet { jurisdiction: None, records }));
        }
        tracing::debug!("cache miss for contracts near {}", key);

        let jurisdiction = self.resolve_jurisdiction(point, cancel).await?;
        let filter = build_contract_filter(
            &jurisdiction,
            self.settings.period,
            Utc::now().date_naive(),
            self.settings.lookback_years,
        );

        let label = format!("contracts {} near ({:.4}, {:.4})", jurisdiction, point.latitude, point.longitude);
        tracing::info!("searching contracts in {} near ({}, {})", jurisdiction, point.latitude, point.longitude);
        let records = self.retry.execute(&label, None, cancel, || provider.fetch_awards(&filter)).await?;

        let locality = LocalityFilter::new(
            point,
            self.settings.radius_miles,
            &self.settings.zip_prefixes,
            self.settings.centroids.clone(),
        );
        let records = locality.apply(records);
        log_contract_digest(&jurisdiction, &records);

        if let Err(e) = self.caches.contracts.put(&key, &records).await {
            tracing::warn!("failed to persist contracts for {}: {}", key, e);
        }

        Ok(StageOutcome::fresh(ContractSet { jurisdiction: Some(jurisdiction), records }))
    }

    async fn resolve_jurisdiction(
        &self, point: Coordinates, cancel: &CancellationToken,
    ) -> Result<String, EnrichError> {
        let looked_up = match &self.providers.jurisdictions {
            Some(lookup) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled.into()),
                code = lookup.jurisdiction(point) => code,
            },
            None => None,
        };

        Ok(looked_up.unwrap_or_else(|| {
            tracing::debug!("using fallback jurisdiction {}", self.settings.fallback_jurisdiction);
            self.settings.fallback_jurisdiction.clone()
        }))
    }

    /// Enrich one location. Never fails: degraded stages carry a status and note.
    pub async fn enrich(&self, record: LocationRecord, cancel: &CancellationToken) -> LocationSummary {
        let record = record.normalized();
        let query = build_search_query(&record, &self.settings.qualifier);

        if cancel.is_cancelled() {
            return cancelled_summary(record, query);
        }

        tracing::info!("enriching location: {}", record.name);

        let search = match self.search_location_context(&record, cancel).await {
            Ok(outcome) => SearchSummary { status: outcome.status, query, results: outcome.value, note: None },
            Err(e) => {
                degraded("web search", &record.name, &e);
                SearchSummary { status: e.status(), query, results: Vec::new(), note: Some(e.note("Web search")) }
            }
        };
        log_search_digest(&record.name, &search);

        let outcome = match record.coordinates {
            Some(point) => self.search_contracts(point, cancel).await,
            None if self.providers.contracts.is_none() => Err(EnrichError::Disabled),
            None => Err(EnrichError::MissingCoordinates),
        };

        let contracts = match outcome {
            Ok(outcome) => ContractSummary {
                status: outcome.status,
                jurisdiction: outcome.value.jurisdiction,
                analysis: analyze(&outcome.value.records),
            },
            Err(e) => {
                degraded("contract search", &record.name, &e);
                ContractSummary {
                    status: e.status(),
                    jurisdiction: None,
                    analysis: ContractAnalysis::unavailable(e.note("Contract search")),
                }
            }
        };
        tracing::info!("{}: {}", record.name, contracts.analysis.summary);

        LocationSummary { location: record.name, coordinates: record.coordinates, search, contracts }
    }

    /// Enrich every location, at most `concurrency` at a time.
    ///
    /// Summaries come back in input order, one per record, including records
    /// left unprocessed by cancellation.
    pub async fn enrich_all(&self, records: Vec<LocationRecord>, cancel: &CancellationToken) -> Vec<LocationSummary> {
        let total = records.len();
        let concurrency = self.settings.concurrency.max(1);
        tracing::info!("enriching {} locations (concurrency {})", total, concurrency);

        let summaries: Vec<LocationSummary> = stream::iter(records)
            .map(|record| self.enrich(record, cancel))
            .buffered(concurrency)
            .collect()
            .await;

        let cancelled = summaries.iter().filter(|s| s.is_cancelled()).count();
        if cancelled > 0 {
            tracing::warn!("run cancelled: {} of {} locations incomplete", cancelled, total);
        }
        summaries
    }
}

fn cancelled_summary(record: LocationRecord, query: String) -> LocationSummary {
    let reason = EnrichError::from(RetryError::Cancelled);
    LocationSummary {
        location: record.name,
        coordinates: record.coordinates,
        search: SearchSummary {
            status: StageStatus::Cancelled,
            query,
            results: Vec::new(),
            note: Some(reason.note("Web search")),
        },
        contracts: ContractSummary {
            status: StageStatus::Cancelled,
            jurisdiction: None,
            analysis: ContractAnalysis::unavailable(reason.note("Contract search")),
        },
    }
}

fn degraded(stage: &str, location: &str, err: &EnrichError) {
    match err.status() {
        StageStatus::Skipped | StageStatus::Cancelled => tracing::debug!("{} for {}: {}", stage, location, err),
        _ => tracing::warn!("{} for {} degraded: {}", stage, location, err),
    }
}

fn log_search_digest(location: &str, search: &SearchSummary) {
    if !search.status.is_success() {
        return;
    }
    let titles: Vec<&str> = search.results.iter().map(|r| r.title.as_str()).filter(|t| !t.is_empty()).collect();
    tracing::info!(
        location,
        status = ?search.status,
        titles = ?titles,
        "{} search results for {}",
        search.results.len(),
        search.query
    );
}

fn log_contract_digest(jurisdiction: &str, records: &[ContractRecord]) {
    if records.is_empty() {
        tracing::info!("no contracts found in the specified area ({})", jurisdiction);
        return;
    }

    let total: f64 = records.iter().map(|r| r.award_amount).sum();
    let analysis = analyze(records);
    tracing::info!(
        agencies = ?analysis.agencies,
        "found {} relevant contracts in the area, total value {}",
        records.len(),
        format_usd(total)
    );

    for description in records
        .iter()
        .map(|r| r.description.trim())
        .filter(|d| !d.is_empty())
        .take(SAMPLE_DESCRIPTIONS)
    {
        let preview: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        tracing::info!("sample contract: {}", preview);
    }
}
