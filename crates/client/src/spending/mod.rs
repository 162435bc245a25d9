//! Federal spending API client.
//!
//! Two endpoints under one root:
//!
//! - `GET {root}/recipient/state/{lat}/{lon}/` resolves the jurisdiction code
//!   of a point. Any failure yields `None`; the caller picks the fallback.
//! - `POST {root}/search/spending_by_award/` runs a contract award search with
//!   a [`ContractFilter`] payload and returns `{results: [...]}` rows keyed by
//!   display column names, reshaped here into [`ContractRecord`]s.

pub mod response;

pub use response::{AwardRow, AwardSearchResponse, StateResponse, UNKNOWN_RECIPIENT};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use sitelens_core::{AppConfig, ContractFilter, ContractRecord, Coordinates};
use url::Url;

use crate::{ContractProvider, JurisdictionLookup, ProviderError};

/// Default API root.
const DEFAULT_BASE_URL: &str = "https://api.usaspending.gov/api/v2";

/// Spending client configuration.
#[derive(Debug, Clone)]
pub struct SpendingConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SpendingConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.into(), timeout: Duration::from_secs(20), user_agent: "sitelens/0.1".into() }
    }
}

impl SpendingConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.spending_base_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Spending API client.
#[derive(Debug, Clone)]
pub struct SpendingClient {
    http: reqwest::Client,
    root: Url,
}

impl SpendingClient {
    pub fn new(config: SpendingConfig) -> Result<Self, ProviderError> {
        let root = format!("{}/", config.base_url.trim_end_matches('/'));
        let root = Url::parse(&root).map_err(|e| {
            ProviderError::InvalidRequest(format!("invalid spending base URL {}: {}", config.base_url, e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self { http, root })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.root.join(path).map_err(|e| ProviderError::InvalidRequest(e.to_string()))
    }

    /// Resolve the jurisdiction code for a point.
    pub async fn lookup_state(&self, point: Coordinates) -> Result<Option<String>, ProviderError> {
        let url = self.endpoint(&format!("recipient/state/{}/{}/", point.latitude, point.longitude))?;

        let http_response = self.http.get(url).header(header::ACCEPT, "application/json").send().await?;
        let status = http_response.status();
        let body = http_response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let parsed: StateResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(parsed.state_code.map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()))
    }

    /// Run one award search attempt.
    pub async fn search_awards(&self, filter: &ContractFilter) -> Result<Vec<ContractRecord>, ProviderError> {
        let url = self.endpoint("search/spending_by_award/")?;
        let start = Instant::now();

        tracing::debug!("searching awards in {}", filter.jurisdiction().unwrap_or("-"));

        let http_response = self
            .http
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(filter)
            .send()
            .await?;

        let status = http_response.status();
        let body = http_response.text().await?;
        tracing::debug!("spending API response status: {}", status);

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let parsed: AwardSearchResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let total = parsed.results.len();
        let records: Vec<ContractRecord> = parsed.results.into_iter().filter_map(AwardRow::into_record).collect();
        if records.len() < total {
            tracing::debug!("dropped {} award rows with unusable amounts", total - records.len());
        }

        tracing::info!(
            "found {} contracts in {} ({:?})",
            records.len(),
            filter.jurisdiction().unwrap_or("-"),
            start.elapsed()
        );
        Ok(records)
    }
}

#[async_trait]
impl JurisdictionLookup for SpendingClient {
    async fn jurisdiction(&self, point: Coordinates) -> Option<String> {
        match self.lookup_state(point).await {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(
                    latitude = point.latitude,
                    longitude = point.longitude,
                    "jurisdiction lookup failed: {}",
                    e
                );
                None
            }
        }
    }
}

#[async_trait]
impl ContractProvider for SpendingClient {
    async fn fetch_awards(&self, filter: &ContractFilter) -> Result<Vec<ContractRecord>, ProviderError> {
        self.search_awards(filter).await
    }
}
