//! Enrichment settings derived from [`AppConfig`].

use std::sync::Arc;

use sitelens_core::{AppConfig, PostalCentroids, TimePeriod};

#[derive(Debug, Clone)]
pub struct EnrichSettings {
    /// Jurisdiction qualifier appended to search queries.
    pub qualifier: String,
    pub radius_miles: f64,
    /// Search results kept per location.
    pub max_results: usize,
    pub fallback_jurisdiction: String,
    pub lookback_years: u32,
    /// Explicit award period; the trailing `lookback_years` when `None`.
    pub period: Option<TimePeriod>,
    pub zip_prefixes: Vec<String>,
    pub centroids: Option<Arc<PostalCentroids>>,
    /// Locations enriched at once.
    pub concurrency: usize,
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default(), None)
    }
}

impl EnrichSettings {
    pub fn from_config(config: &AppConfig, centroids: Option<Arc<PostalCentroids>>) -> Self {
        Self {
            qualifier: config.search_qualifier.trim().to_string(),
            radius_miles: config.search_radius_miles,
            max_results: config.max_results,
            fallback_jurisdiction: config.fallback_jurisdiction.trim().to_uppercase(),
            lookback_years: config.lookback_years,
            period: None,
            zip_prefixes: config.zip_prefix_allowlist.clone(),
            centroids,
            concurrency: config.concurrency.max(1),
        }
    }
}
