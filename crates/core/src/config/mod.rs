//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SITELENS_*)
//! 2. TOML config file (if SITELENS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Durable store backing the content caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One JSON file per cache, rewritten on every write.
    #[default]
    Json,
    /// A single SQLite database shared by both caches.
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SITELENS_*)
/// 2. TOML config file (if SITELENS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer token for the search provider.
    ///
    /// Set via SITELENS_SEARCH_API_KEY. Required only when web search runs.
    #[serde(default)]
    pub search_api_key: Option<String>,

    /// Search provider endpoint.
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,

    /// Search engine identifier sent as `engine`.
    #[serde(default = "default_search_engine")]
    pub search_engine: String,

    /// Country code sent as `gl`.
    #[serde(default = "default_search_country")]
    pub search_country: String,

    /// Interface language sent as `hl`.
    #[serde(default = "default_search_language")]
    pub search_language: String,

    /// Optional geographic bias sent as `location`.
    #[serde(default)]
    pub search_location: Option<String>,

    /// Optional engine domain sent as `google_domain`.
    #[serde(default)]
    pub search_domain: Option<String>,

    /// Jurisdiction qualifier appended to every search query.
    #[serde(default = "default_search_qualifier")]
    pub search_qualifier: String,

    /// Spending API root used for jurisdiction lookups and contract searches.
    #[serde(default = "default_spending_base_url")]
    pub spending_base_url: String,

    /// Jurisdiction used when reverse lookup yields nothing.
    #[serde(default = "default_fallback_jurisdiction")]
    pub fallback_jurisdiction: String,

    /// Radius around each location for contract qualification.
    #[serde(default = "default_search_radius_miles")]
    pub search_radius_miles: f64,

    /// Three-digit ZIP prefixes accepted when a ZIP has no known centroid.
    #[serde(default = "default_zip_prefix_allowlist")]
    pub zip_prefix_allowlist: Vec<String>,

    /// Optional JSON table of ZIP centroids enabling true radius filtering.
    #[serde(default)]
    pub postal_centroids_path: Option<PathBuf>,

    /// Trailing window, in years, for contract searches.
    #[serde(default = "default_lookback_years")]
    pub lookback_years: u32,

    /// Durable store for the caches.
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Directory holding cache files.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Append-only audit log of provider attempts (JSON lines).
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: PathBuf,

    /// Ignore cached entries and refresh them.
    #[serde(default)]
    pub bust_cache: bool,

    /// Maximum attempts per provider call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds; doubles after each failed attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Add random jitter to backoff delays.
    #[serde(default = "default_true")]
    pub retry_jitter: bool,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Search results kept per location.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Locations enriched concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_search_base_url() -> String {
    "https://serpapi.com/search".into()
}

fn default_search_engine() -> String {
    "google".into()
}

fn default_search_country() -> String {
    "us".into()
}

fn default_search_language() -> String {
    "en".into()
}

fn default_search_qualifier() -> String {
    "Nevada".into()
}

fn default_spending_base_url() -> String {
    "https://api.usaspending.gov/api/v2".into()
}

fn default_fallback_jurisdiction() -> String {
    "NV".into()
}

fn default_search_radius_miles() -> f64 {
    50.0
}

fn default_zip_prefix_allowlist() -> Vec<String> {
    // Las Vegas (890-891), Reno (893-895) and rural Nevada (889).
    ["890", "891", "893", "894", "895", "889"].iter().map(|s| s.to_string()).collect()
}

fn default_lookback_years() -> u32 {
    10
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./.sitelens-cache")
}

fn default_audit_log_path() -> PathBuf {
    default_cache_dir().join("search_audit.jsonl")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_user_agent() -> String {
    "sitelens/0.1".into()
}

fn default_max_results() -> usize {
    5
}

fn default_concurrency() -> usize {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_api_key: None,
            search_base_url: default_search_base_url(),
            search_engine: default_search_engine(),
            search_country: default_search_country(),
            search_language: default_search_language(),
            search_location: None,
            search_domain: None,
            search_qualifier: default_search_qualifier(),
            spending_base_url: default_spending_base_url(),
            fallback_jurisdiction: default_fallback_jurisdiction(),
            search_radius_miles: default_search_radius_miles(),
            zip_prefix_allowlist: default_zip_prefix_allowlist(),
            postal_centroids_path: None,
            lookback_years: default_lookback_years(),
            cache_backend: CacheBackend::default(),
            cache_dir: default_cache_dir(),
            audit_log_path: default_audit_log_path(),
            bust_cache: false,
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            retry_jitter: true,
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            max_results: default_max_results(),
            concurrency: default_concurrency(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base backoff delay as Duration.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Path of the search cache file (JSON backend).
    pub fn search_cache_path(&self) -> PathBuf {
        self.cache_dir.join("search_cache.json")
    }

    /// Path of the contract cache file (JSON backend).
    pub fn contract_cache_path(&self) -> PathBuf {
        self.cache_dir.join("contract_cache.json")
    }

    /// Path of the shared cache database (SQLite backend).
    pub fn cache_db_path(&self) -> PathBuf {
        self.cache_dir.join("cache.sqlite")
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SITELENS_`
    /// 2. TOML file from `SITELENS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SITELENS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SITELENS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Return the search API key, failing at startup when it is absent.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set or blank.
    pub fn require_search_api_key(&self) -> Result<&str, ConfigError> {
        self.search_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "search_api_key".into(),
                hint: "Set SITELENS_SEARCH_API_KEY environment variable".into(),
            })
    }
}
