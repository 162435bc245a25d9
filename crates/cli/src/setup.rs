//! Wiring configuration into caches, providers and the enricher.

use std::sync::Arc;

use anyhow::{Context, Result};
use sitelens_client::{AuditLog, RetryPolicy, RetryingClient, SerpClient, SerpConfig, SpendingClient, SpendingConfig};
use sitelens_core::cache::{CONTRACT_NAMESPACE, SEARCH_NAMESPACE};
use sitelens_core::{AppConfig, CacheBackend, CacheDb, ContentCache, JsonFileStore, PostalCentroids, SqliteStore};
use sitelens_pipeline::{Caches, EnrichSettings, Enricher, Providers};

/// Which pipeline stages run.
#[derive(Debug, Clone, Copy)]
pub struct Stages {
    pub search: bool,
    pub contracts: bool,
}

/// Open the configured cache backend.
///
/// A cache that cannot be opened is replaced by an in-memory one: the run
/// still completes, it just cannot reuse or persist results.
pub async fn open_caches(config: &AppConfig) -> Caches {
    let bypass = config.bust_cache;
    if bypass {
        tracing::info!("bust-cache mode: cached entries are ignored and refreshed");
    }

    let opened = match config.cache_backend {
        CacheBackend::Json => open_json_caches(config, bypass).await,
        CacheBackend::Sqlite => open_sqlite_caches(config, bypass).await,
    };

    opened.unwrap_or_else(|e| {
        tracing::warn!("cache unavailable, continuing without persistence: {:#}", e);
        Caches {
            search: ContentCache::new(Arc::new(sitelens_core::MemoryStore::default()), bypass),
            contracts: ContentCache::new(Arc::new(sitelens_core::MemoryStore::default()), bypass),
        }
    })
}

async fn open_json_caches(config: &AppConfig, bypass: bool) -> Result<Caches> {
    let search = JsonFileStore::open(config.search_cache_path()).await?;
    let contracts = JsonFileStore::open(config.contract_cache_path()).await?;
    tracing::debug!("using JSON caches in {}", config.cache_dir.display());

    Ok(Caches {
        search: ContentCache::new(Arc::new(search), bypass),
        contracts: ContentCache::new(Arc::new(contracts), bypass),
    })
}

async fn open_sqlite_caches(config: &AppConfig, bypass: bool) -> Result<Caches> {
    tokio::fs::create_dir_all(&config.cache_dir)
        .await
        .with_context(|| format!("failed to create {}", config.cache_dir.display()))?;
    let db = CacheDb::open(config.cache_db_path()).await?;
    tracing::debug!("using SQLite cache at {}", config.cache_db_path().display());

    Ok(Caches {
        search: ContentCache::new(Arc::new(SqliteStore::new(db.clone(), SEARCH_NAMESPACE)), bypass),
        contracts: ContentCache::new(Arc::new(SqliteStore::new(db, CONTRACT_NAMESPACE)), bypass),
    })
}

/// Open the audit log, or disable auditing if the file cannot be opened.
pub async fn open_audit_log(config: &AppConfig) -> AuditLog {
    match AuditLog::open(&config.audit_log_path).await {
        Ok(log) => log,
        Err(e) => {
            tracing::warn!("audit log {} unavailable: {}", config.audit_log_path.display(), e);
            AuditLog::disabled()
        }
    }
}

/// Build the providers for the enabled stages.
///
/// # Errors
///
/// Fails when search is enabled without an API key, or a provider cannot be
/// constructed from the configuration.
pub fn build_providers(config: &AppConfig, stages: Stages) -> Result<Providers> {
    let mut providers = Providers::default();

    if stages.search {
        config.require_search_api_key()?;
        let client = SerpClient::new(SerpConfig::from_app_config(config)).context("invalid search configuration")?;
        providers.search = Some(Arc::new(client));
    }

    if stages.contracts {
        let client = Arc::new(
            SpendingClient::new(SpendingConfig::from_app_config(config)).context("invalid spending configuration")?,
        );
        providers.contracts = Some(client.clone());
        providers.jurisdictions = Some(client);
    }

    Ok(providers)
}

/// Assemble the enricher from a validated configuration.
pub async fn build_enricher(config: &AppConfig, stages: Stages) -> Result<Enricher> {
    let providers = build_providers(config, stages)?;

    let centroids = match &config.postal_centroids_path {
        Some(path) => Some(Arc::new(PostalCentroids::load(path)?)),
        None => None,
    };

    let caches = open_caches(config).await;
    let retry = RetryingClient::new(RetryPolicy::from_config(config), open_audit_log(config).await);

    Ok(Enricher::new(providers, caches, retry, EnrichSettings::from_config(config, centroids)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_requires_api_key() {
        let config = AppConfig::default();
        let err = build_providers(&config, Stages { search: true, contracts: false }).unwrap_err();
        assert!(err.to_string().contains("search_api_key"));
    }

    #[test]
    fn test_skipping_search_needs_no_key() {
        let config = AppConfig::default();
        let providers = build_providers(&config, Stages { search: false, contracts: true }).unwrap();
        assert!(providers.search.is_none());
        assert!(providers.contracts.is_some());
        assert!(providers.jurisdictions.is_some());
    }

    #[tokio::test]
    async fn test_open_json_caches_in_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig { cache_dir: dir.path().join("cache"), ..Default::default() };

        let caches = open_caches(&config).await;
        caches.search.put("k", &vec![1, 2, 3]).await.unwrap();

        assert!(config.search_cache_path().exists());
        assert!(config.contract_cache_path().exists());
    }

    #[tokio::test]
    async fn test_open_sqlite_caches() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            AppConfig { cache_dir: dir.path().join("db"), cache_backend: CacheBackend::Sqlite, ..Default::default() };

        let caches = open_caches(&config).await;
        caches.contracts.put("36.1700_-115.1400_50", &Vec::<u8>::new()).await.unwrap();

        assert!(config.cache_db_path().exists());
    }
}
