//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `search_radius_miles` is not a positive finite number
    /// - `max_attempts` is outside 1..=10
    /// - `timeout_ms` is below 100ms or above 5 minutes
    /// - `max_results` is outside 1..=100
    /// - `concurrency` is outside 1..=32
    /// - `fallback_jurisdiction` is empty
    /// - an allow-list entry is not a three-digit prefix
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.search_radius_miles.is_finite() || self.search_radius_miles <= 0.0 {
            return Err(invalid("search_radius_miles", "must be a positive number"));
        }

        if !(1..=10).contains(&self.max_attempts) {
            return Err(invalid("max_attempts", "must be between 1 and 10"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if !(1..=100).contains(&self.max_results) {
            return Err(invalid("max_results", "must be between 1 and 100"));
        }

        if !(1..=32).contains(&self.concurrency) {
            return Err(invalid("concurrency", "must be between 1 and 32"));
        }

        if self.fallback_jurisdiction.trim().is_empty() {
            return Err(invalid("fallback_jurisdiction", "must not be empty"));
        }

        if self
            .zip_prefix_allowlist
            .iter()
            .any(|p| p.len() != 3 || !p.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(invalid("zip_prefix_allowlist", "entries must be three-digit ZIP prefixes"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.zip_prefix_allowlist.is_empty() && self.postal_centroids_path.is_none() {
            tracing::warn!(
                "zip_prefix_allowlist is empty and no postal_centroids_path is set; \
                 no contract record can qualify"
            );
        }

        Ok(())
    }
}
