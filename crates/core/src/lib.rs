//! Core types and shared functionality for sitelens.
//!
//! This crate provides:
//! - Location, search and contract data types
//! - Content-addressed cache with JSON file, SQLite and in-memory stores
//! - Query construction, locality filtering and contract aggregation
//! - Unified error types
//! - Configuration structures

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod query;
pub mod types;

pub use analysis::{analyze, format_usd};
pub use cache::{CacheDb, CacheStore, ContentCache, JsonFileStore, MemoryStore, SqliteStore};
pub use config::{AppConfig, CacheBackend, ConfigError};
pub use error::Error;
pub use geo::{LocalityFilter, PostalCentroids, haversine_miles};
pub use query::{ContractFilter, TimePeriod, build_contract_filter, build_search_query};
pub use types::{
    ContractAnalysis, ContractRecord, ContractorTotal, Coordinates, LocationContext, LocationRecord, SearchResult,
};
