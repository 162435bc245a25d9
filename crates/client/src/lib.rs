//! Network clients for sitelens.
//!
//! This crate provides the retrying call wrapper with its audit log, and the
//! HTTP providers the enrichment pipeline talks to: the web search API, and the
//! spending API's jurisdiction lookup and contract search.

pub mod audit;
pub mod error;
pub mod provider;
pub mod retry;
pub mod serp;
pub mod spending;

pub use audit::{AuditLog, AuditRecord, credential_suffix};
pub use error::{ProviderError, is_quota_message};
pub use provider::{ContractProvider, JurisdictionLookup, SearchProvider, SearchQuery};
pub use retry::{RetryError, RetryPolicy, RetryingClient};
pub use serp::{SerpClient, SerpConfig};
pub use spending::{SpendingClient, SpendingConfig};
