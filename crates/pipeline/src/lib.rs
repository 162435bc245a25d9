//! Location enrichment pipeline for sitelens.
//!
//! Takes parsed [`sitelens_core::LocationRecord`]s and produces one
//! [`LocationSummary`] per record: web search context plus an analysis of the
//! federal contracts performed nearby. Provider calls go through the
//! retrying client, results through the content caches. Locations are
//! independent and may be processed concurrently; output order always
//! matches input order.

pub mod enricher;
pub mod settings;
pub mod summary;

pub use enricher::{Caches, ContractSet, Enricher, Providers};
pub use settings::EnrichSettings;
pub use summary::{ContractSummary, EnrichError, LocationSummary, SearchSummary, StageOutcome, StageStatus};
