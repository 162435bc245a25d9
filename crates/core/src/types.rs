//! Location, search and contract data types shared by every crate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Name used when a placemark yields no usable name.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Name-derived context produced by the upstream classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationContext {
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub key_terms: Vec<String>,
}

impl LocationContext {
    /// Context used when classification failed: only the name as a key term.
    pub fn fallback(name: &str) -> Self {
        Self { organizations: Vec::new(), locations: Vec::new(), key_terms: vec![name.to_string()] }
    }
}

/// One named point from the upstream geospatial document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default, alias = "extended_data")]
    pub extended_attributes: HashMap<String, String>,
    #[serde(default)]
    pub context: LocationContext,
}

impl LocationRecord {
    pub fn new(name: impl Into<String>, coordinates: Option<Coordinates>) -> Self {
        let name = name.into();
        let context = LocationContext::fallback(&name);
        Self { name, coordinates, extended_attributes: HashMap::new(), context }
    }

    /// Enforce the record invariants: a non-empty name and at least one key term.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.name.trim();
        self.name = if trimmed.is_empty() { UNKNOWN_LOCATION.to_string() } else { trimmed.to_string() };

        if self.context.key_terms.is_empty() {
            self.context.key_terms.push(self.name.clone());
        }
        self
    }
}

/// Normalized web search result. Absent provider fields become empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// A federal contract award, reshaped from the provider's row format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub award_id: String,
    pub recipient_name: String,
    /// Never negative; rows that would violate this are dropped when reshaped.
    pub award_amount: f64,
    /// Raw place-of-performance ZIP; may be empty or malformed.
    #[serde(default)]
    pub place_of_performance_zip: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub awarding_agency: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Summed award value for a single recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractorTotal {
    pub recipient_name: String,
    pub total: f64,
}

/// Reduction of a qualifying contract set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractAnalysis {
    pub total_contracts: usize,
    pub total_value: f64,
    /// At most five recipients, largest summed value first.
    pub top_contractors: Vec<ContractorTotal>,
    /// Distinct awarding agencies in first-seen order.
    #[serde(default)]
    pub agencies: Vec<String>,
    pub summary: String,
}

impl ContractAnalysis {
    /// Zero-valued analysis carrying an explanatory summary.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            total_contracts: 0,
            total_value: 0.0,
            top_contractors: Vec::new(),
            agencies: Vec::new(),
            summary: reason.into(),
        }
    }
}
