//! Client-side locality filtering of contract records.
//!
//! The contract provider can only scope a search to a whole jurisdiction, so
//! records are qualified locally:
//!
//! 1. A record needs a usable five-digit place-of-performance ZIP.
//! 2. When the ZIP resolves to a known postal centroid, the record qualifies
//!    if that centroid lies within the search radius of the query point
//!    (great-circle distance).
//! 3. Otherwise the record qualifies if its three-digit ZIP prefix is in the
//!    configured allow-list.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::{ContractRecord, Coordinates, Error};

/// Mean Earth radius in statute miles.
const EARTH_RADIUS_MILES: f64 = 3958.8;

static ZIP_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^(\d{5})(?:-?\d{4})?$").ok());

/// Great-circle distance between two points in miles.
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

/// Extract the five-digit ZIP from a raw value (`89101` or `89101-1234`).
pub fn usable_zip(raw: &str) -> Option<&str> {
    let pattern = ZIP_PATTERN.as_ref()?;
    pattern.captures(raw.trim()).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// ZIP code to centroid lookup table.
#[derive(Debug, Clone, Default)]
pub struct PostalCentroids {
    centroids: HashMap<String, Coordinates>,
}

impl PostalCentroids {
    pub fn new(centroids: HashMap<String, Coordinates>) -> Self {
        Self { centroids }
    }

    /// Load a JSON object of `{"89101": {"latitude": .., "longitude": ..}}`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::InvalidInput(format!("postal centroids {}: {}", path.display(), e)))?;
        let centroids: HashMap<String, Coordinates> = serde_json::from_slice(&bytes)?;
        tracing::debug!(path = %path.display(), count = centroids.len(), "loaded postal centroids");
        Ok(Self { centroids })
    }

    pub fn get(&self, zip: &str) -> Option<Coordinates> {
        self.centroids.get(zip).copied()
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

/// Decides whether a contract record lies near a query point.
#[derive(Debug, Clone)]
pub struct LocalityFilter {
    origin: Coordinates,
    radius_miles: f64,
    prefixes: HashSet<String>,
    centroids: Option<Arc<PostalCentroids>>,
}

impl LocalityFilter {
    pub fn new(
        origin: Coordinates, radius_miles: f64, prefixes: &[String], centroids: Option<Arc<PostalCentroids>>,
    ) -> Self {
        Self { origin, radius_miles, prefixes: prefixes.iter().map(|p| p.trim().to_string()).collect(), centroids }
    }

    /// True when the record qualifies as being within the search area.
    pub fn qualifies(&self, record: &ContractRecord) -> bool {
        let Some(zip) = usable_zip(&record.place_of_performance_zip) else {
            return false;
        };

        if let Some(centroid) = self.centroids.as_ref().and_then(|c| c.get(zip)) {
            return haversine_miles(self.origin, centroid) <= self.radius_miles;
        }

        self.prefixes.contains(&zip[..3])
    }

    /// Keep only qualifying records, preserving order.
    pub fn apply(&self, records: Vec<ContractRecord>) -> Vec<ContractRecord> {
        let total = records.len();
        let kept: Vec<ContractRecord> = records.into_iter().filter(|r| self.qualifies(r)).collect();
        tracing::debug!(total, kept = kept.len(), radius_miles = self.radius_miles, "applied locality filter");
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAS_VEGAS: Coordinates = Coordinates { latitude: 36.17, longitude: -115.14 };
    const RENO: Coordinates = Coordinates { latitude: 39.53, longitude: -119.81 };

    fn prefixes() -> Vec<String> {
        ["890", "891", "893", "894", "895", "889"].iter().map(|s| s.to_string()).collect()
    }

    fn contract(zip: &str) -> ContractRecord {
        ContractRecord {
            award_id: format!("AWD-{zip}"),
            recipient_name: "Acme".into(),
            award_amount: 100.0,
            place_of_performance_zip: zip.into(),
            description: String::new(),
            awarding_agency: String::new(),
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        let d = haversine_miles(LAS_VEGAS, RENO);
        assert!((d - 345.0).abs() < 10.0, "unexpected distance {d}");
        assert_eq!(haversine_miles(LAS_VEGAS, LAS_VEGAS), 0.0);
    }

    #[test]
    fn test_usable_zip() {
        assert_eq!(usable_zip("89101"), Some("89101"));
        assert_eq!(usable_zip(" 89101-1234 "), Some("89101"));
        assert_eq!(usable_zip("891011234"), Some("89101"));
        assert_eq!(usable_zip(""), None);
        assert_eq!(usable_zip("891"), None);
        assert_eq!(usable_zip("ABCDE"), None);
    }

    #[test]
    fn test_prefix_allow_list() {
        let filter = LocalityFilter::new(LAS_VEGAS, 50.0, &prefixes(), None);
        assert!(filter.qualifies(&contract("89101")));
        assert!(filter.qualifies(&contract("88901")));
        assert!(!filter.qualifies(&contract("90210")));
    }

    #[test]
    fn test_missing_zip_dropped() {
        let filter = LocalityFilter::new(LAS_VEGAS, 50.0, &prefixes(), None);
        assert!(!filter.qualifies(&contract("")));
        assert!(!filter.qualifies(&contract("n/a")));
    }

    #[test]
    fn test_centroid_distance_wins_over_prefix() {
        let mut table = HashMap::new();
        table.insert("89101".to_string(), Coordinates::new(36.17, -115.13));
        table.insert("89501".to_string(), RENO);
        let centroids = Arc::new(PostalCentroids::new(table));
        let filter = LocalityFilter::new(LAS_VEGAS, 50.0, &prefixes(), Some(centroids));

        assert!(filter.qualifies(&contract("89101")));
        // Reno shares an allowed prefix but is ~345 miles away.
        assert!(!filter.qualifies(&contract("89501")));
        // Unresolved ZIPs fall back to the prefix list.
        assert!(filter.qualifies(&contract("89030")));
    }

    #[test]
    fn test_apply_preserves_order() {
        let filter = LocalityFilter::new(LAS_VEGAS, 50.0, &prefixes(), None);
        let kept = filter.apply(vec![contract("89101"), contract("10001"), contract(""), contract("89502")]);
        let ids: Vec<&str> = kept.iter().map(|c| c.award_id.as_str()).collect();
        assert_eq!(ids, vec!["AWD-89101", "AWD-89502"]);
    }

    #[test]
    fn test_load_centroids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zips.json");
        std::fs::write(&path, r#"{"89101": {"latitude": 36.17, "longitude": -115.13}}"#).unwrap();

        let centroids = PostalCentroids::load(&path).unwrap();
        assert_eq!(centroids.len(), 1);
        assert_eq!(centroids.get("89101"), Some(Coordinates::new(36.17, -115.13)));
    }
}
