//! Content-addressed cache key generation.
//!
//! Coordinates are rounded to four decimal places (about 11 m) before they
//! take part in a key, so readings that round identically share an entry.

use sha2::{Digest, Sha256};

use crate::Coordinates;

const COORDINATE_SCALE: f64 = 10_000.0;

/// Round a coordinate component to four decimal places.
///
/// Negative zero is folded into zero so `-0.00001` and `0.00001` agree.
pub fn round_coordinate(value: f64) -> f64 {
    let rounded = (value * COORDINATE_SCALE).round() / COORDINATE_SCALE;
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn normalize_query(query: &str) -> String {
    query.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Compute the cache key for a web search.
///
/// SHA-256 over the normalized query and the rounded coordinates.
pub fn search_fingerprint(query: &str, coordinates: Option<Coordinates>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hasher.update(b"|");
    match coordinates {
        Some(c) => {
            hasher.update(format!("{:.4}", round_coordinate(c.latitude)).as_bytes());
            hasher.update(b"|");
            hasher.update(format!("{:.4}", round_coordinate(c.longitude)).as_bytes());
        }
        None => hasher.update(b"-"),
    }
    hex::encode(hasher.finalize())
}

/// Compute the cache key for a contract search around a point.
pub fn contract_cache_key(coordinates: Coordinates, radius_miles: f64) -> String {
    format!(
        "{:.4}_{:.4}_{}",
        round_coordinate(coordinates.latitude),
        round_coordinate(coordinates.longitude),
        radius_miles
    )
}
