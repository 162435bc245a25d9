//! Loading location records produced by the upstream document parser.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use sitelens_core::LocationRecord;

/// Accepted input shapes: a bare array, or an object wrapping one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LocationDocument {
    List(Vec<LocationRecord>),
    Wrapped { locations: Vec<LocationRecord> },
}

/// Parse location records from JSON text, normalized and capped at `max_places`.
pub fn parse_locations(text: &str, max_places: Option<usize>) -> Result<Vec<LocationRecord>> {
    let document: LocationDocument = serde_json::from_str(text).context("input is not a list of locations")?;
    let records = match document {
        LocationDocument::List(records) => records,
        LocationDocument::Wrapped { locations } => locations,
    };

    let total = records.len();
    let limit = max_places.unwrap_or(total);
    let records: Vec<LocationRecord> = records.into_iter().take(limit).map(LocationRecord::normalized).collect();

    if records.len() < total {
        tracing::info!("processing {} of {} locations", records.len(), total);
    }
    Ok(records)
}

/// Read and parse the input file.
pub async fn load_locations(path: &Path, max_places: Option<usize>) -> Result<Vec<LocationRecord>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_locations(&text, max_places).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "name": "Imminent Domain",
            "coordinates": {"lat": 36.17, "lon": -115.14},
            "extended_data": {"owner": "county"},
            "context": {"organizations": [], "locations": ["Las Vegas"], "key_terms": ["Imminent", "Domain"]}
        },
        {"name": "", "coordinates": null},
        {"name": "Reno Yard", "coordinates": {"latitude": 39.53, "longitude": -119.81}}
    ]"#;

    #[test]
    fn test_parse_array() {
        let records = parse_locations(SAMPLE, None).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].coordinates.map(|c| c.latitude), Some(36.17));
        assert_eq!(records[0].extended_attributes.get("owner").map(String::as_str), Some("county"));
        assert_eq!(records[1].name, "Unknown Location");
        assert_eq!(records[1].context.key_terms, vec!["Unknown Location"]);
        assert_eq!(records[2].context.key_terms, vec!["Reno Yard"]);
    }

    #[test]
    fn test_parse_wrapped_with_limit() {
        let text = format!(r#"{{"locations": {}}}"#, SAMPLE);
        let records = parse_locations(&text, Some(2)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Imminent Domain");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_locations("{\"name\": 5}", None).is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let records = load_locations(&path, Some(1)).await.unwrap();
        assert_eq!(records.len(), 1);

        assert!(load_locations(&dir.path().join("missing.json"), None).await.is_err());
    }
}
