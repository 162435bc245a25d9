//! Query construction for the search and contract providers.
//!
//! Both builders are pure: the same inputs always produce the same query.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::LocationRecord;

/// Tokens never used as search terms (compared case-insensitively).
const STOPWORDS: &[&str] = &["the", "and", "test", "model", "city"];

/// Award type codes for contracts (definitive, purchase order, delivery order, BPA call).
const CONTRACT_AWARD_TYPES: &[&str] = &["A", "B", "C", "D"];

/// Columns requested from the contract provider.
const CONTRACT_FIELDS: &[&str] = &[
    "Award ID",
    "Recipient Name",
    "Award Amount",
    "Start Date",
    "End Date",
    "Place of Performance Zip5",
    "Description",
    "Awarding Agency",
    "Funding Agency",
    "Place of Performance State Code",
    "Place of Performance City Code",
];

/// Page size requested from the contract provider (the API maximum).
const CONTRACT_PAGE_LIMIT: u32 = 100;

/// Build the single search query for a location.
///
/// Takes the first two name tokens longer than two characters that are not
/// stopwords (or the raw name when none qualify) and appends `qualifier`.
pub fn build_search_query(record: &LocationRecord, qualifier: &str) -> String {
    let terms: Vec<&str> = record
        .name
        .split_whitespace()
        .filter(|token| token.chars().count() > 2)
        .filter(|token| !STOPWORDS.iter().any(|stop| token.eq_ignore_ascii_case(stop)))
        .take(2)
        .collect();

    let base = if terms.is_empty() { record.name.trim().to_string() } else { terms.join(" ") };

    let qualifier = qualifier.trim();
    if qualifier.is_empty() { base } else { format!("{base} {qualifier}") }
}

/// Inclusive date range for award records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TimePeriod {
    /// The `years` (of 365 days) ending at `today`.
    pub fn trailing_years(today: NaiveDate, years: u32) -> Self {
        Self { start_date: today - Duration::days(365 * i64::from(years)), end_date: today }
    }
}

/// Place-of-performance constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOfPerformance {
    pub country: String,
    pub state: String,
}

/// Server-side filters of a contract search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardFilters {
    pub award_type_codes: Vec<String>,
    pub time_period: Vec<TimePeriod>,
    pub place_of_performance_locations: Vec<PlaceOfPerformance>,
}

/// Complete contract search payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFilter {
    pub filters: AwardFilters,
    pub fields: Vec<String>,
    pub page: u32,
    pub limit: u32,
    pub sort: String,
    pub order: String,
}

impl ContractFilter {
    /// Jurisdiction this filter is scoped to.
    pub fn jurisdiction(&self) -> Option<&str> {
        self.filters.place_of_performance_locations.first().map(|p| p.state.as_str())
    }
}

/// Build the contract search payload for a jurisdiction.
///
/// When `period` is `None` the trailing `lookback_years` ending `today` is used.
pub fn build_contract_filter(
    jurisdiction: &str, period: Option<TimePeriod>, today: NaiveDate, lookback_years: u32,
) -> ContractFilter {
    let period = period.unwrap_or_else(|| TimePeriod::trailing_years(today, lookback_years));

    ContractFilter {
        filters: AwardFilters {
            award_type_codes: CONTRACT_AWARD_TYPES.iter().map(|s| s.to_string()).collect(),
            time_period: vec![period],
            place_of_performance_locations: vec![PlaceOfPerformance {
                country: "USA".into(),
                state: jurisdiction.trim().to_uppercase(),
            }],
        },
        fields: CONTRACT_FIELDS.iter().map(|s| s.to_string()).collect(),
        page: 1,
        limit: CONTRACT_PAGE_LIMIT,
        sort: "Award Amount".into(),
        order: "desc".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinates;

    fn record(name: &str) -> LocationRecord {
        LocationRecord::new(name, Some(Coordinates::new(36.17, -115.14)))
    }

    #[test]
    fn test_two_leading_terms() {
        assert_eq!(build_search_query(&record("Imminent Domain"), "Nevada"), "Imminent Domain Nevada");
        assert_eq!(
            build_search_query(&record("Imminent Domain Holdings West"), "Nevada"),
            "Imminent Domain Nevada"
        );
    }

    #[test]
    fn test_stopwords_and_short_tokens_dropped() {
        assert_eq!(build_search_query(&record("The Test Model of Spring Valley"), "Nevada"), "Spring Valley Nevada");
        assert_eq!(build_search_query(&record("THE CITY of Henderson"), "Nevada"), "Henderson Nevada");
    }

    #[test]
    fn test_single_term() {
        assert_eq!(build_search_query(&record("St 7 Sunrise"), "Nevada"), "Sunrise Nevada");
    }

    #[test]
    fn test_raw_name_when_nothing_qualifies() {
        assert_eq!(build_search_query(&record("The A1 B2"), "Nevada"), "The A1 B2 Nevada");
    }

    #[test]
    fn test_empty_qualifier() {
        assert_eq!(build_search_query(&record("Imminent Domain"), ""), "Imminent Domain");
    }

    #[test]
    fn test_query_is_deterministic() {
        let r = record("Desert Rose Apartments");
        assert_eq!(build_search_query(&r, "Nevada"), build_search_query(&r, "Nevada"));
    }

    #[test]
    fn test_contract_filter_defaults_to_trailing_decade() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let filter = build_contract_filter("nv", None, today, 10);

        let period = filter.filters.time_period[0];
        assert_eq!(period.end_date, today);
        assert_eq!(period.start_date, today - Duration::days(3650));
        assert_eq!(filter.jurisdiction(), Some("NV"));
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.filters.award_type_codes, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_contract_filter_explicit_period() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let period = TimePeriod {
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        };
        let filter = build_contract_filter("CA", Some(period), today, 10);
        assert_eq!(filter.filters.time_period, vec![period]);
    }

    #[test]
    fn test_contract_filter_payload_shape() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let payload = serde_json::to_value(build_contract_filter("NV", None, today, 10)).unwrap();

        assert_eq!(payload["filters"]["time_period"][0]["end_date"], "2026-10-19");
        assert_eq!(payload["filters"]["place_of_performance_locations"][0]["country"], "USA");
        assert_eq!(payload["sort"], "Award Amount");
        assert_eq!(payload["order"], "desc");
        assert_eq!(payload["fields"].as_array().unwrap().len(), 11);
    }
}
