//! Reduction of qualifying contract records into a per-location summary.

use std::collections::HashMap;

use crate::{ContractAnalysis, ContractRecord, ContractorTotal};

/// Number of recipients listed in `top_contractors`.
pub const TOP_CONTRACTORS: usize = 5;

/// Summary used when no contract qualifies.
pub const NO_CONTRACTS_SUMMARY: &str = "No contracts found in this area.";

/// Summarize a qualifying contract set.
///
/// Recipients are grouped by name and ranked by summed award amount; ties keep
/// the order in which the recipients were first encountered.
pub fn analyze(records: &[ContractRecord]) -> ContractAnalysis {
    if records.is_empty() {
        return ContractAnalysis::unavailable(NO_CONTRACTS_SUMMARY);
    }

    let mut totals: Vec<ContractorTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut agencies: Vec<String> = Vec::new();
    let mut total_value = 0.0;

    for record in records {
        total_value += record.award_amount;

        match index.get(record.recipient_name.as_str()) {
            Some(&i) => totals[i].total += record.award_amount,
            None => {
                index.insert(record.recipient_name.as_str(), totals.len());
                totals.push(ContractorTotal {
                    recipient_name: record.recipient_name.clone(),
                    total: record.award_amount,
                });
            }
        }

        let agency = record.awarding_agency.trim();
        if !agency.is_empty() && !agencies.iter().any(|a| a == agency) {
            agencies.push(agency.to_string());
        }
    }

    // Stable sort keeps first-encountered order among equal totals.
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals.truncate(TOP_CONTRACTORS);

    ContractAnalysis {
        total_contracts: records.len(),
        total_value,
        top_contractors: totals,
        agencies,
        summary: format!("Found {} contracts worth {}", records.len(), format_usd(total_value)),
    }
}

/// Format a dollar amount as `$1,234,567.89`.
pub fn format_usd(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{fraction:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(recipient: &str, amount: f64, agency: &str) -> ContractRecord {
        ContractRecord {
            award_id: format!("{recipient}-{amount}"),
            recipient_name: recipient.into(),
            award_amount: amount,
            place_of_performance_zip: "89101".into(),
            description: String::new(),
            awarding_agency: agency.into(),
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_empty_input() {
        let analysis = analyze(&[]);
        assert_eq!(analysis.total_contracts, 0);
        assert_eq!(analysis.total_value, 0.0);
        assert!(analysis.top_contractors.is_empty());
        assert_eq!(analysis.summary, "No contracts found in this area.");
    }

    #[test]
    fn test_totals_match_sum() {
        let records =
            vec![contract("A", 1250.5, "DoD"), contract("B", 99.25, "GSA"), contract("A", 0.0, "DoD")];
        let analysis = analyze(&records);

        let expected: f64 = records.iter().map(|r| r.award_amount).sum();
        assert_eq!(analysis.total_contracts, 3);
        assert_eq!(analysis.total_value, expected);
        assert_eq!(analysis.summary, "Found 3 contracts worth $1,349.75");
        assert_eq!(analysis.agencies, vec!["DoD".to_string(), "GSA".to_string()]);
    }

    #[test]
    fn test_four_recipients_ranked() {
        // 12 records across 4 recipients.
        let mut records = Vec::new();
        for (recipient, amount) in [("Alpha", 500_000.0), ("Bravo", 300_000.0), ("Charlie", 200_000.0)] {
            for _ in 0..3 {
                records.push(contract(recipient, amount, "DoD"));
            }
        }
        for _ in 0..3 {
            records.push(contract("Delta", 50_000.0, "DOE"));
        }
        // Interleave so grouping does not rely on adjacency.
        records.swap(0, 11);
        records.swap(4, 9);

        let analysis = analyze(&records);
        let names: Vec<&str> = analysis.top_contractors.iter().map(|c| c.recipient_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo", "Charlie", "Delta"]);
        assert_eq!(analysis.top_contractors[0].total, 1_500_000.0);
        assert_eq!(analysis.top_contractors[3].total, 150_000.0);
        assert_eq!(analysis.total_value, 3_150_000.0);
    }

    #[test]
    fn test_top_contractors_capped_at_five() {
        let records: Vec<ContractRecord> =
            (0..8).map(|i| contract(&format!("R{i}"), 1000.0 * f64::from(i + 1), "GSA")).collect();
        let analysis = analyze(&records);

        assert_eq!(analysis.top_contractors.len(), 5);
        assert_eq!(analysis.top_contractors[0].recipient_name, "R7");
        let max = analysis.top_contractors.iter().map(|c| c.total).fold(0.0, f64::max);
        assert!(analysis.top_contractors.iter().all(|c| c.total <= max));
    }

    #[test]
    fn test_ties_keep_first_encountered_order() {
        let records = vec![contract("Zeta", 10.0, ""), contract("Alpha", 10.0, ""), contract("Mid", 10.0, "")];
        let analysis = analyze(&records);
        let names: Vec<&str> = analysis.top_contractors.iter().map(|c| c.recipient_name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert!(analysis.agencies.is_empty());
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(999.999), "$1,000.00");
        assert_eq!(format_usd(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_usd(100_000.0), "$100,000.00");
    }
}
