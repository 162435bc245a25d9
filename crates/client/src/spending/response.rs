//! Spending API response rows and their reshaping into [`ContractRecord`]s.

use serde::Deserialize;
use serde_json::Value;
use sitelens_core::ContractRecord;

/// Placeholder for rows without a recipient.
pub const UNKNOWN_RECIPIENT: &str = "Unknown Recipient";

/// Response of the award search endpoint.
#[derive(Debug, Deserialize)]
pub struct AwardSearchResponse {
    #[serde(default)]
    pub results: Vec<AwardRow>,
}

/// Response of the jurisdiction lookup endpoint.
#[derive(Debug, Deserialize)]
pub struct StateResponse {
    #[serde(default)]
    pub state_code: Option<String>,
}

/// One award row, keyed by the provider's display column names.
#[derive(Debug, Default, Deserialize)]
pub struct AwardRow {
    #[serde(rename = "Award ID", default)]
    pub award_id: Option<String>,
    #[serde(rename = "Recipient Name", default)]
    pub recipient_name: Option<String>,
    #[serde(rename = "Award Amount", default)]
    pub award_amount: Option<Value>,
    #[serde(rename = "Place of Performance Zip5", default)]
    pub place_of_performance_zip: Option<Value>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Awarding Agency", default)]
    pub awarding_agency: Option<String>,
    #[serde(rename = "Start Date", default)]
    pub start_date: Option<String>,
    #[serde(rename = "End Date", default)]
    pub end_date: Option<String>,
}

fn amount_of(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => Some(0.0),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().ok(),
        Some(_) => None,
    }
}

/// ZIP codes sometimes arrive as numbers with their leading zeros stripped.
fn zip_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(zip) => format!("{:05}", zip),
            None => n.to_string(),
        },
        _ => String::new(),
    }
}

fn text(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

impl AwardRow {
    /// Reshape into a [`ContractRecord`].
    ///
    /// Returns `None` for rows whose amount is negative, non-finite, or not a
    /// number at all.
    pub fn into_record(self) -> Option<ContractRecord> {
        let award_amount = amount_of(self.award_amount.as_ref()).filter(|a| a.is_finite() && *a >= 0.0)?;

        let recipient_name = match text(self.recipient_name) {
            name if name.is_empty() => UNKNOWN_RECIPIENT.to_string(),
            name => name,
        };

        Some(ContractRecord {
            award_id: text(self.award_id),
            recipient_name,
            award_amount,
            place_of_performance_zip: zip_of(self.place_of_performance_zip.as_ref()),
            description: text(self.description),
            awarding_agency: text(self.awarding_agency),
            start_date: self.start_date.filter(|d| !d.trim().is_empty()),
            end_date: self.end_date.filter(|d| !d.trim().is_empty()),
        })
    }
}
