//! CSV and JSON rendering of comparison results.

use crate::error::Result;
use crate::matcher::MatchRecord;
use crate::processor::ComparisonReport;
use std::fs;
use std::path::Path;

const CSV_HEADER: [&str; 8] = [
    "call_id",
    "call_email",
    "call_phone",
    "order_id",
    "order_email",
    "order_phone",
    "customer_name",
    "matched_on",
];

/// Quotes a field when it contains a comma, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(csv_field).collect::<Vec<_>>().join(",")
}

/// Renders matches as CSV with a header row. Absent values are empty cells.
pub(crate) fn matches_to_csv(matches: &[MatchRecord]) -> String {
    let mut out = csv_row(CSV_HEADER);
    out.push('\n');
    for m in matches {
        out.push_str(&csv_row([
            m.call_id.as_deref().unwrap_or(""),
            m.call_email.as_deref().unwrap_or(""),
            m.call_phone.as_deref().unwrap_or(""),
            m.order_id.as_deref().unwrap_or(""),
            m.order_email.as_str(),
            m.order_phone.as_str(),
            m.customer_name.as_str(),
            m.matched_on.as_str(),
        ]));
        out.push('\n');
    }
    out
}

pub(crate) fn write_csv(path: &Path, matches: &[MatchRecord]) -> Result<()> {
    fs::write(path, matches_to_csv(matches))?;
    tracing::info!("Wrote {} matches to {}", matches.len(), path.display());
    Ok(())
}

pub(crate) fn write_json(path: &Path, report: &ComparisonReport) -> Result<()> {
    let output_data = serde_json::to_string_pretty(report)?;
    fs::write(path, output_data)?;
    tracing::info!("Wrote comparison report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchedOn;
    use crate::processor::{OrderWindow, run_comparison};
    use crate::window::DateRange;
    use chrono::NaiveDate;
    use serde_json::json;

    fn record(customer_name: &str) -> MatchRecord {
        MatchRecord {
            call_id: Some("c1".into()),
            call_email: None,
            call_phone: Some("5550100".into()),
            order_id: Some("#1001".into()),
            order_email: String::new(),
            order_phone: "5550100".into(),
            customer_name: customer_name.into(),
            matched_on: MatchedOn::Phone,
        }
    }

    #[test]
    fn test_csv_header_and_rows() {
        let csv = matches_to_csv(&[record("Jane Doe")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "call_id,call_email,call_phone,order_id,order_email,order_phone,customer_name,matched_on"
        );
        assert_eq!(lines[1], "c1,,5550100,#1001,,5550100,Jane Doe,phone");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_csv_quotes_special_characters() {
        let csv = matches_to_csv(&[record("Doe, \"JJ\" Jane")]);
        assert!(csv.contains(",\"Doe, \"\"JJ\"\" Jane\",phone"));
    }

    #[test]
    fn test_csv_of_no_matches_is_header_only() {
        assert_eq!(matches_to_csv(&[]).lines().count(), 1);
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        )
        .unwrap();
        let report = run_comparison(
            &[json!({ "call_id": "c1", "to_number": "555-0100" })],
            &[json!({ "name": "#1", "phone": "5550100" })],
            &range,
            OrderWindow::Filtered,
        )
        .unwrap();

        let csv_path = dir.path().join("matches.csv");
        let json_path = dir.path().join("report.json");
        write_csv(&csv_path, &report.matches).unwrap();
        write_json(&json_path, &report).unwrap();

        let csv = fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().nth(1), Some("c1,,5550100,#1,,5550100, ,phone"));

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed["matches"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["calls_fetched"], 1);
    }
}
