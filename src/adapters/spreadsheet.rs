//! Spreadsheet export adapter
//!
//! Parses tabular exports converted to JSON (one object per row, keyed by the
//! export's column headers) into canonical raw records.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ComputeError;
use crate::types::RawRecord;

use super::RecordSource;

const DATE_COLUMNS: [&str; 2] = ["Date", "date"];
const DRIVING_COLUMNS: [&str; 2] = ["Conduite", "driving"];

/// Spreadsheet row adapter
pub struct SpreadsheetAdapter;

impl RecordSource for SpreadsheetAdapter {
    fn records(&self, raw_json: &str) -> Result<Vec<RawRecord>, ComputeError> {
        let rows: Vec<Value> = serde_json::from_str(raw_json)?;

        let Some(first) = rows.first() else {
            return Err(ComputeError::ParseError("spreadsheet contains no rows".to_string()));
        };
        check_columns(first)?;

        let rows: Vec<SpreadsheetRow> = serde_json::from_value(Value::Array(rows))?;
        Ok(rows.into_iter().map(SpreadsheetRow::into_record).collect())
    }
}

/// Structural check on the first row: the label and driving columns must exist
fn check_columns(first: &Value) -> Result<(), ComputeError> {
    let Some(columns) = first.as_object() else {
        return Err(ComputeError::ParseError("spreadsheet rows must be objects".to_string()));
    };
    let has = |names: [&str; 2]| names.iter().any(|name| columns.contains_key(*name));

    if !has(DATE_COLUMNS) {
        return Err(ComputeError::MissingField("Date".to_string()));
    }
    if !has(DRIVING_COLUMNS) {
        return Err(ComputeError::MissingField("Conduite".to_string()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SpreadsheetRow {
    #[serde(rename = "Date", alias = "date", default)]
    date: Option<Cell>,
    #[serde(rename = "Conduite", alias = "driving", default)]
    driving: Option<Cell>,
    #[serde(rename = "R.Journ", alias = "daily_rest", default)]
    daily_rest: Option<Cell>,
    #[serde(rename = "Amplitude", alias = "amplitude", default)]
    amplitude: Option<Cell>,
    #[serde(rename = "Distance", alias = "distance", default)]
    distance: Option<Cell>,
    #[serde(rename = "R. Hebdo", alias = "weekly_rest", default)]
    weekly_rest: Option<Cell>,
}

/// A spreadsheet cell as exported: text, a number, or anything else
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Cell {
    Text(String),
    Number(f64),
    Other(Value),
}

impl Cell {
    fn text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Other(_) => None,
        }
    }

    fn number(&self) -> f64 {
        match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
            Cell::Other(_) => 0.0,
        }
    }
}

impl SpreadsheetRow {
    fn into_record(self) -> RawRecord {
        let text = |cell: &Option<Cell>| cell.as_ref().and_then(Cell::text);
        RawRecord {
            label: text(&self.date).unwrap_or_default(),
            driving: text(&self.driving),
            daily_rest: text(&self.daily_rest),
            amplitude: text(&self.amplitude),
            distance_km: self
                .distance
                .as_ref()
                .map(Cell::number)
                .filter(|d| d.is_finite())
                .unwrap_or(0.0),
            weekly_rest: text(&self.weekly_rest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_french_columns() {
        let json = r#"[
            {"Date": "Sem. 40", "Conduite": "45:30", "R. Hebdo": "48:00"},
            {"Date": "Lun. 30 Sept. 2024", "Conduite": "09:15", "R.Journ": "11:00",
             "Amplitude": "12:30", "Distance": 642, "Observations": "RAS"}
        ]"#;
        let records = SpreadsheetAdapter.records(json).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, "Sem. 40");
        assert_eq!(records[0].weekly_rest.as_deref(), Some("48:00"));
        assert_eq!(records[0].daily_rest, None);
        assert_eq!(
            records[1],
            RawRecord {
                label: "Lun. 30 Sept. 2024".to_string(),
                driving: Some("09:15".to_string()),
                daily_rest: Some("11:00".to_string()),
                amplitude: Some("12:30".to_string()),
                distance_km: 642.0,
                weekly_rest: None,
            }
        );
    }

    #[test]
    fn test_parse_english_aliases_and_odd_cells() {
        let json = r#"[
            {"date": "Mon. 30 Sep. 2024", "driving": "09:00", "daily_rest": null,
             "distance": "312,5", "amplitude": true}
        ]"#;
        let records = SpreadsheetAdapter.records(json).unwrap();

        assert_eq!(records[0].label, "Mon. 30 Sep. 2024");
        assert_eq!(records[0].daily_rest, None);
        assert_eq!(records[0].amplitude, None);
        assert!((records[0].distance_km - 312.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_export_is_rejected() {
        let result = SpreadsheetAdapter.records("[]");
        assert!(matches!(result, Err(ComputeError::ParseError(_))));
    }

    #[test]
    fn test_missing_required_columns() {
        let result = SpreadsheetAdapter.records(r#"[{"Conduite": "09:00"}]"#);
        assert!(matches!(result, Err(ComputeError::MissingField(f)) if f == "Date"));

        let result = SpreadsheetAdapter.records(r#"[{"Date": "Mon. 30 Sep. 2024"}]"#);
        assert!(matches!(result, Err(ComputeError::MissingField(f)) if f == "Conduite"));
    }

    #[test]
    fn test_invalid_json() {
        let result = SpreadsheetAdapter.records("{not json");
        assert!(matches!(result, Err(ComputeError::JsonError(_))));
    }
}
