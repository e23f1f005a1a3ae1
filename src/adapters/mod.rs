//! Source adapters
//!
//! This module provides adapters that parse raw input payloads (spreadsheet
//! exports, decoded tachograph activity logs) and map them to canonical,
//! origin-agnostic raw records.

mod activity;
mod spreadsheet;

pub use activity::{ActivityLog, ActivityLogAdapter};
pub use spreadsheet::SpreadsheetAdapter;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ComputeError;
use crate::types::RawRecord;

/// Trait for input adapters
pub trait RecordSource {
    /// Parse raw JSON and convert to canonical raw records, in source order
    fn records(&self, raw_json: &str) -> Result<Vec<RawRecord>, ComputeError>;
}

/// Origin of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Tabular export, one row per period
    Spreadsheet,
    /// Decoded driver card or vehicle unit download
    ActivityLog,
}

impl SourceKind {
    /// Guess the origin from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "c1b" | "ddd" | "v1b" => Some(SourceKind::ActivityLog),
            "xlsx" | "xls" | "csv" | "json" => Some(SourceKind::Spreadsheet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Spreadsheet => "spreadsheet",
            SourceKind::ActivityLog => "activity-log",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_from_path() {
        assert_eq!(
            SourceKind::from_path(Path::new("card/DUPONT.DDD")),
            Some(SourceKind::ActivityLog)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("driver.c1b")),
            Some(SourceKind::ActivityLog)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("export.xlsx")),
            Some(SourceKind::Spreadsheet)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("rows.json")),
            Some(SourceKind::Spreadsheet)
        );
        assert_eq!(SourceKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(SourceKind::from_path(Path::new("README")), None);
    }
}
