//! Pipeline orchestration
//!
//! This module provides the public API for Tacho Flux.
//! It orchestrates the full pipeline from raw input JSON to a compliance report.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::{ActivityLogAdapter, RecordSource, SpreadsheetAdapter};
use crate::classifier::{classify, RowKind};
use crate::config::AnalysisConfig;
use crate::dates::{parse_label_date, DateCorrector};
use crate::engine::RuleEngine;
use crate::error::ComputeError;
use crate::extractor::extract;
use crate::rules::RuleTable;
use crate::scoring::{ComplianceScorer, PeriodStatistics};
use crate::types::{Day, DriverIdentity, Infraction, RawRecord, Week};
use crate::units::parse_duration;

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverIdentity>,
    /// ISO date of the first day, when its label names a date
    pub period_start: Option<String>,
    /// ISO date of the last day, when its label names a date
    pub period_end: Option<String>,
    pub day_count: usize,
    pub week_count: usize,
    pub days: Vec<Day>,
    pub weeks: Vec<Week>,
    pub infractions: Vec<Infraction>,
    /// Compliance score, 0-100
    pub score: u8,
    pub statistics: PeriodStatistics,
    /// Number of infraction dates rewritten by the year-rollover pass
    pub corrected_dates: usize,
}

impl AnalysisReport {
    /// No day or week record was found in the input
    pub fn is_empty(&self) -> bool {
        self.day_count == 0 && self.week_count == 0
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, ComputeError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Analyze a spreadsheet export (JSON array of rows) with default settings.
///
/// # Example
/// ```ignore
/// let report = analyze_spreadsheet_rows(rows_json)?;
/// println!("score: {}", report.score);
/// ```
pub fn analyze_spreadsheet_rows(raw_json: &str) -> Result<AnalysisReport, ComputeError> {
    ComplianceAnalyzer::new(AnalysisConfig::default()).analyze_spreadsheet(raw_json)
}

/// Analyze a decoded activity log, bucketing days in the configured timezone.
///
/// # Example
/// ```ignore
/// let config = AnalysisConfig::load()?;
/// let report = analyze_activity_log(decoder_json, &config)?;
/// ```
pub fn analyze_activity_log(
    raw_json: &str,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, ComputeError> {
    ComplianceAnalyzer::new(config.clone()).analyze_activity_log(raw_json)
}

/// Analyzer bound to a configuration and a rule table.
///
/// Runs are independent; one analyzer may serve any number of drivers.
pub struct ComplianceAnalyzer<'a> {
    config: AnalysisConfig,
    rules: &'a RuleTable,
}

impl ComplianceAnalyzer<'static> {
    /// Create an analyzer using the standard rule table
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_rules(config, RuleTable::standard())
    }
}

impl<'a> ComplianceAnalyzer<'a> {
    pub fn with_rules(config: AnalysisConfig, rules: &'a RuleTable) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Parse a spreadsheet export and analyze it
    pub fn analyze_spreadsheet(&self, raw_json: &str) -> Result<AnalysisReport, ComputeError> {
        let records = SpreadsheetAdapter.records(raw_json)?;
        Ok(self.analyze(&records, None))
    }

    /// Parse a decoded activity log, normalize it, and analyze it
    pub fn analyze_activity_log(&self, raw_json: &str) -> Result<AnalysisReport, ComputeError> {
        let adapter = ActivityLogAdapter::new(self.config.tz()?);
        let log = adapter.parse_log(raw_json)?;
        let records = adapter.normalizer().normalize(&log.activities);
        Ok(self.analyze(&records, log.driver))
    }

    /// Analyze canonical raw records.
    ///
    /// Pipeline stages:
    /// 1. Extractor - Day and Week records from classified rows
    /// 2. RuleEngine - Infractions in day, week, week-pair order
    /// 3. DateCorrector - Year-rollover repair of infraction dates
    /// 4. ComplianceScorer - Score and period statistics
    pub fn analyze(&self, records: &[RawRecord], driver: Option<DriverIdentity>) -> AnalysisReport {
        let extraction = extract(records);
        if extraction.is_empty() {
            warn!(records = records.len(), "no day or week record found, period is empty");
        }

        let mut infractions =
            RuleEngine::new(self.rules).detect(&extraction.days, &extraction.weeks);

        let corrector = DateCorrector::from_labels(
            extraction.days.iter().map(|d| d.date.as_str()),
            self.config.effective_fallback_year(),
        );
        // Rollovers are found on the days, in period order, then applied to
        // infractions whatever order the engine emitted them in
        let corrections = if self.config.correct_dates {
            corrector.corrections(extraction.days.iter().map(|d| d.date.as_str()))
        } else {
            HashMap::new()
        };
        let corrected_dates = DateCorrector::apply(&mut infractions, &corrections);

        let (period_start, period_end) =
            period_bounds(&extraction.days, &corrections, corrector.fallback_year());
        let score = ComplianceScorer::score(extraction.days.len(), &infractions);
        let statistics = PeriodStatistics::compute(&extraction.days, &infractions);

        info!(
            days = extraction.days.len(),
            weeks = extraction.weeks.len(),
            skipped = extraction.skipped,
            infractions = infractions.len(),
            corrected_dates,
            score,
            "analysis complete"
        );

        AnalysisReport {
            run_id: Uuid::new_v4(),
            driver,
            period_start,
            period_end,
            day_count: extraction.days.len(),
            week_count: extraction.weeks.len(),
            days: extraction.days,
            weeks: extraction.weeks,
            infractions,
            score,
            statistics,
            corrected_dates,
        }
    }
}

/// First and last day of the period as ISO dates.
///
/// Bounds are read after applying the same rollover correction as infractions,
/// so a period running into January ends in the following year.
fn period_bounds(
    days: &[Day],
    corrections: &HashMap<String, String>,
    fallback_year: i32,
) -> (Option<String>, Option<String>) {
    let mut dated: Vec<Day> = days.to_vec();
    DateCorrector::apply(&mut dated, corrections);

    let mut parsed = dated
        .iter()
        .filter_map(|d| parse_label_date(&d.date, fallback_year));
    let first = parsed.next();
    let last = parsed.last().or(first);

    let iso = |date: chrono::NaiveDate| date.format("%Y-%m-%d").to_string();
    (first.map(iso), last.map(iso))
}

/// Structural summary of an input, without running the rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_records: usize,
    pub days: usize,
    pub weeks: usize,
    pub periods: usize,
    pub months: usize,
    pub quarters: usize,
    pub ignored: usize,
    /// Time cells on day and week rows that hold text but no `HH:MM` duration
    pub unparsable_time_cells: usize,
    /// Unparsable time cells that hold a bare number, typically a spreadsheet
    /// time exported as a day fraction or decimal hours
    pub numeric_time_cells: usize,
}

impl ValidationReport {
    pub fn from_records(records: &[RawRecord]) -> Self {
        let mut report = Self {
            total_records: records.len(),
            ..Self::default()
        };

        for record in records {
            let kind = classify(&record.label);
            match kind {
                RowKind::Day => report.days += 1,
                RowKind::Week => report.weeks += 1,
                RowKind::Period => report.periods += 1,
                RowKind::Month => report.months += 1,
                RowKind::Quarter => report.quarters += 1,
                RowKind::Ignore => report.ignored += 1,
            }

            if matches!(kind, RowKind::Day | RowKind::Week) {
                let unparsable: Vec<&str> = [
                    &record.driving,
                    &record.daily_rest,
                    &record.amplitude,
                    &record.weekly_rest,
                ]
                .into_iter()
                .flatten()
                .map(|cell| cell.trim())
                .filter(|cell| is_unparsable(cell))
                .collect();

                report.unparsable_time_cells += unparsable.len();
                report.numeric_time_cells += unparsable
                    .iter()
                    .filter(|cell| cell.parse::<f64>().is_ok())
                    .count();
            }
        }

        report
    }
}

fn is_unparsable(cell: &str) -> bool {
    let text = cell.trim();
    !text.is_empty() && text != "null" && parse_duration(text).is_none()
}
