//! Day label dates and year-rollover correction
//!
//! Day labels such as `Mon. 30 Sep. 2024` or `Lun. 6 Janv.` sometimes lack a
//! year, and exports spanning New Year are then read with the wrong one. The
//! correction pass repairs the most common case (a single September-to-March
//! rollover) on a best-effort basis.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use tracing::debug;

use crate::types::{Day, Infraction};

/// Month index (0-based) from which a record counts as "second half" of a year
const LATE_MONTH0: u32 = 8;
/// Month index (0-based) up to which a record counts as "first half" of a year
const EARLY_MONTH0: u32 = 2;

/// Parse the calendar date named by a label.
///
/// Accepts ISO `YYYY-MM-DD` and `<day> <month>[.] [<year>]` with English or
/// French month abbreviations. Labels without a year resolve to `fallback_year`.
pub fn parse_label_date(label: &str, fallback_year: i32) -> Option<NaiveDate> {
    let (day, month, year) = label_parts(label)?;
    NaiveDate::from_ymd_opt(year.unwrap_or(fallback_year), month, day)
}

/// Year written in the label, if any
pub fn label_year(label: &str) -> Option<i32> {
    label_parts(label).and_then(|(_, _, year)| year)
}

fn label_parts(label: &str) -> Option<(u32, u32, Option<i32>)> {
    let trimmed = label.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some((date.day(), date.month(), Some(date.year())));
    }

    let tokens: Vec<&str> = trimmed
        .split_whitespace()
        .map(|t| t.trim_end_matches(|c: char| c == '.' || c == ','))
        .collect();

    tokens.windows(2).enumerate().find_map(|(idx, pair)| {
        let day = parse_day_number(pair[0])?;
        let month = month_from_token(pair[1])?;
        let year = tokens.get(idx + 2).and_then(|t| parse_year(t));
        Some((day, month, year))
    })
}

fn parse_day_number(token: &str) -> Option<u32> {
    if token.is_empty() || token.len() > 2 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok().filter(|d| (1..=31).contains(d))
}

fn parse_year(token: &str) -> Option<i32> {
    if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

fn month_from_token(token: &str) -> Option<u32> {
    let lower = token.to_lowercase();
    let prefix4: String = lower.chars().take(4).collect();
    let prefix3: String = lower.chars().take(3).collect();

    // "juin"/"juil" only differ on the fourth letter
    match prefix4.as_str() {
        "juin" => return Some(6),
        "juil" => return Some(7),
        _ => {}
    }

    match prefix3.as_str() {
        "jan" => Some(1),
        "feb" | "fév" | "fev" => Some(2),
        "mar" => Some(3),
        "apr" | "avr" => Some(4),
        "may" | "mai" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" | "aoû" | "aou" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" | "déc" => Some(12),
        _ => None,
    }
}

/// A record whose date label the correction pass may rewrite
pub trait DatedRecord {
    fn date_label(&self) -> &str;
    fn set_date_label(&mut self, label: String);
}

impl DatedRecord for Infraction {
    fn date_label(&self) -> &str {
        &self.date
    }

    fn set_date_label(&mut self, label: String) {
        self.date = label;
    }
}

impl DatedRecord for Day {
    fn date_label(&self) -> &str {
        &self.date
    }

    fn set_date_label(&mut self, label: String) {
        self.date = label;
    }
}

/// Year-rollover correction pass
///
/// Assumes at most one rollover per sequence. The scan runs over labels in
/// period order (the extracted days); records emitted in any other order, such
/// as infractions, are then rewritten through the resulting label map. Labels
/// that name no single date (week labels, composite bi-weekly labels) are left
/// untouched and do not take part in the scan.
#[derive(Debug, Clone, Copy)]
pub struct DateCorrector {
    fallback_year: i32,
}

impl DateCorrector {
    pub fn new(fallback_year: i32) -> Self {
        Self { fallback_year }
    }

    /// Build a corrector whose fallback is the first year written in `labels`,
    /// or `default_year` when none carries one.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>, default_year: i32) -> Self {
        let year = labels
            .into_iter()
            .find_map(label_year)
            .unwrap_or(default_year);
        Self::new(year)
    }

    pub fn fallback_year(&self) -> i32 {
        self.fallback_year
    }

    /// Scan labels in period order and map each rolled-over label to its
    /// corrected ISO `YYYY-MM-DD` date.
    ///
    /// Never fails: unparsable labels are skipped and impossible dates are left
    /// out of the map.
    pub fn corrections<'a>(
        &self,
        labels: impl IntoIterator<Item = &'a str>,
    ) -> HashMap<String, String> {
        let mut previous: Option<NaiveDate> = None;
        let mut year_offset = 0;
        let mut corrections = HashMap::new();

        for label in labels {
            let Some(current) = parse_label_date(label, self.fallback_year) else {
                continue;
            };

            if let Some(prev) = previous {
                if current < prev && prev.month0() >= LATE_MONTH0 && current.month0() <= EARLY_MONTH0
                {
                    year_offset += 1;
                    debug!(from = %prev, to = %current, year_offset, "year rollover detected");
                }
            }
            previous = Some(current);

            if year_offset == 0 {
                continue;
            }

            if let Some(shifted) = shift_year(current, year_offset) {
                let corrected = shifted.format("%Y-%m-%d").to_string();
                debug!(original = label, corrected = %corrected, "date corrected");
                corrections.insert(label.to_string(), corrected);
            }
        }

        corrections
    }

    /// Rewrite every record whose label has a correction. Returns the number of
    /// records rewritten.
    pub fn apply<T: DatedRecord>(records: &mut [T], corrections: &HashMap<String, String>) -> usize {
        let mut rewritten = 0;
        for record in records.iter_mut() {
            if let Some(corrected) = corrections.get(record.date_label()) {
                record.set_date_label(corrected.clone());
                rewritten += 1;
            }
        }
        rewritten
    }

    /// Correct records that are already in period order, in place.
    pub fn correct<T: DatedRecord>(&self, records: &mut [T]) -> usize {
        let corrections = self.corrections(records.iter().map(|r| r.date_label()));
        Self::apply(records, &corrections)
    }
}

fn shift_year(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    let year = date.year().checked_add(years)?;
    // 29 Feb into a non-leap year clamps to 28 Feb
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
}
