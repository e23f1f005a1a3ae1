//! Day and week extraction
//!
//! Walks canonical raw records in order and builds the day and week records the
//! rule engine consumes. The "current week" is an explicit accumulator threaded
//! through a fold: a week row opens a new week, and every following day row is
//! appended to it until the next week row.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{classify, RowKind};
use crate::types::{Day, RawRecord, Week};
use crate::units::time_to_minutes;

/// Result of extraction, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub days: Vec<Day>,
    pub weeks: Vec<Week>,
    /// Records classified as anything other than a day or a week
    pub skipped: usize,
}

impl Extraction {
    /// No usable day or week record was found
    pub fn is_empty(&self) -> bool {
        self.days.is_empty() && self.weeks.is_empty()
    }
}

#[derive(Debug, Default)]
struct Fold {
    extraction: Extraction,
    open_week: Option<Week>,
}

impl Fold {
    fn push(mut self, record: &RawRecord) -> Self {
        match classify(&record.label) {
            RowKind::Day => {
                let day = day_from_record(record);
                if let Some(week) = self.open_week.as_mut() {
                    week.days.push(day.clone());
                }
                self.extraction.days.push(day);
            }
            RowKind::Week => {
                if let Some(previous) = self.open_week.take() {
                    self.extraction.weeks.push(previous);
                }
                self.open_week = Some(week_from_record(record));
            }
            kind => {
                debug!(label = %record.label, ?kind, "summary row skipped");
                self.extraction.skipped += 1;
            }
        }
        self
    }

    fn finish(mut self) -> Extraction {
        if let Some(week) = self.open_week.take() {
            self.extraction.weeks.push(week);
        }
        self.extraction
    }
}

/// Extract ordered day and week records from canonical raw records.
pub fn extract(records: &[RawRecord]) -> Extraction {
    records
        .iter()
        .fold(Fold::default(), |fold, record| fold.push(record))
        .finish()
}

fn day_from_record(record: &RawRecord) -> Day {
    Day::new(
        record.label.clone(),
        time_to_minutes(record.driving.as_deref()),
        time_to_minutes(record.daily_rest.as_deref()),
        time_to_minutes(record.amplitude.as_deref()),
        record.distance_km.max(0.0),
    )
}

fn week_from_record(record: &RawRecord) -> Week {
    Week::new(
        record.label.clone(),
        time_to_minutes(record.driving.as_deref()),
        time_to_minutes(record.weekly_rest.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(label: &str, driving: &str, rest: &str, amplitude: &str, weekly_rest: &str) -> RawRecord {
        let cell = |s: &str| (!s.is_empty()).then(|| s.to_string());
        RawRecord {
            label: label.to_string(),
            driving: cell(driving),
            daily_rest: cell(rest),
            amplitude: cell(amplitude),
            distance_km: 0.0,
            weekly_rest: cell(weekly_rest),
        }
    }

    #[test]
    fn test_days_join_the_open_week() {
        let records = vec![
            row("Week 40 2024", "20:00", "", "", "50:00"),
            row("Mon. 30 Sep. 2024", "09:00", "11:00", "12:00", ""),
            row("Tue. 1 Oct. 2024", "11:00", "10:00", "13:00", ""),
            row("Week 41 2024", "30:00", "", "", "45:00"),
            row("Mon. 7 Oct. 2024", "08:00", "11:00", "10:00", ""),
        ];
        let extraction = extract(&records);

        assert_eq!(extraction.days.len(), 3);
        assert_eq!(extraction.weeks.len(), 2);
        assert_eq!(extraction.weeks[0].label, "Week 40 2024");
        assert_eq!(extraction.weeks[0].days.len(), 2);
        assert_eq!(extraction.weeks[0].days[1].driving_minutes, 660);
        assert_eq!(extraction.weeks[1].days.len(), 1);
        assert_eq!(extraction.weeks[1].days[0].date, "Mon. 7 Oct. 2024");
    }

    #[test]
    fn test_week_totals_are_trusted_as_declared() {
        let records = vec![
            row("Week 40 2024", "57:00", "", "", "30:00"),
            row("Mon. 30 Sep. 2024", "09:00", "11:00", "12:00", ""),
        ];
        let extraction = extract(&records);

        let week = &extraction.weeks[0];
        assert_eq!(week.driving_minutes, 57 * 60);
        assert_eq!(week.rest_minutes, 30 * 60);
        assert_eq!(week.date, "Week 40 2024");
    }

    #[test]
    fn test_days_before_any_week_are_standalone() {
        let records = vec![
            row("Mon. 30 Sep. 2024", "09:00", "11:00", "12:00", ""),
            row("Week 40 2024", "09:00", "", "", "50:00"),
        ];
        let extraction = extract(&records);

        assert_eq!(extraction.days.len(), 1);
        assert!(extraction.weeks[0].days.is_empty());
    }

    #[test]
    fn test_summary_rows_are_skipped() {
        let records = vec![
            row("Total", "100:00", "", "", ""),
            row("Month 10", "80:00", "", "", ""),
            row("Per. 1", "80:00", "", "", ""),
            row("Mon. 30 Sep. 2024", "09:00", "null", "bad", ""),
        ];
        let extraction = extract(&records);

        assert_eq!(extraction.skipped, 3);
        assert_eq!(extraction.days.len(), 1);
        assert_eq!(extraction.days[0].rest_minutes, 0);
        assert_eq!(extraction.days[0].amplitude_minutes, 0);
        assert!(extraction.weeks.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let extraction = extract(&[]);
        assert!(extraction.is_empty());
        assert_eq!(extraction.skipped, 0);
    }
}
