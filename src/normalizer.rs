//! Activity normalization
//!
//! This module turns discrete tachograph activity intervals into the same
//! canonical raw records a spreadsheet export would produce:
//! - Intervals bucketed into local calendar days by their start instant
//! - Driving and rest totals per day, amplitude from non-rest activity
//! - Days grouped into ISO weeks, each week row heading its days

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::types::{Activity, ActivityKind, RawRecord};
use crate::units::minutes_to_time;

/// Normalizer for converting activity intervals to raw records
#[derive(Debug, Clone, Copy)]
pub struct ActivityNormalizer {
    tz: Tz,
}

/// Per-day totals derived from activity intervals
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub driving_minutes: u32,
    pub rest_minutes: u32,
    pub amplitude_minutes: u32,
}

#[derive(Debug)]
struct DayAccumulator {
    driving_minutes: u32,
    rest_minutes: u32,
    first_start: Option<DateTime<Utc>>,
    last_end: Option<DateTime<Utc>>,
}

impl DayAccumulator {
    fn new() -> Self {
        Self {
            driving_minutes: 0,
            rest_minutes: 0,
            first_start: None,
            last_end: None,
        }
    }

    fn add(&mut self, activity: &Activity) {
        match activity.kind {
            ActivityKind::Driving => self.driving_minutes += activity.duration_minutes,
            ActivityKind::Rest => self.rest_minutes += activity.duration_minutes,
            _ => {}
        }

        if activity.kind != ActivityKind::Rest {
            self.first_start = Some(
                self.first_start
                    .map_or(activity.start, |s| s.min(activity.start)),
            );
            self.last_end = Some(self.last_end.map_or(activity.end, |e| e.max(activity.end)));
        }
    }

    fn amplitude_minutes(&self) -> u32 {
        match (self.first_start, self.last_end) {
            (Some(start), Some(end)) if end > start => {
                ((end - start).num_seconds() as f64 / 60.0).round() as u32
            }
            _ => 0,
        }
    }
}

impl ActivityNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Per-day totals in calendar order.
    ///
    /// An interval belongs entirely to the local day of its start instant, even
    /// when it runs past midnight.
    pub fn summarize_days(&self, activities: &[Activity]) -> Vec<DaySummary> {
        let mut by_date: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

        for activity in activities {
            if activity.end < activity.start {
                warn!(
                    start = %activity.start,
                    end = %activity.end,
                    kind = ?activity.kind,
                    "activity ends before it starts"
                );
            }

            let date = activity.start.with_timezone(&self.tz).date_naive();
            by_date
                .entry(date)
                .or_insert_with(DayAccumulator::new)
                .add(activity);
        }

        by_date
            .into_iter()
            .map(|(date, acc)| DaySummary {
                date,
                driving_minutes: acc.driving_minutes,
                rest_minutes: acc.rest_minutes,
                amplitude_minutes: acc.amplitude_minutes(),
            })
            .collect()
    }

    /// Normalize activities into raw records: for each ISO week, the week row
    /// first and then its day rows, so every day attaches to its own week
    pub fn normalize(&self, activities: &[Activity]) -> Vec<RawRecord> {
        let days = self.summarize_days(activities);

        // (iso year, iso week) -> member days, in calendar order
        let mut by_week: BTreeMap<(i32, u32), Vec<&DaySummary>> = BTreeMap::new();
        for day in &days {
            let week = day.date.iso_week();
            by_week
                .entry((week.year(), week.week()))
                .or_default()
                .push(day);
        }

        let mut records = Vec::with_capacity(days.len() + by_week.len());
        for ((iso_year, iso_week), members) in by_week {
            let driving = members.iter().map(|d| d.driving_minutes).sum();
            let rest = members.iter().map(|d| d.rest_minutes).sum();
            records.push(RawRecord {
                label: format!("Week {iso_week} {iso_year}"),
                driving: Some(minutes_to_time(driving)),
                daily_rest: None,
                amplitude: None,
                distance_km: 0.0,
                weekly_rest: Some(minutes_to_time(rest)),
            });
            records.extend(members.into_iter().map(day_record));
        }

        debug!(
            activities = activities.len(),
            records = records.len(),
            "activities normalized"
        );
        records
    }
}

fn day_record(day: &DaySummary) -> RawRecord {
    RawRecord {
        label: day.date.format("%a. %-d %b. %Y").to_string(),
        driving: Some(minutes_to_time(day.driving_minutes)),
        daily_rest: Some(minutes_to_time(day.rest_minutes)),
        amplitude: Some(minutes_to_time(day.amplitude_minutes)),
        distance_km: 0.0,
        weekly_rest: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn activity(kind: ActivityKind, start: &str, end: &str) -> Activity {
        let start: DateTime<Utc> = start.parse().unwrap();
        let end: DateTime<Utc> = end.parse().unwrap();
        Activity {
            kind,
            start,
            end,
            duration_minutes: ((end - start).num_minutes()).max(0) as u32,
            vehicle_registration: None,
        }
    }

    fn paris() -> ActivityNormalizer {
        ActivityNormalizer::new(chrono_tz::Europe::Paris)
    }

    #[test]
    fn test_day_totals_and_amplitude() {
        // Paris is UTC+2 in October
        let activities = vec![
            activity(ActivityKind::Work, "2024-10-07T04:00:00Z", "2024-10-07T04:30:00Z"),
            activity(ActivityKind::Driving, "2024-10-07T04:30:00Z", "2024-10-07T09:00:00Z"),
            activity(ActivityKind::Rest, "2024-10-07T09:00:00Z", "2024-10-07T09:45:00Z"),
            activity(ActivityKind::Driving, "2024-10-07T09:45:00Z", "2024-10-07T13:15:00Z"),
            activity(ActivityKind::Availability, "2024-10-07T13:15:00Z", "2024-10-07T14:00:00Z"),
        ];
        let days = paris().summarize_days(&activities);

        assert_eq!(
            days,
            vec![DaySummary {
                date: NaiveDate::from_ymd_opt(2024, 10, 7).unwrap(),
                driving_minutes: 8 * 60,
                rest_minutes: 45,
                amplitude_minutes: 10 * 60,
            }]
        );
    }

    #[test]
    fn test_rest_crossing_midnight_counts_once_on_start_day() {
        // 22:00 Paris on the 7th to 06:00 Paris on the 8th
        let activities = vec![
            activity(ActivityKind::Driving, "2024-10-07T10:00:00Z", "2024-10-07T14:00:00Z"),
            activity(ActivityKind::Rest, "2024-10-07T20:00:00Z", "2024-10-08T04:00:00Z"),
            activity(ActivityKind::Driving, "2024-10-08T05:00:00Z", "2024-10-08T08:00:00Z"),
        ];
        let days = paris().summarize_days(&activities);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].rest_minutes, 480);
        assert_eq!(days[1].rest_minutes, 0);
        assert_eq!(days[1].driving_minutes, 180);
        let total_rest: u32 = days.iter().map(|d| d.rest_minutes).sum();
        assert_eq!(total_rest, 480);
    }

    #[test]
    fn test_bucketing_uses_local_day() {
        // 23:30 UTC on the 6th is already the 7th in Paris
        let activities = vec![activity(
            ActivityKind::Driving,
            "2024-10-06T23:30:00Z",
            "2024-10-07T01:00:00Z",
        )];
        let paris_days = paris().summarize_days(&activities);
        let utc_days = ActivityNormalizer::new(chrono_tz::UTC).summarize_days(&activities);

        assert_eq!(paris_days[0].date, NaiveDate::from_ymd_opt(2024, 10, 7).unwrap());
        assert_eq!(utc_days[0].date, NaiveDate::from_ymd_opt(2024, 10, 6).unwrap());
    }

    #[test]
    fn test_rest_only_day_has_no_amplitude() {
        let activities = vec![activity(
            ActivityKind::Rest,
            "2024-10-12T06:00:00Z",
            "2024-10-12T20:00:00Z",
        )];
        let days = paris().summarize_days(&activities);
        assert_eq!(days[0].amplitude_minutes, 0);
        assert_eq!(days[0].rest_minutes, 14 * 60);
    }

    #[test]
    fn test_inverted_interval_does_not_panic() {
        let mut inverted = activity(ActivityKind::Work, "2024-10-07T10:00:00Z", "2024-10-07T11:00:00Z");
        std::mem::swap(&mut inverted.start, &mut inverted.end);
        let days = paris().summarize_days(&[inverted]);
        assert_eq!(days[0].amplitude_minutes, 0);
    }

    #[test]
    fn test_normalize_groups_iso_weeks() {
        // Sunday 6 Oct 2024 closes ISO week 40, Monday 7 Oct opens week 41
        let activities = vec![
            activity(ActivityKind::Driving, "2024-10-06T08:00:00Z", "2024-10-06T10:00:00Z"),
            activity(ActivityKind::Rest, "2024-10-06T10:00:00Z", "2024-10-06T21:00:00Z"),
            activity(ActivityKind::Driving, "2024-10-07T06:00:00Z", "2024-10-07T15:00:00Z"),
            activity(ActivityKind::Driving, "2024-10-08T06:00:00Z", "2024-10-08T16:00:00Z"),
            activity(ActivityKind::Rest, "2024-10-08T16:00:00Z", "2024-10-09T03:00:00Z"),
        ];
        let records = paris().normalize(&activities);
        let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();

        assert_eq!(
            labels,
            vec![
                "Week 40 2024",
                "Sun. 6 Oct. 2024",
                "Week 41 2024",
                "Mon. 7 Oct. 2024",
                "Tue. 8 Oct. 2024",
            ]
        );

        let week41 = &records[2];
        assert_eq!(week41.driving.as_deref(), Some("19:00"));
        assert_eq!(week41.weekly_rest.as_deref(), Some("11:00"));
        assert_eq!(week41.daily_rest, None);
        assert_eq!(week41.amplitude, None);

        let monday = &records[3];
        assert_eq!(monday.driving.as_deref(), Some("09:00"));
        assert_eq!(monday.daily_rest.as_deref(), Some("00:00"));
        assert_eq!(monday.amplitude.as_deref(), Some("09:00"));
        assert_eq!(monday.weekly_rest, None);
    }

    #[test]
    fn test_iso_year_differs_from_calendar_year() {
        // Monday 30 Dec 2024 is in ISO week 1 of 2025
        let activities = vec![activity(
            ActivityKind::Driving,
            "2024-12-30T08:00:00Z",
            "2024-12-30T12:00:00Z",
        )];
        let records = paris().normalize(&activities);
        assert_eq!(records[0].label, "Week 1 2025");
        assert_eq!(records[1].label, "Mon. 30 Dec. 2024");
    }

    #[test]
    fn test_empty_input() {
        assert!(paris().normalize(&[]).is_empty());
    }
}
