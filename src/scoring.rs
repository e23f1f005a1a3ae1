//! Compliance scoring
//!
//! Reduces a period's day count and infraction list to a 0-100 score, and
//! computes the descriptive statistics shown alongside it.

use serde::{Deserialize, Serialize};

use crate::classifier::is_day_label;
use crate::dates::parse_label_date;
use crate::rules::RuleCode;
use crate::types::{Day, Infraction, Severity};
use crate::units::round_to;

/// Scorer for a single analysis period
pub struct ComplianceScorer;

impl ComplianceScorer {
    /// Compute the compliance score.
    ///
    /// The base is the share of days without a single-day infraction; every
    /// infraction then costs points according to its severity. An empty period
    /// scores 100.
    pub fn score(total_days: usize, infractions: &[Infraction]) -> u8 {
        if total_days == 0 {
            return 100;
        }

        let single_day = infractions
            .iter()
            .filter(|i| is_single_day_label(&i.date))
            .count();

        let conforming_days = total_days as f64 - single_day as f64;
        let mut score = conforming_days / total_days as f64 * 100.0;

        score -= infractions
            .iter()
            .map(|i| i.severity.score_penalty())
            .sum::<f64>();

        score.round().clamp(0.0, 100.0) as u8
    }
}

/// Whether an infraction date names one day (rather than a week or a week pair).
///
/// Dates rewritten by the correction pass are ISO `YYYY-MM-DD` and still count.
pub fn is_single_day_label(label: &str) -> bool {
    is_day_label(label) || (label.trim().len() == 10 && parse_label_date(label, 0).is_some())
}

/// Descriptive statistics over one analysis period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStatistics {
    /// Average driving hours over days with driving
    pub average_driving_hours: f64,
    /// Average daily rest hours over days with rest recorded
    pub average_rest_hours: f64,
    /// Average distance per day (km)
    pub average_distance_km: f64,
    /// Number of daily driving overruns
    pub daily_driving_overruns: usize,
    pub fourth_class_count: usize,
    pub fifth_class_count: usize,
    /// Sum of the minimum fines (euros)
    pub potential_cost_min: u64,
    /// Sum of the maximum fines (euros)
    pub potential_cost_max: u64,
}

impl PeriodStatistics {
    pub fn compute(days: &[Day], infractions: &[Infraction]) -> Self {
        let driving: Vec<f64> = days
            .iter()
            .map(Day::driving_hours)
            .filter(|h| *h > 0.0)
            .collect();
        let rest: Vec<f64> = days
            .iter()
            .map(Day::rest_hours)
            .filter(|h| *h > 0.0)
            .collect();
        let total_distance: f64 = days.iter().map(|d| d.distance_km).sum();

        let average_distance_km = if days.is_empty() {
            0.0
        } else {
            (total_distance / days.len() as f64).round()
        };

        let count_severity =
            |severity: Severity| infractions.iter().filter(|i| i.severity == severity).count();

        Self {
            average_driving_hours: average(&driving).map_or(0.0, |v| round_to(v, 1)),
            average_rest_hours: average(&rest).map_or(0.0, |v| round_to(v, 1)),
            average_distance_km,
            daily_driving_overruns: infractions
                .iter()
                .filter(|i| i.code == RuleCode::DailyDriving.as_str())
                .count(),
            fourth_class_count: count_severity(Severity::FourthClass),
            fifth_class_count: count_severity(Severity::FifthClass),
            potential_cost_min: infractions.iter().map(|i| u64::from(i.fine_min)).sum(),
            potential_cost_max: infractions.iter().map(|i| u64::from(i.fine_max)).sum(),
        }
    }
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infraction(date: &str, code: RuleCode, severity: Severity) -> Infraction {
        let (fine_min, fine_max) = severity.fine_range();
        Infraction {
            date: date.to_string(),
            category: String::new(),
            code: code.as_str().to_string(),
            detail: String::new(),
            observed_value: 0.0,
            limit: 0.0,
            severity,
            fine_min,
            fine_max,
            article: String::new(),
        }
    }

    #[test]
    fn test_empty_period_scores_100() {
        assert_eq!(ComplianceScorer::score(0, &[]), 100);
        let infractions = vec![infraction("Week 40 2024", RuleCode::WeeklyRest, Severity::FifthClass)];
        assert_eq!(ComplianceScorer::score(0, &infractions), 100);
    }

    #[test]
    fn test_clean_period_scores_100() {
        assert_eq!(ComplianceScorer::score(20, &[]), 100);
    }

    #[test]
    fn test_single_day_infractions_reduce_base() {
        // 10 days, 2 day infractions: base 80, minus 1 + 2
        let infractions = vec![
            infraction("Mon. 7 Oct. 2024", RuleCode::DailyDriving, Severity::FourthClass),
            infraction("Tue. 8 Oct. 2024", RuleCode::DailyRest, Severity::FifthClass),
        ];
        assert_eq!(ComplianceScorer::score(10, &infractions), 77);
    }

    #[test]
    fn test_week_infractions_only_deduct_penalty() {
        let infractions = vec![
            infraction("Week 41 2024", RuleCode::WeeklyDriving, Severity::FourthClass),
            infraction(
                "Week 41 2024 + Week 42 2024",
                RuleCode::BiweeklyDriving,
                Severity::FifthClass,
            ),
            infraction("Week 42 2024", RuleCode::WeeklyRest, Severity::Misdemeanor),
        ];
        assert_eq!(ComplianceScorer::score(10, &infractions), 92);
    }

    #[test]
    fn test_corrected_iso_dates_count_as_single_day() {
        let infractions = vec![infraction("2025-01-06", RuleCode::DailyRest, Severity::FourthClass)];
        assert_eq!(ComplianceScorer::score(4, &infractions), 74);
    }

    #[test]
    fn test_score_is_clamped() {
        let infractions: Vec<Infraction> = (0..10)
            .map(|i| infraction(&format!("Mon. {} Oct. 2024", i + 1), RuleCode::DailyDriving, Severity::FifthClass))
            .collect();
        assert_eq!(ComplianceScorer::score(2, &infractions), 0);
    }

    #[test]
    fn test_single_day_label_detection() {
        assert!(is_single_day_label("Lun. 7 Oct. 2024"));
        assert!(is_single_day_label("2024-10-07"));
        assert!(!is_single_day_label("Week 41 2024"));
        assert!(!is_single_day_label("Semaine 41 2024 + Semaine 42 2024"));
    }

    #[test]
    fn test_statistics() {
        let days = vec![
            Day::new("Mon. 7 Oct. 2024", 9 * 60, 11 * 60, 12 * 60, 500.0),
            Day::new("Tue. 8 Oct. 2024", 11 * 60, 9 * 60, 13 * 60, 700.0),
            Day::new("Sun. 13 Oct. 2024", 0, 0, 0, 0.0),
        ];
        let infractions = vec![
            infraction("Tue. 8 Oct. 2024", RuleCode::DailyDriving, Severity::FourthClass),
            infraction("Week 41 2024", RuleCode::WeeklyRest, Severity::FifthClass),
        ];
        let stats = PeriodStatistics::compute(&days, &infractions);

        assert_eq!(stats.average_driving_hours, 10.0);
        assert_eq!(stats.average_rest_hours, 10.0);
        assert_eq!(stats.average_distance_km, 400.0);
        assert_eq!(stats.daily_driving_overruns, 1);
        assert_eq!(stats.fourth_class_count, 1);
        assert_eq!(stats.fifth_class_count, 1);
        assert_eq!(stats.potential_cost_min, 135 + 1500);
        assert_eq!(stats.potential_cost_max, 750 + 3000);
    }

    #[test]
    fn test_statistics_empty_period() {
        assert_eq!(PeriodStatistics::compute(&[], &[]), PeriodStatistics::default());
    }
}
