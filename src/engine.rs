//! Infraction rule engine
//!
//! Evaluates day, week and adjacent-week-pair scopes against the rule table.
//! The engine is a pure function of its inputs: it performs no I/O, never
//! mutates the records it is given and always emits infractions in the same
//! order (daily rules, then weekly rules, then bi-weekly rules).

use std::cmp::Ordering;

use tracing::warn;

use crate::rules::{RuleCode, RuleDefinition, RuleTable, Threshold};
use crate::types::{Day, Infraction, Severity, Week};

/// Tolerance absorbing minute-granularity rounding (0.01h = 36s)
pub const EPSILON_HOURS: f64 = 0.01;

// Limits below are fallbacks. The enforced value comes from the rule's
// threshold in the table; a threshold of the wrong kind falls back here.
const DAILY_DRIVING_MAX: f64 = 10.0;
const DAILY_DRIVING_EXTENSIONS_PER_WEEK: usize = 2;
const DAILY_REST_FLOOR: f64 = 9.0;
const AMPLITUDE_STANDARD: f64 = 12.0;
const WEEKLY_DRIVING_MAX: f64 = 56.0;
const WEEKLY_REST_MIN: f64 = 45.0;
const BIWEEKLY_DRIVING_MAX: f64 = 90.0;

/// Standard daily driving, above which the extension band starts
const DAILY_DRIVING_STANDARD: f64 = 9.0;
/// Regular daily rest, below which (down to the floor) a rest is reduced
const DAILY_REST_REGULAR: f64 = 11.0;
/// Times per week a reduced daily rest is tolerated
const REDUCED_RESTS_PER_WEEK: usize = 3;
const DAILY_REST_SEVERE: f64 = 6.0;
const DAILY_DRIVING_SEVERE_EXCESS: f64 = 1.0;
const AMPLITUDE_EXTENDED: f64 = 14.0;
const WEEKLY_DRIVING_SEVERE_EXCESS: f64 = 14.0;
const WEEKLY_REST_SEVERE: f64 = 20.0;
const BIWEEKLY_DRIVING_SEVERE_EXCESS: f64 = 22.5;

/// Rule engine bound to a rule table
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'a> {
    rules: &'a RuleTable,
}

impl Default for RuleEngine<'static> {
    fn default() -> Self {
        Self::new(RuleTable::standard())
    }
}

impl<'a> RuleEngine<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    /// Detect every infraction in the given days and weeks.
    ///
    /// A rule missing from the table disables that single check.
    pub fn detect(&self, days: &[Day], weeks: &[Week]) -> Vec<Infraction> {
        for code in RuleCode::ALL {
            match self.rules.get(code) {
                None => warn!(rule = %code, "rule missing from table, check skipped"),
                Some(rule) if !threshold_fits(rule) => {
                    warn!(rule = %code, threshold = %rule.threshold, "threshold of the wrong kind, default limit used")
                }
                Some(_) => {}
            }
        }

        let mut infractions = Vec::new();

        for day in days {
            self.check_day(day, &mut infractions);
        }

        for week in weeks {
            self.check_week(week, &mut infractions);
        }

        for pair in weeks.windows(2) {
            self.check_week_pair(&pair[0], &pair[1], &mut infractions);
        }

        infractions
    }

    /// Hours limit of a rule, whether or not its own check is enabled
    fn limit(&self, code: RuleCode, default: f64) -> f64 {
        self.rules.get(code).map_or(default, |rule| hours(rule, default))
    }

    fn check_day(&self, day: &Day, out: &mut Vec<Infraction>) {
        let driving = day.driving_hours();
        let rest = day.rest_hours();
        let amplitude = day.amplitude_hours();
        let driving_max = self.limit(RuleCode::DailyDriving, DAILY_DRIVING_MAX);
        let rest_floor = self.limit(RuleCode::DailyRest, DAILY_REST_FLOOR);

        if let Some(rule) = self.rules.get(RuleCode::DailyDriving) {
            if driving > driving_max + EPSILON_HOURS {
                let excess = driving - driving_max;
                let severity = if excess > DAILY_DRIVING_SEVERE_EXCESS {
                    Severity::FifthClass
                } else {
                    Severity::FourthClass
                };
                out.push(build(
                    rule,
                    &day.date,
                    "Excessive daily driving",
                    format!(
                        "{driving:.2}h of driving (absolute max {driving_max}h, excess +{excess:.2}h)"
                    ),
                    driving,
                    driving_max,
                    severity,
                ));
            }
        }

        // Reduced rest between the floor and 11h is judged at week scope
        if let Some(rule) = self.rules.get(RuleCode::DailyRest) {
            if rest > 0.0 && rest < rest_floor {
                let severity = if rest < DAILY_REST_SEVERE {
                    Severity::FifthClass
                } else {
                    Severity::FourthClass
                };
                out.push(build(
                    rule,
                    &day.date,
                    "Insufficient daily rest",
                    format!("{rest:.2}h of rest (absolute min {rest_floor}h)"),
                    rest,
                    rest_floor,
                    severity,
                ));
            }
        }

        if let Some(rule) = self.rules.get(RuleCode::DailyAmplitude) {
            let standard = hours(rule, AMPLITUDE_STANDARD);
            let extended = AMPLITUDE_EXTENDED.max(standard);

            if amplitude > extended + EPSILON_HOURS {
                out.push(build(
                    rule,
                    &day.date,
                    "Excessive daily amplitude",
                    format!("{amplitude:.2}h of amplitude (absolute max {extended}h)"),
                    amplitude,
                    extended,
                    Severity::FourthClass,
                ));
            } else if amplitude > standard + EPSILON_HOURS {
                let driving_ok = driving <= driving_max + EPSILON_HOURS;
                // rest == 0 counts as satisfied: nothing recorded to contradict the extension
                let rest_ok = rest == 0.0 || rest >= rest_floor;

                if !driving_ok || !rest_ok {
                    let mut reasons = Vec::new();
                    if !driving_ok {
                        reasons.push(format!("driving >{driving_max}h"));
                    }
                    if !rest_ok {
                        reasons.push(format!("rest <{rest_floor}h"));
                    }
                    out.push(build(
                        rule,
                        &day.date,
                        "Excessive daily amplitude",
                        format!(
                            "{amplitude:.2}h of amplitude (max {standard}h, {extended}h extension not allowed: {})",
                            reasons.join(" and ")
                        ),
                        amplitude,
                        standard,
                        Severity::FourthClass,
                    ));
                }
            }
        }
    }

    fn check_week(&self, week: &Week, out: &mut Vec<Infraction>) {
        let driving = week.driving_hours();
        let rest = week.rest_hours();

        if let Some(rule) = self.rules.get(RuleCode::WeeklyDriving) {
            let max = hours(rule, WEEKLY_DRIVING_MAX);
            if driving > max + EPSILON_HOURS {
                let excess = driving - max;
                let severity = if excess > WEEKLY_DRIVING_SEVERE_EXCESS {
                    Severity::FifthClass
                } else {
                    Severity::FourthClass
                };
                out.push(build(
                    rule,
                    &week.date,
                    "Excessive weekly driving",
                    format!(
                        "{driving:.2}h of driving over the week (max {max}h, excess +{excess:.2}h)"
                    ),
                    driving,
                    max,
                    severity,
                ));
            }
        }

        if let Some(rule) = self.rules.get(RuleCode::DailyDrivingExtension) {
            let allowed = times(rule, DAILY_DRIVING_EXTENSIONS_PER_WEEK);
            let driving_max = self.limit(RuleCode::DailyDriving, DAILY_DRIVING_MAX);
            let mut extended: Vec<&Day> = week
                .days
                .iter()
                .filter(|d| {
                    let h = d.driving_hours();
                    h > DAILY_DRIVING_STANDARD + EPSILON_HOURS && h <= driving_max + EPSILON_HOURS
                })
                .collect();
            // Stable: equal driving keeps chronological order
            extended.sort_by(|a, b| descending(a.driving_hours(), b.driving_hours()));

            for (idx, day) in extended.iter().enumerate().skip(allowed) {
                let driving = day.driving_hours();
                out.push(build(
                    rule,
                    &day.date,
                    "Daily driving extension too frequent",
                    format!(
                        "{driving:.2}h of driving (>{DAILY_DRIVING_STANDARD}h allowed only {allowed} times a week, this is the {} day)",
                        ordinal(idx + 1)
                    ),
                    driving,
                    DAILY_DRIVING_STANDARD,
                    Severity::FourthClass,
                ));
            }
        }

        if let Some(rule) = self.rules.get(RuleCode::DailyRest) {
            let floor = hours(rule, DAILY_REST_FLOOR);
            let mut reduced: Vec<&Day> = week
                .days
                .iter()
                .filter(|d| {
                    let h = d.rest_hours();
                    h >= floor && h < DAILY_REST_REGULAR
                })
                .collect();
            reduced.sort_by(|a, b| ascending(a.rest_hours(), b.rest_hours()));

            for (idx, day) in reduced.iter().enumerate().skip(REDUCED_RESTS_PER_WEEK) {
                let rest = day.rest_hours();
                out.push(build(
                    rule,
                    &day.date,
                    "Reduced daily rest too frequent",
                    format!(
                        "{rest:.2}h of rest ({floor}-{DAILY_REST_REGULAR}h reduced rest allowed only {REDUCED_RESTS_PER_WEEK} times a week, this is the {} day)",
                        ordinal(idx + 1)
                    ),
                    rest,
                    DAILY_REST_REGULAR,
                    Severity::FourthClass,
                ));
            }
        }

        if let Some(rule) = self.rules.get(RuleCode::WeeklyRest) {
            let min = hours(rule, WEEKLY_REST_MIN);
            if rest > 0.0 && rest < min {
                let severity = if rest < WEEKLY_REST_SEVERE {
                    Severity::FifthClass
                } else {
                    Severity::FourthClass
                };
                out.push(build(
                    rule,
                    &week.date,
                    "Insufficient weekly rest",
                    format!(
                        "{rest:.2}h of weekly rest (min {min}h, or 24h reduced with compensation)"
                    ),
                    rest,
                    min,
                    severity,
                ));
            }
        }
    }

    fn check_week_pair(&self, first: &Week, second: &Week, out: &mut Vec<Infraction>) {
        let Some(rule) = self.rules.get(RuleCode::BiweeklyDriving) else {
            return;
        };

        let max = hours(rule, BIWEEKLY_DRIVING_MAX);
        let total = first.driving_hours() + second.driving_hours();
        if total > max + EPSILON_HOURS {
            let excess = total - max;
            let severity = if excess > BIWEEKLY_DRIVING_SEVERE_EXCESS {
                Severity::FifthClass
            } else {
                Severity::FourthClass
            };
            out.push(build(
                rule,
                &format!("{} + {}", first.date, second.date),
                "Excessive two-week driving",
                format!(
                    "{total:.2}h of driving over two consecutive weeks (max {max}h, excess +{excess:.2}h)"
                ),
                total,
                max,
                severity,
            ));
        }
    }
}

/// Whether a rule's threshold has the kind its check reads
fn threshold_fits(rule: &RuleDefinition) -> bool {
    match (rule.code, rule.threshold) {
        (RuleCode::DailyDrivingExtension, Threshold::TimesPerWeek(_)) => true,
        (RuleCode::DailyDrivingExtension, Threshold::Hours(_)) => false,
        (_, Threshold::Hours(_)) => true,
        (_, Threshold::TimesPerWeek(_)) => false,
    }
}

fn hours(rule: &RuleDefinition, default: f64) -> f64 {
    match rule.threshold {
        Threshold::Hours(h) if h.is_finite() => h,
        _ => default,
    }
}

fn times(rule: &RuleDefinition, default: usize) -> usize {
    match rule.threshold {
        Threshold::TimesPerWeek(n) => n as usize,
        Threshold::Hours(_) => default,
    }
}

fn build(
    rule: &RuleDefinition,
    date: &str,
    category: &str,
    detail: String,
    observed_value: f64,
    limit: f64,
    severity: Severity,
) -> Infraction {
    let (fine_min, fine_max) = severity.fine_range();
    Infraction {
        date: date.to_string(),
        category: category.to_string(),
        code: rule.code.as_str().to_string(),
        detail,
        observed_value,
        limit,
        severity,
        fine_min,
        fine_max,
        article: rule.article.clone(),
    }
}

fn ascending(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn descending(a: f64, b: f64) -> Ordering {
    ascending(b, a)
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
