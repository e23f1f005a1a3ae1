//! Rule definition table
//!
//! Static description of every driving/rest-time rule the engine evaluates:
//! the limit the engine enforces, default severity and the legal article cited
//! on the resulting infraction. The standard table is built once per process and
//! shared read-only between concurrent analysis runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::types::Severity;

/// Identifier of a rule in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCode {
    /// Daily driving above the absolute 10h limit
    DailyDriving,
    /// 9h-10h daily driving extension used more than twice a week
    DailyDrivingExtension,
    /// Daily rest below the legal minimum
    DailyRest,
    /// Working day amplitude above 12h (14h when extended)
    DailyAmplitude,
    /// Weekly driving above 56h
    WeeklyDriving,
    /// Weekly rest below 45h
    WeeklyRest,
    /// Driving over two consecutive weeks above 90h
    BiweeklyDriving,
}

impl RuleCode {
    pub const ALL: [RuleCode; 7] = [
        RuleCode::DailyDriving,
        RuleCode::DailyDrivingExtension,
        RuleCode::DailyRest,
        RuleCode::DailyAmplitude,
        RuleCode::WeeklyDriving,
        RuleCode::WeeklyRest,
        RuleCode::BiweeklyDriving,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCode::DailyDriving => "DAILY_DRIVING",
            RuleCode::DailyDrivingExtension => "DAILY_DRIVING_EXTENSION",
            RuleCode::DailyRest => "DAILY_REST",
            RuleCode::DailyAmplitude => "DAILY_AMPLITUDE",
            RuleCode::WeeklyDriving => "WEEKLY_DRIVING",
            RuleCode::WeeklyRest => "WEEKLY_REST",
            RuleCode::BiweeklyDriving => "BIWEEKLY_DRIVING",
        }
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enforced limit of a rule, either in hours or as a weekly frequency.
///
/// Hour limits are upper bounds except for the rest rules, where they are
/// floors. The extension rule counts tolerated uses per week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    Hours(f64),
    TimesPerWeek(u32),
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Hours(h) => write!(f, "{h}h"),
            Threshold::TimesPerWeek(n) => write!(f, "{n} times/week"),
        }
    }
}

/// One entry of the rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub code: RuleCode,
    pub label: String,
    pub description: String,
    pub threshold: Threshold,
    pub default_severity: Severity,
    pub article: String,
}

/// Immutable map of rule code to definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    rules: HashMap<RuleCode, RuleDefinition>,
}

impl RuleTable {
    /// The process-wide standard table (EU 561/2006 as enforced by the French
    /// transport code), built on first use.
    pub fn standard() -> &'static RuleTable {
        static STANDARD: OnceLock<RuleTable> = OnceLock::new();
        STANDARD.get_or_init(build_standard_table)
    }

    pub fn from_definitions(definitions: impl IntoIterator<Item = RuleDefinition>) -> Self {
        Self {
            rules: definitions.into_iter().map(|d| (d.code, d)).collect(),
        }
    }

    /// Copy of this table without the given rule
    pub fn without(&self, code: RuleCode) -> Self {
        let mut rules = self.rules.clone();
        rules.remove(&code);
        Self { rules }
    }

    pub fn get(&self, code: RuleCode) -> Option<&RuleDefinition> {
        self.rules.get(&code)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Definitions in stable code order
    pub fn definitions(&self) -> Vec<&RuleDefinition> {
        let mut defs: Vec<&RuleDefinition> = self.rules.values().collect();
        defs.sort_by_key(|d| d.code);
        defs
    }
}

fn build_standard_table() -> RuleTable {
    let rule = |code, label: &str, description: &str, threshold, article: &str| RuleDefinition {
        code,
        label: label.to_string(),
        description: description.to_string(),
        threshold,
        default_severity: Severity::FourthClass,
        article: article.to_string(),
    };

    RuleTable::from_definitions([
        rule(
            RuleCode::DailyDriving,
            "Daily driving > 10h",
            "Daily driving time exceeded (9h, extendable to 10h twice a week)",
            Threshold::Hours(10.0),
            "Art. R. 3312-3",
        ),
        rule(
            RuleCode::DailyDrivingExtension,
            "Daily driving extension too frequent",
            "10h daily driving extension used more than twice in a week",
            Threshold::TimesPerWeek(2),
            "Art. R. 3312-3",
        ),
        rule(
            RuleCode::DailyRest,
            "Daily rest < 9h",
            "Insufficient daily rest (11h, reducible to 9h three times a week)",
            Threshold::Hours(9.0),
            "Art. R. 3312-4",
        ),
        rule(
            RuleCode::DailyAmplitude,
            "Amplitude > 12h",
            "Excessive working day amplitude (12h, extendable to 14h under conditions)",
            Threshold::Hours(12.0),
            "Art. R. 3312-5",
        ),
        rule(
            RuleCode::WeeklyDriving,
            "Weekly driving > 56h",
            "Weekly driving time exceeded",
            Threshold::Hours(56.0),
            "Art. R. 3312-6",
        ),
        rule(
            RuleCode::WeeklyRest,
            "Weekly rest < 45h",
            "Insufficient weekly rest (45h, reducible to 24h with compensation)",
            Threshold::Hours(45.0),
            "Art. R. 3312-7",
        ),
        rule(
            RuleCode::BiweeklyDriving,
            "Two-week driving > 90h",
            "Driving time over two consecutive weeks exceeded",
            Threshold::Hours(90.0),
            "Art. R. 3312-6",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_is_complete() {
        let table = RuleTable::standard();
        assert_eq!(table.len(), RuleCode::ALL.len());
        for code in RuleCode::ALL {
            let def = table.get(code).expect("rule present");
            assert_eq!(def.code, code);
            assert_eq!(def.default_severity, Severity::FourthClass);
        }
    }

    #[test]
    fn test_standard_thresholds_are_enforced_limits() {
        let threshold = |code| RuleTable::standard().get(code).map(|d| d.threshold);
        assert_eq!(threshold(RuleCode::DailyDriving), Some(Threshold::Hours(10.0)));
        assert_eq!(threshold(RuleCode::DailyDrivingExtension), Some(Threshold::TimesPerWeek(2)));
        assert_eq!(threshold(RuleCode::DailyRest), Some(Threshold::Hours(9.0)));
        assert_eq!(threshold(RuleCode::DailyAmplitude), Some(Threshold::Hours(12.0)));
        assert_eq!(threshold(RuleCode::WeeklyDriving), Some(Threshold::Hours(56.0)));
        assert_eq!(threshold(RuleCode::WeeklyRest), Some(Threshold::Hours(45.0)));
        assert_eq!(threshold(RuleCode::BiweeklyDriving), Some(Threshold::Hours(90.0)));
    }

    #[test]
    fn test_standard_table_is_shared() {
        assert!(std::ptr::eq(RuleTable::standard(), RuleTable::standard()));
    }

    #[test]
    fn test_without_removes_single_rule() {
        let table = RuleTable::standard().without(RuleCode::WeeklyRest);
        assert!(table.get(RuleCode::WeeklyRest).is_none());
        assert!(table.get(RuleCode::WeeklyDriving).is_some());
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_definitions_are_ordered() {
        let codes: Vec<RuleCode> = RuleTable::standard()
            .definitions()
            .iter()
            .map(|d| d.code)
            .collect();
        assert_eq!(codes, RuleCode::ALL.to_vec());
    }

    #[test]
    fn test_code_serialization() {
        let json = serde_json::to_string(&RuleCode::BiweeklyDriving).unwrap();
        assert_eq!(json, "\"BIWEEKLY_DRIVING\"");
        assert_eq!(RuleCode::DailyRest.to_string(), "DAILY_REST");
    }
}
