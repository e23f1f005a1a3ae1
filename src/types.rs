//! Core types for the Tacho Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: decoded activities, canonical raw records, day and week records,
//! and the classified infractions produced by the rule engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::units::minutes_to_hours;

/// Activity kind recorded by the tachograph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Driving,
    Work,
    Rest,
    Availability,
    Unknown,
}

/// One discrete activity interval emitted by the card decoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_registration: Option<String>,
}

/// Driver identity as reported by the card decoder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverIdentity {
    pub driver_name: String,
    pub card_number: String,
}

/// Canonical raw record - the origin-agnostic row shape consumed by the extractor
///
/// Time fields are kept as text exactly as the producer emitted them; parsing
/// happens during extraction so malformed cells degrade to zero there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Free-text period descriptor ("Mon. 30 Sep. 2024", "Week 40 2024", "Total", ...)
    pub label: String,
    pub driving: Option<String>,
    pub daily_rest: Option<String>,
    pub amplitude: Option<String>,
    pub distance_km: f64,
    pub weekly_rest: Option<String>,
}

/// One analysed calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub date: String,
    pub driving_minutes: u32,
    pub rest_minutes: u32,
    pub amplitude_minutes: u32,
    pub distance_km: f64,
}

impl Day {
    pub fn new(
        date: impl Into<String>,
        driving_minutes: u32,
        rest_minutes: u32,
        amplitude_minutes: u32,
        distance_km: f64,
    ) -> Self {
        Self {
            date: date.into(),
            driving_minutes,
            rest_minutes,
            amplitude_minutes,
            distance_km,
        }
    }

    pub fn driving_hours(&self) -> f64 {
        minutes_to_hours(self.driving_minutes)
    }

    pub fn rest_hours(&self) -> f64 {
        minutes_to_hours(self.rest_minutes)
    }

    pub fn amplitude_hours(&self) -> f64 {
        minutes_to_hours(self.amplitude_minutes)
    }
}

/// One analysed week, owning its member days
///
/// `driving_minutes` is the source-declared weekly total and is never
/// recomputed from `days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    pub label: String,
    pub date: String,
    pub driving_minutes: u32,
    pub rest_minutes: u32,
    pub days: Vec<Day>,
}

impl Week {
    pub fn new(label: impl Into<String>, driving_minutes: u32, rest_minutes: u32) -> Self {
        let label = label.into();
        Self {
            date: label.clone(),
            label,
            driving_minutes,
            rest_minutes,
            days: Vec::new(),
        }
    }

    pub fn with_days(mut self, days: Vec<Day>) -> Self {
        self.days = days;
        self
    }

    pub fn driving_hours(&self) -> f64 {
        minutes_to_hours(self.driving_minutes)
    }

    pub fn rest_hours(&self) -> f64 {
        minutes_to_hours(self.rest_minutes)
    }
}

/// Severity tier, ordered from least to most serious
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    ThirdClass,
    FourthClass,
    FifthClass,
    Misdemeanor,
}

impl Severity {
    /// Canonical fine range in euros (min, max)
    pub fn fine_range(&self) -> (u32, u32) {
        match self {
            Severity::ThirdClass => (45, 450),
            Severity::FourthClass => (135, 750),
            Severity::FifthClass => (1500, 3000),
            Severity::Misdemeanor => (3750, 30000),
        }
    }

    /// Score deduction applied by the compliance scorer
    pub fn score_penalty(&self) -> f64 {
        match self {
            Severity::ThirdClass => 0.0,
            Severity::FourthClass => 1.0,
            Severity::FifthClass => 2.0,
            Severity::Misdemeanor => 5.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::ThirdClass => "3rd-class",
            Severity::FourthClass => "4th-class",
            Severity::FifthClass => "5th-class",
            Severity::Misdemeanor => "misdemeanor",
        }
    }
}

/// One detected violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infraction {
    /// Day label, week label, or "week A + week B" for the bi-weekly rule
    pub date: String,
    pub category: String,
    pub code: String,
    pub detail: String,
    pub observed_value: f64,
    pub limit: f64,
    pub severity: Severity,
    pub fine_min: u32,
    pub fine_max: u32,
    pub article: String,
}
