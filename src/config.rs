//! Analysis configuration
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! `TACHO_*` environment variables. The CLI applies its own flags last.

use chrono::{Datelike, Local};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::ComputeError;

pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Configuration of one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// IANA timezone used to bucket activities into calendar days
    pub timezone: String,
    /// Year assumed for day labels without one when no label carries a year
    pub fallback_year: Option<i32>,
    /// Run the year-rollover correction pass on infraction dates
    pub correct_dates: bool,
    /// Log level filter used by the CLI when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            fallback_year: None,
            correct_dates: true,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Load defaults overridden by the environment
    pub fn load() -> Result<Self, ComputeError> {
        Self::default().with_env_overrides()
    }

    /// Load a JSON file, then apply environment overrides
    pub fn load_from_file(path: &Path) -> Result<Self, ComputeError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)?.with_env_overrides()
    }

    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ComputeError> {
        if let Ok(tz) = env::var("TACHO_TIMEZONE") {
            self.timezone = tz;
        }
        if let Ok(year) = env::var("TACHO_FALLBACK_YEAR") {
            let year = year.trim().parse::<i32>().map_err(|_| {
                ComputeError::ConfigError(format!("TACHO_FALLBACK_YEAR must be a year, got '{year}'"))
            })?;
            self.fallback_year = Some(year);
        }
        if let Ok(flag) = env::var("TACHO_CORRECT_DATES") {
            self.correct_dates = parse_flag(&flag).ok_or_else(|| {
                ComputeError::ConfigError(format!("TACHO_CORRECT_DATES must be a boolean, got '{flag}'"))
            })?;
        }
        if let Ok(level) = env::var("TACHO_LOG_LEVEL") {
            self.log_level = level;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        self.tz().map(|_| ())
    }

    /// Resolve the configured timezone
    pub fn tz(&self) -> Result<Tz, ComputeError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ComputeError::InvalidTimezone(self.timezone.clone()))
    }

    /// Fallback year, defaulting to the current calendar year
    pub fn effective_fallback_year(&self) -> i32 {
        self.fallback_year.unwrap_or_else(|| Local::now().year())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("TACHO_TIMEZONE");
        env::remove_var("TACHO_FALLBACK_YEAR");
        env::remove_var("TACHO_CORRECT_DATES");
        env::remove_var("TACHO_LOG_LEVEL");
    }

    #[test]
    fn test_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AnalysisConfig::load().expect("config loads with defaults");
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::Paris);
    }

    #[test]
    fn test_env_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TACHO_TIMEZONE", "UTC");
        env::set_var("TACHO_FALLBACK_YEAR", "2024");
        env::set_var("TACHO_CORRECT_DATES", "off");
        let config = AnalysisConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.fallback_year, Some(2024));
        assert_eq!(config.effective_fallback_year(), 2024);
        assert!(!config.correct_dates);
    }

    #[test]
    fn test_invalid_env_values_are_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TACHO_FALLBACK_YEAR", "next year");
        let result = AnalysisConfig::load();
        reset_env();
        assert!(matches!(result, Err(ComputeError::ConfigError(_))));

        env::set_var("TACHO_TIMEZONE", "Mars/Olympus_Mons");
        let result = AnalysisConfig::load();
        reset_env();
        assert!(matches!(result, Err(ComputeError::InvalidTimezone(_))));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = AnalysisConfig::from_json(r#"{"timezone": "Europe/Berlin"}"#).unwrap();
        assert_eq!(config.timezone, "Europe/Berlin");
        assert!(config.correct_dates);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_from_json_rejects_unknown_timezone() {
        let result = AnalysisConfig::from_json(r#"{"timezone": "Nowhere/City"}"#);
        assert!(matches!(result, Err(ComputeError::InvalidTimezone(_))));
    }
}
