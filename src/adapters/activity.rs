//! Decoded activity log adapter
//!
//! Parses the tachograph decoder's response (driver identity plus discrete
//! activity intervals) and hands the intervals to the activity normalizer.

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::ComputeError;
use crate::normalizer::ActivityNormalizer;
use crate::types::{Activity, DriverIdentity, RawRecord};

use super::RecordSource;

/// Activity log adapter, bucketing days in `tz`
pub struct ActivityLogAdapter {
    normalizer: ActivityNormalizer,
}

/// Parsed activity log
#[derive(Debug, Clone)]
pub struct ActivityLog {
    pub driver: Option<DriverIdentity>,
    pub activities: Vec<Activity>,
}

impl ActivityLogAdapter {
    pub fn new(tz: Tz) -> Self {
        Self {
            normalizer: ActivityNormalizer::new(tz),
        }
    }

    /// Parse a decoder response, a single driver log, or a bare activity array
    pub fn parse_log(&self, raw_json: &str) -> Result<ActivityLog, ComputeError> {
        let payload: ActivityPayload = serde_json::from_str(raw_json)?;

        let log = match payload {
            ActivityPayload::Response { results } => {
                let driver = results.into_iter().next().ok_or_else(|| {
                    ComputeError::ParseError("decoder response contains no driver".to_string())
                })?;
                driver.into_log()
            }
            ActivityPayload::Driver(driver) => driver.into_log(),
            ActivityPayload::Bare(activities) => ActivityLog {
                driver: None,
                activities,
            },
        };

        Ok(log)
    }

    pub fn normalizer(&self) -> &ActivityNormalizer {
        &self.normalizer
    }
}

impl RecordSource for ActivityLogAdapter {
    fn records(&self, raw_json: &str) -> Result<Vec<RawRecord>, ComputeError> {
        let log = self.parse_log(raw_json)?;
        Ok(self.normalizer.normalize(&log.activities))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActivityPayload {
    Response { results: Vec<DriverLog> },
    Driver(DriverLog),
    Bare(Vec<Activity>),
}

#[derive(Debug, Deserialize)]
struct DriverLog {
    #[serde(default)]
    driver_name: Option<String>,
    #[serde(default)]
    card_number: Option<String>,
    activities: Vec<Activity>,
}

impl DriverLog {
    fn into_log(self) -> ActivityLog {
        let driver = match (self.driver_name, self.card_number) {
            (None, None) => None,
            (name, card) => Some(DriverIdentity {
                driver_name: name.unwrap_or_default(),
                card_number: card.unwrap_or_default(),
            }),
        };
        ActivityLog {
            driver,
            activities: self.activities,
        }
    }
}
