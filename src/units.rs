//! Temporal unit conversion
//!
//! Tachograph exports carry every duration as `H:MM` / `HH:MM` text. These
//! helpers convert between that text, whole minutes and decimal hours.

/// Parse `H:MM` / `HH:MM` text into minutes.
///
/// Returns `None` for empty, `"null"` or otherwise malformed input. Hours are not
/// capped at 23 since weekly totals routinely exceed a day.
pub fn parse_duration(text: &str) -> Option<u32> {
    let cleaned = text.trim();
    if cleaned.is_empty() || cleaned == "null" {
        return None;
    }

    let (hours, minutes) = cleaned.split_once(':')?;
    if minutes.contains(':') {
        return None;
    }

    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;

    hours.checked_mul(60)?.checked_add(minutes)
}

/// Parse duration text into minutes, degrading to 0 on any malformed input.
pub fn time_to_minutes(text: Option<&str>) -> u32 {
    text.and_then(parse_duration).unwrap_or(0)
}

/// Convert minutes to decimal hours rounded to two decimals.
pub fn minutes_to_hours(minutes: u32) -> f64 {
    round_to(minutes as f64 / 60.0, 2)
}

/// Render decimal hours as `HH:MM` (floored hours, rounded residual minutes).
pub fn hours_to_time(hours: f64) -> String {
    let hours = hours.max(0.0);
    let h = hours.floor();
    let m = ((hours - h) * 60.0).round();
    format!("{:02}:{:02}", h as u64, m as u64)
}

/// Render whole minutes as `HH:MM`.
pub fn minutes_to_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
