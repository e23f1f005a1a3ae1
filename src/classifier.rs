//! Raw row classification
//!
//! Tachograph exports interleave day rows, week rows and a variety of summary
//! rows under a single free-text "Date" column. The classifier decides what a
//! row is from that label alone. Exports come in English and French, so both
//! vocabularies are recognised.

use serde::{Deserialize, Serialize};

/// Classification of a raw record's period label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Day,
    Week,
    Period,
    Month,
    Quarter,
    Ignore,
}

const WEEKDAY_ABBREVIATIONS: [&str; 14] = [
    "mon", "tue", "wed", "thu", "fri", "sat", "sun", // English
    "lun", "mar", "mer", "jeu", "ven", "sam", "dim", // French
];

const LONG_SUMMARY_MARKERS: [&str; 7] = [
    "quadrimester",
    "quadrimestre",
    "semester",
    "semestre",
    "year",
    "année",
    "annee",
];

/// Classify a free-text period label.
///
/// Unrecognised labels classify as [`RowKind::Ignore`] so that unknown summary
/// rows never abort processing.
pub fn classify(label: &str) -> RowKind {
    let lower = label.trim().to_lowercase();
    if lower.is_empty() {
        return RowKind::Ignore;
    }

    if lower == "total" || lower.starts_with("total ") {
        return RowKind::Ignore;
    }
    if LONG_SUMMARY_MARKERS.iter().any(|m| lower.contains(m)) {
        return RowKind::Ignore;
    }

    if is_day_label(&lower) {
        return RowKind::Day;
    }
    if lower.contains("week") || lower.contains("semaine") {
        return RowKind::Week;
    }
    if lower.contains("per.") || lower.contains("period") || lower.contains("période") {
        return RowKind::Period;
    }
    if lower.contains("month") || lower.contains("mois") {
        return RowKind::Month;
    }
    if lower.contains("quarter") || lower.contains("trimestre") {
        return RowKind::Quarter;
    }

    RowKind::Ignore
}

/// Whether a label names a single day: a 3-letter weekday abbreviation followed by `.`
pub fn is_day_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    WEEKDAY_ABBREVIATIONS.iter().any(|abbr| {
        lower
            .match_indices(abbr)
            .any(|(idx, _)| lower[idx + abbr.len()..].starts_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_are_ignored() {
        assert_eq!(classify("Total"), RowKind::Ignore);
        assert_eq!(classify("TOTAL 2024"), RowKind::Ignore);
        assert_eq!(classify("Quadrimestre 3 2024"), RowKind::Ignore);
        assert_eq!(classify("Semester 2"), RowKind::Ignore);
        assert_eq!(classify("Année 2024"), RowKind::Ignore);
        assert_eq!(classify("Year 2024"), RowKind::Ignore);
    }

    #[test]
    fn test_day_labels() {
        assert_eq!(classify("Mon. 30 Sep. 2024"), RowKind::Day);
        assert_eq!(classify("Lun. 30 Sept. 2024"), RowKind::Day);
        assert_eq!(classify("sam. 5 oct."), RowKind::Day);
        assert_eq!(classify("Dim. 6 Oct. 2024"), RowKind::Day);
    }

    #[test]
    fn test_summary_labels() {
        assert_eq!(classify("Week 40 2024"), RowKind::Week);
        assert_eq!(classify("Semaine 40 2024"), RowKind::Week);
        assert_eq!(classify("Per. 1"), RowKind::Period);
        assert_eq!(classify("Période du 1 au 14"), RowKind::Period);
        assert_eq!(classify("Mois Octobre"), RowKind::Month);
        assert_eq!(classify("Month 10"), RowKind::Month);
        assert_eq!(classify("Trimestre 4"), RowKind::Quarter);
        assert_eq!(classify("Quarter 4"), RowKind::Quarter);
    }

    #[test]
    fn test_unknown_labels_are_ignored() {
        assert_eq!(classify(""), RowKind::Ignore);
        assert_eq!(classify("   "), RowKind::Ignore);
        assert_eq!(classify("Conducteur: J. Martin"), RowKind::Ignore);
        // Weekday abbreviation without a trailing dot is not a day row
        assert_eq!(classify("Monday"), RowKind::Ignore);
    }

    #[test]
    fn test_total_wins_over_day_pattern() {
        assert_eq!(classify("Total Lun."), RowKind::Ignore);
    }
}
