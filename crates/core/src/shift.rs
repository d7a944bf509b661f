//! Shift classification
//!
//! Turns a (login, logout) pair into worked hours and a full-shift flag.
//! Everything here is pure; the ledger supplies both instants.

use chrono::{DateTime, Utc};

use crate::models::PLACEHOLDER;
use crate::storage::parse_timestamp;

/// Default full-shift threshold: 8 hours
pub const DEFAULT_FULL_SHIFT_SECS: u64 = 8 * 60 * 60;

const SECS_PER_HOUR: i64 = 3600;

/// Result of classifying one shift
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftSummary {
    pub elapsed_secs: i64,
    pub worked_hours: f64,
    pub complete: bool,
}

/// Whole seconds between two instants, clamped at zero
pub fn elapsed_secs(login: DateTime<Utc>, logout: DateTime<Utc>) -> i64 {
    let secs = logout.signed_duration_since(login).num_seconds();
    if secs < 0 {
        tracing::warn!(%login, %logout, "Logout precedes login; treating shift as zero length");
        return 0;
    }
    secs
}

/// Hours between two instants, rounded half-up to two decimals
pub fn elapsed_hours(login: DateTime<Utc>, logout: DateTime<Utc>) -> f64 {
    round_hours(elapsed_secs(login, logout))
}

/// Convert non-negative seconds to hours at 0.01 precision, rounding half-up.
///
/// Integer arithmetic keeps exact halves (e.g. 18 s = 0.005 h) from drifting.
pub fn round_hours(secs: i64) -> f64 {
    let secs = secs.max(0);
    let hundredths = (secs * 100 + SECS_PER_HOUR / 2) / SECS_PER_HOUR;
    hundredths as f64 / 100.0
}

/// Classifies shifts against a single configured threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftClassifier {
    threshold_secs: i64,
}

impl Default for ShiftClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FULL_SHIFT_SECS)
    }
}

impl ShiftClassifier {
    pub fn new(threshold_secs: u64) -> Self {
        Self {
            threshold_secs: i64::try_from(threshold_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn threshold_secs(&self) -> i64 {
        self.threshold_secs
    }

    /// Threshold is inclusive
    pub fn is_complete(&self, elapsed_secs: i64) -> bool {
        elapsed_secs >= self.threshold_secs
    }

    pub fn classify(&self, login: DateTime<Utc>, logout: DateTime<Utc>) -> ShiftSummary {
        let elapsed = elapsed_secs(login, logout);
        ShiftSummary {
            elapsed_secs: elapsed,
            worked_hours: round_hours(elapsed),
            complete: self.is_complete(elapsed),
        }
    }

    /// Roster status from the raw text of a user's latest attendance row
    pub fn roster_status(&self, login: Option<&str>, logout: Option<&str>) -> RosterStatus {
        let Some(login) = login else {
            return RosterStatus::NoData;
        };
        let Some(logout) = logout else {
            return RosterStatus::Active;
        };

        match (parse_timestamp(login), parse_timestamp(logout)) {
            (Ok(login), Ok(logout)) => {
                let summary = self.classify(login, logout);
                if summary.complete {
                    RosterStatus::Completed
                } else {
                    RosterStatus::Partial(summary.worked_hours)
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(login, logout, error = %e, "Unparseable attendance timestamp");
                RosterStatus::Unparseable
            }
        }
    }
}

/// Status column of the staff roster
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RosterStatus {
    /// Never clocked in
    NoData,
    /// Clocked in, not out
    Active,
    Completed,
    /// Closed short of the threshold, with hours worked
    Partial(f64),
    Unparseable,
}

impl std::fmt::Display for RosterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterStatus::NoData => write!(f, "No data"),
            RosterStatus::Active => write!(f, "Active"),
            RosterStatus::Completed => write!(f, "Completed"),
            RosterStatus::Partial(hours) => write!(f, "{:.2} hrs", hours),
            RosterStatus::Unparseable => write!(f, "{}", PLACEHOLDER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_elapsed_hours_rounding() {
        assert_eq!(elapsed_hours(at(9, 0, 0), at(17, 0, 0)), 8.0);
        assert_eq!(elapsed_hours(at(9, 0, 0), at(17, 0, 1)), 8.0);
        assert_eq!(elapsed_hours(at(9, 0, 0), at(9, 30, 0)), 0.5);
        // 18 s is exactly 0.005 h and rounds up
        assert_eq!(elapsed_hours(at(9, 0, 0), at(9, 0, 18)), 0.01);
        assert_eq!(elapsed_hours(at(9, 0, 0), at(9, 0, 17)), 0.0);
    }

    #[test]
    fn test_negative_elapsed_clamps_to_zero() {
        assert_eq!(elapsed_secs(at(10, 0, 0), at(9, 0, 0)), 0);
        assert_eq!(elapsed_hours(at(10, 0, 0), at(9, 0, 0)), 0.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let classifier = ShiftClassifier::new(DEFAULT_FULL_SHIFT_SECS);
        let login = at(9, 0, 0);

        let exact = classifier.classify(login, login + Duration::hours(8));
        assert!(exact.complete);

        let short = classifier.classify(login, login + Duration::hours(8) - Duration::seconds(1));
        assert!(!short.complete);
        assert_eq!(short.worked_hours, 8.0);
    }

    #[test]
    fn test_custom_threshold() {
        let classifier = ShiftClassifier::new(10);
        assert!(classifier.is_complete(10));
        assert!(!classifier.is_complete(9));
        assert_eq!(classifier.threshold_secs(), 10);
    }

    #[test]
    fn test_roster_status() {
        let classifier = ShiftClassifier::default();

        assert_eq!(classifier.roster_status(None, None), RosterStatus::NoData);
        assert_eq!(
            classifier.roster_status(Some("2024-03-01 09:00:00"), None),
            RosterStatus::Active
        );
        assert_eq!(
            classifier.roster_status(Some("2024-03-01 09:00:00"), Some("2024-03-01 17:30:00")),
            RosterStatus::Completed
        );
        assert_eq!(
            classifier
                .roster_status(Some("2024-03-01 09:00:00"), Some("2024-03-01 12:15:00"))
                .to_string(),
            "3.25 hrs"
        );
        assert_eq!(
            classifier
                .roster_status(Some("not a time"), Some("2024-03-01 12:15:00"))
                .to_string(),
            "-"
        );
    }
}
