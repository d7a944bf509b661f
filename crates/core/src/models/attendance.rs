//! Attendance ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// Shown wherever a duration or status cannot be derived
pub const PLACEHOLDER: &str = "-";

/// One clock-in/clock-out cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub username: String,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
    /// Hours worked, rounded to two decimals. Set at close.
    pub worked_hours: Option<f64>,
    pub shift_complete: Option<bool>,
}

impl AttendanceRecord {
    /// A freshly opened record
    pub fn open(id: i64, username: impl Into<String>, login_time: DateTime<Utc>) -> Self {
        Self {
            id,
            username: username.into(),
            login_time,
            logout_time: None,
            worked_hours: None,
            shift_complete: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.logout_time.is_none()
    }

    pub fn status(&self) -> ShiftStatus {
        if self.is_open() {
            return ShiftStatus::Active;
        }
        match self.shift_complete {
            Some(true) => ShiftStatus::Complete,
            Some(false) => ShiftStatus::Incomplete,
            None => ShiftStatus::Unknown,
        }
    }

    pub fn hours_display(&self) -> String {
        format_hours(self.worked_hours)
    }
}

/// A stored row whose timestamps could not be decoded.
///
/// Kept so history views can still list it with placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedRow {
    pub id: i64,
    pub username: String,
    pub login_time: String,
    pub logout_time: Option<String>,
}

/// A ledger row as read back from storage
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerRow {
    Record(AttendanceRecord),
    Malformed(MalformedRow),
}

impl LedgerRow {
    pub fn id(&self) -> i64 {
        match self {
            LedgerRow::Record(r) => r.id,
            LedgerRow::Malformed(m) => m.id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            LedgerRow::Record(r) => &r.username,
            LedgerRow::Malformed(m) => &m.username,
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            LedgerRow::Record(r) => r.is_open(),
            LedgerRow::Malformed(m) => m.logout_time.is_none(),
        }
    }

    pub fn record(&self) -> Option<&AttendanceRecord> {
        match self {
            LedgerRow::Record(r) => Some(r),
            LedgerRow::Malformed(_) => None,
        }
    }

    pub fn into_record(self) -> Option<AttendanceRecord> {
        match self {
            LedgerRow::Record(r) => Some(r),
            LedgerRow::Malformed(_) => None,
        }
    }

    pub fn status(&self) -> ShiftStatus {
        match self {
            LedgerRow::Record(r) => r.status(),
            LedgerRow::Malformed(m) if m.logout_time.is_none() => ShiftStatus::Active,
            LedgerRow::Malformed(_) => ShiftStatus::Unknown,
        }
    }

    pub fn hours_display(&self) -> String {
        match self {
            LedgerRow::Record(r) => r.hours_display(),
            LedgerRow::Malformed(_) => PLACEHOLDER.to_string(),
        }
    }
}

/// Outcome of closing a session
#[derive(Debug, Clone, PartialEq)]
pub enum EndSession {
    /// The most recent open record was closed
    Closed(LedgerRow),
    /// Nothing was open for this user; no row was touched
    NoActiveSession,
}

impl EndSession {
    pub fn closed(&self) -> Option<&LedgerRow> {
        match self {
            EndSession::Closed(row) => Some(row),
            EndSession::NoActiveSession => None,
        }
    }
}

/// Login/logout pair of a user's most recent record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestAttendance {
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
}

/// Per-record status shown in attendance history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftStatus {
    Active,
    Complete,
    Incomplete,
    Unknown,
}

impl std::fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShiftStatus::Active => write!(f, "Active"),
            ShiftStatus::Complete => write!(f, "Complete"),
            ShiftStatus::Incomplete => write!(f, "Incomplete"),
            ShiftStatus::Unknown => write!(f, "{}", PLACEHOLDER),
        }
    }
}

/// A staff member with the raw timestamps of their latest attendance row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeOverview {
    pub username: String,
    pub role: Role,
    pub last_login: Option<String>,
    pub last_logout: Option<String>,
}

/// Format worked hours for display, or the placeholder when unknown
pub fn format_hours(hours: Option<f64>) -> String {
    match hours {
        Some(h) => format!("{:.2} hrs", h),
        None => PLACEHOLDER.to_string(),
    }
}
