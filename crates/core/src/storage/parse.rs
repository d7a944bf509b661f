//! Database value parsing utilities
//!
//! Timestamps are stored as `YYYY-MM-DD HH:MM:SS` UTC text, the same shape
//! SQLite's `datetime('now')` produces.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use rusqlite::Error as SqlError;

/// Ledger timestamp format, second precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Drop sub-second precision so values survive a storage round-trip unchanged
pub fn truncate_to_secs(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

/// Parse a timestamp from a database text column
pub fn parse_timestamp_column(s: &str) -> Result<DateTime<Utc>, SqlError> {
    parse_timestamp(s).map_err(|e| {
        SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
