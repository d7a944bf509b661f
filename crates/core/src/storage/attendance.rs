//! Attendance ledger storage
//!
//! Writes run in one `BEGIN IMMEDIATE` transaction on their own connection.
//! The transaction commits explicitly; every other exit path, including `?`,
//! drops it and rolls back.
//!
//! Closing a session is two statements because SQLite cannot ORDER BY/LIMIT
//! inside an UPDATE: find the newest open id, then update that id.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use tracing::{info, instrument, warn};

use super::parse::{format_timestamp, parse_timestamp, truncate_to_secs, OptionalExt};
use super::Database;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{AttendanceRecord, EndSession, LedgerRow, MalformedRow};
use crate::shift::ShiftClassifier;

const RECORD_COLUMNS: &str = "id, username, login_time, logout_time, worked_hours, full_shift";

/// A row exactly as stored, before timestamps are decoded
struct RawRow {
    id: i64,
    username: String,
    login_time: String,
    logout_time: Option<String>,
    worked_hours: Option<f64>,
    full_shift: Option<bool>,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            login_time: row.get(2)?,
            logout_time: row.get(3)?,
            worked_hours: row.get(4)?,
            full_shift: row.get(5)?,
        })
    }

    fn decode(self) -> LedgerRow {
        let login = parse_timestamp(&self.login_time);
        let logout = self.logout_time.as_deref().map(parse_timestamp).transpose();

        match (login, logout) {
            (Ok(login_time), Ok(logout_time)) => LedgerRow::Record(AttendanceRecord {
                id: self.id,
                username: self.username,
                login_time,
                logout_time,
                worked_hours: self.worked_hours,
                shift_complete: self.full_shift,
            }),
            (Err(e), _) | (_, Err(e)) => {
                warn!(id = self.id, error = %e, "Attendance row has a malformed timestamp");
                LedgerRow::Malformed(MalformedRow {
                    id: self.id,
                    username: self.username,
                    login_time: self.login_time,
                    logout_time: self.logout_time,
                })
            }
        }
    }
}

/// Attendance ledger operations
pub struct AttendanceStore<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    classifier: ShiftClassifier,
}

impl<'a> AttendanceStore<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock, classifier: ShiftClassifier) -> Self {
        Self {
            db,
            clock,
            classifier,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        truncate_to_secs(self.clock.now())
    }

    /// Insert a new open record stamped now.
    ///
    /// Never checks for an existing open record; a second call leaves two open.
    #[instrument(skip(self))]
    pub fn begin_session(&self, username: &str) -> Result<AttendanceRecord> {
        const OP: &str = "begin_session";

        let mut conn = self.db.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::transaction(OP, e))?;
        // stamped once the write lock is held, not before waiting on it
        let login_time = self.now();

        let inserted = tx
            .execute(
                "INSERT INTO attendance (username, login_time) VALUES (?1, ?2)",
                params![username, format_timestamp(&login_time)],
            )
            .map_err(|e| Error::transaction(OP, e))?;
        if inserted != 1 {
            return Err(Error::transaction(
                OP,
                rusqlite::Error::StatementChangedRows(inserted),
            ));
        }
        let id = tx.last_insert_rowid();

        tx.commit().map_err(|e| Error::transaction(OP, e))?;

        info!(id, login_time = %format_timestamp(&login_time), "Clock-in recorded");
        Ok(AttendanceRecord::open(id, username, login_time))
    }

    /// Close the user's most recent open record.
    ///
    /// Returns `NoActiveSession` without touching any row when none is open.
    /// A record whose login time cannot be parsed is still closed, with
    /// unknown duration and classification.
    #[instrument(skip(self))]
    pub fn end_session(&self, username: &str) -> Result<EndSession> {
        const OP: &str = "end_session";

        let mut conn = self.db.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::transaction(OP, e))?;
        let logout_time = self.now();

        let open = tx
            .query_row(
                "SELECT id, login_time FROM attendance
                 WHERE username = ?1 AND logout_time IS NULL
                 ORDER BY id DESC LIMIT 1",
                params![username],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| Error::transaction(OP, e))?;

        let Some((id, raw_login)) = open else {
            warn!(username, "No active session to close");
            return Ok(EndSession::NoActiveSession);
        };

        let (login_time, worked_hours, shift_complete) = match parse_timestamp(&raw_login) {
            Ok(login) => {
                let summary = self.classifier.classify(login, logout_time);
                (Some(login), Some(summary.worked_hours), Some(summary.complete))
            }
            Err(e) => {
                let err = Error::MalformedTimestamp {
                    id,
                    value: raw_login.clone(),
                };
                warn!(error = %err, cause = %e, "Closing record without a duration");
                (None, None, None)
            }
        };

        let updated = tx
            .execute(
                "UPDATE attendance SET logout_time = ?1, worked_hours = ?2, full_shift = ?3
                 WHERE id = ?4",
                params![
                    format_timestamp(&logout_time),
                    worked_hours,
                    shift_complete,
                    id
                ],
            )
            .map_err(|e| Error::transaction(OP, e))?;
        if updated != 1 {
            return Err(Error::transaction(
                OP,
                rusqlite::Error::StatementChangedRows(updated),
            ));
        }

        tx.commit().map_err(|e| Error::transaction(OP, e))?;

        info!(id, ?worked_hours, ?shift_complete, "Clock-out recorded");

        let row = match login_time {
            Some(login_time) => LedgerRow::Record(AttendanceRecord {
                id,
                username: username.to_string(),
                login_time,
                logout_time: Some(logout_time),
                worked_hours,
                shift_complete,
            }),
            None => LedgerRow::Malformed(MalformedRow {
                id,
                username: username.to_string(),
                login_time: raw_login,
                logout_time: Some(format_timestamp(&logout_time)),
            }),
        };
        Ok(EndSession::Closed(row))
    }

    fn query_one(conn: &Connection, sql: &str, username: &str) -> Result<Option<LedgerRow>> {
        let raw = conn
            .query_row(sql, params![username], RawRow::from_row)
            .optional()?;
        Ok(raw.map(RawRow::decode))
    }

    /// Most recent record for a user, open or closed
    #[instrument(skip(self))]
    pub fn latest(&self, username: &str) -> Result<Option<LedgerRow>> {
        let conn = self.db.connect()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE username = ?1 ORDER BY id DESC LIMIT 1"
        );
        Self::query_one(&conn, &sql, username)
    }

    /// Most recent open record for a user
    #[instrument(skip(self))]
    pub fn latest_open(&self, username: &str) -> Result<Option<LedgerRow>> {
        let conn = self.db.connect()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance
             WHERE username = ?1 AND logout_time IS NULL ORDER BY id DESC LIMIT 1"
        );
        Self::query_one(&conn, &sql, username)
    }

    /// Oldest record for a user, used as "member since"
    #[instrument(skip(self))]
    pub fn first(&self, username: &str) -> Result<Option<LedgerRow>> {
        let conn = self.db.connect()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE username = ?1 ORDER BY id ASC LIMIT 1"
        );
        Self::query_one(&conn, &sql, username)
    }

    /// Up to `limit` records for a user, newest first
    #[instrument(skip(self))]
    pub fn history(&self, username: &str, limit: u32) -> Result<Vec<LedgerRow>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE username = ?1 ORDER BY id DESC LIMIT ?2"
        ))?;

        let rows = stmt
            .query_map(params![username, limit], RawRow::from_row)?
            .map(|raw| raw.map(RawRow::decode))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Number of open records for a user. More than one means the
    /// one-open-record invariant has been broken by repeated clock-ins.
    pub fn count_open(&self, username: &str) -> Result<u32> {
        let conn = self.db.connect()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(1) FROM attendance WHERE username = ?1 AND logout_time IS NULL",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
