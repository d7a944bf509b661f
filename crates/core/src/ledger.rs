//! Attendance ledger service
//!
//! Owns the database handle, clock and classifier, and serializes
//! clock-in/clock-out per username. Different users never wait on each other.
//! Across processes, `BEGIN IMMEDIATE` in the store does the same job.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::models::{AttendanceRecord, EndSession, LatestAttendance, LedgerRow};
use crate::shift::ShiftClassifier;
use crate::storage::{AttendanceRepository, AttendanceStore, Database};

/// One mutex per username, created on first use and dropped once idle
#[derive(Debug, Default)]
struct UserLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    fn handle(&self, username: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(username.to_string()).or_default().clone()
    }

    /// Give back a handle from `handle`, removing the entry when no other
    /// caller holds or waits on it. Handles are only cloned under the map
    /// lock, so the count cannot change while it is checked.
    fn release(&self, username: &str, handle: Arc<Mutex<()>>) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // the map's copy plus ours
        if Arc::strong_count(&handle) == 2 {
            map.remove(username);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

pub struct Ledger {
    db: Database,
    clock: Arc<dyn Clock>,
    classifier: ShiftClassifier,
    history_limit: u32,
    locks: UserLocks,
}

impl Ledger {
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        classifier: ShiftClassifier,
        history_limit: u32,
    ) -> Self {
        Self {
            db,
            clock,
            classifier,
            history_limit,
            locks: UserLocks::default(),
        }
    }

    /// Open the ledger described by `config` under `data_dir`, on the wall clock
    pub fn open(config: &AppConfig, data_dir: &Path) -> Result<Self> {
        let db = Database::open(config.database_path(data_dir), config.busy_timeout())?;
        Ok(Self::new(
            db,
            Arc::new(SystemClock),
            config.classifier(),
            config.attendance.history_limit,
        ))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn classifier(&self) -> ShiftClassifier {
        self.classifier
    }

    pub fn history_limit(&self) -> u32 {
        self.history_limit
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn store(&self) -> AttendanceStore<'_> {
        AttendanceStore::new(&self.db, self.clock.as_ref(), self.classifier)
    }

    fn with_user_lock<T>(&self, username: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let handle = self.locks.handle(username);
        let result = {
            let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.locks.release(username, handle);
        result
    }

    /// Clock a user in
    #[instrument(skip(self))]
    pub fn begin_session(&self, username: &str) -> Result<AttendanceRecord> {
        if username.trim().is_empty() {
            return Err(Error::InvalidOperation(
                "cannot clock in without a username".to_string(),
            ));
        }
        self.with_user_lock(username, || self.store().begin_session(username))
    }

    /// Clock a user out
    #[instrument(skip(self))]
    pub fn end_session(&self, username: &str) -> Result<EndSession> {
        self.with_user_lock(username, || self.store().end_session(username))
    }

    pub fn latest(&self, username: &str) -> Result<Option<LedgerRow>> {
        self.store().latest(username)
    }

    /// The open record a live session timer counts from
    pub fn active_session(&self, username: &str) -> Result<Option<LedgerRow>> {
        self.store().latest_open(username)
    }

    /// History using the configured row limit
    pub fn recent_history(&self, username: &str) -> Result<Vec<LedgerRow>> {
        self.store().history(username, self.history_limit)
    }

    /// Login time of the user's first ever record
    pub fn member_since(&self, username: &str) -> Result<Option<DateTime<Utc>>> {
        match self.store().first(username)? {
            None => Ok(None),
            Some(LedgerRow::Record(record)) => Ok(Some(record.login_time)),
            Some(LedgerRow::Malformed(row)) => Err(Error::MalformedTimestamp {
                id: row.id,
                value: row.login_time,
            }),
        }
    }

    pub fn open_count(&self, username: &str) -> Result<u32> {
        self.store().count_open(username)
    }
}

impl AttendanceRepository for Ledger {
    fn record_login(&self, username: &str) -> Result<AttendanceRecord> {
        self.begin_session(username)
    }

    fn record_logout(&self, username: &str) -> Result<EndSession> {
        self.end_session(username)
    }

    fn fetch_latest(&self, username: &str) -> Result<Option<LatestAttendance>> {
        match self.latest(username)? {
            None => Ok(None),
            Some(LedgerRow::Record(record)) => Ok(Some(LatestAttendance {
                login_time: record.login_time,
                logout_time: record.logout_time,
            })),
            Some(LedgerRow::Malformed(row)) => Err(Error::MalformedTimestamp {
                id: row.id,
                value: row.login_time,
            }),
        }
    }

    fn fetch_history(&self, username: &str, limit: u32) -> Result<Vec<LedgerRow>> {
        self.store().history(username, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::DEFAULT_BUSY_TIMEOUT;
    use chrono::{Duration, TimeZone};
    use std::thread;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Arc<ManualClock>, Ledger) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("ledger.db"), DEFAULT_BUSY_TIMEOUT).unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let ledger = Ledger::new(db, clock.clone(), ShiftClassifier::new(8 * 3600), 20);
        (dir, clock, ledger)
    }

    #[test]
    fn test_record_login_then_fetch_latest() {
        let (_dir, _clock, ledger) = setup();

        let record = ledger.record_login("alice").unwrap();
        let latest = ledger.fetch_latest("alice").unwrap().unwrap();
        assert_eq!(latest.login_time, record.login_time);
        assert!(latest.logout_time.is_none());

        assert!(ledger.fetch_latest("nobody").unwrap().is_none());
    }

    #[test]
    fn test_record_logout_scenario() {
        let (_dir, clock, ledger) = setup();

        ledger.record_login("alice").unwrap();
        clock.advance(Duration::hours(8) + Duration::seconds(1));
        let outcome = ledger.record_logout("alice").unwrap();

        let record = outcome.closed().unwrap().record().unwrap();
        assert_eq!(record.worked_hours, Some(8.0));
        assert_eq!(record.shift_complete, Some(true));

        let latest = ledger.fetch_latest("alice").unwrap().unwrap();
        assert_eq!(latest.logout_time, Some(clock.now()));
    }

    #[test]
    fn test_fetch_history_limit() {
        let (_dir, clock, ledger) = setup();
        for _ in 0..25 {
            ledger.record_login("bea").unwrap();
            clock.advance(Duration::minutes(30));
            ledger.record_logout("bea").unwrap();
        }

        assert_eq!(ledger.recent_history("bea").unwrap().len(), 20);
        assert_eq!(ledger.fetch_history("bea", 5).unwrap().len(), 5);
    }

    #[test]
    fn test_member_since() {
        let (_dir, clock, ledger) = setup();
        assert!(ledger.member_since("cy").unwrap().is_none());

        let first = ledger.record_login("cy").unwrap();
        clock.advance(Duration::days(3));
        ledger.record_login("cy").unwrap();

        assert_eq!(ledger.member_since("cy").unwrap(), Some(first.login_time));
    }

    #[test]
    fn test_fetch_latest_malformed_is_typed_error() {
        let (_dir, _clock, ledger) = setup();
        ledger
            .database()
            .connect()
            .unwrap()
            .execute(
                "INSERT INTO attendance (username, login_time) VALUES ('dee', '??')",
                [],
            )
            .unwrap();

        assert!(matches!(
            ledger.fetch_latest("dee"),
            Err(Error::MalformedTimestamp { .. })
        ));
    }

    #[test]
    fn test_empty_username_rejected() {
        let (_dir, _clock, ledger) = setup();
        assert!(matches!(
            ledger.record_login("  "),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_concurrent_logout_closes_once() {
        let (_dir, clock, ledger) = setup();
        let ledger = Arc::new(ledger);

        ledger.record_login("eve").unwrap();
        clock.advance(Duration::hours(4));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || ledger.record_logout("eve").unwrap())
            })
            .collect();

        let outcomes: Vec<EndSession> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let closed = outcomes
            .iter()
            .filter(|o| matches!(o, EndSession::Closed(_)))
            .count();
        assert_eq!(closed, 1);
        assert_eq!(ledger.open_count("eve").unwrap(), 0);
        assert_eq!(ledger.locks.len(), 0);
    }

    #[test]
    fn test_concurrent_users_do_not_interfere() {
        let (_dir, _clock, ledger) = setup();
        let ledger = Arc::new(ledger);

        let handles: Vec<_> = ["amy", "ben", "cal", "dot"]
            .into_iter()
            .map(|name| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    ledger.record_login(name).unwrap();
                    ledger.record_logout(name).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(matches!(handle.join().unwrap(), EndSession::Closed(_)));
        }
        for name in ["amy", "ben", "cal", "dot"] {
            assert_eq!(ledger.open_count(name).unwrap(), 0);
        }
        assert_eq!(ledger.locks.len(), 0);
    }

    #[test]
    fn test_user_locks_are_dropped_when_idle() {
        let (_dir, clock, ledger) = setup();

        ledger.record_login("fay").unwrap();
        assert_eq!(ledger.locks.len(), 0);

        clock.advance(Duration::hours(1));
        ledger.record_logout("fay").unwrap();
        assert_eq!(ledger.locks.len(), 0);

        // a failed operation releases its lock too
        std::fs::remove_file(ledger.database().path()).unwrap();
        assert!(ledger.record_login("gil").is_err());
        assert_eq!(ledger.locks.len(), 0);
    }
}
