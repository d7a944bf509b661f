//! SQLite storage layer for La Mesa
//!
//! The ledger file is a shared on-disk resource. Nothing holds a connection
//! between operations: each call opens one, does its work, and drops it.

mod attendance;
mod migrations;
mod parse;
mod traits;
mod users;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::instrument;

use crate::error::{Error, Result};
use crate::models::{EmployeeOverview, Role, User};

pub use attendance::AttendanceStore;
pub use parse::{
    format_timestamp, parse_timestamp, truncate_to_secs, OptionalExt, TIMESTAMP_FORMAT,
};
pub use traits::{AttendanceRepository, UserRepository};
pub use users::UserStore;

/// Default time a connection waits on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the ledger database file
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Open or create database at the given path and bring its schema up to date
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(Error::StorageUnavailable)?;
        conn.busy_timeout(busy_timeout)
            .map_err(Error::StorageUnavailable)?;
        migrations::run_migrations(&conn)?;

        Ok(Self { path, busy_timeout })
    }

    /// Open a short-lived connection to an existing database.
    ///
    /// The file is never created here; a missing file is `StorageUnavailable`.
    pub fn connect(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Cannot open ledger");
            Error::StorageUnavailable(e)
        })?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(Error::StorageUnavailable)?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.connect()?;
        migrations::get_current_version(&conn)
    }
}

// Each call opens its own connection, same as the attendance store

impl UserRepository for Database {
    fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User> {
        let conn = self.connect()?;
        UserStore::new(&conn).create(username, password_hash, role)
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.connect()?;
        UserStore::new(&conn).find_by_username(username)
    }

    fn update_role(&self, username: &str, role: Role) -> Result<bool> {
        let conn = self.connect()?;
        UserStore::new(&conn).update_role(username, role)
    }

    fn delete_user(&self, username: &str) -> Result<bool> {
        let conn = self.connect()?;
        UserStore::new(&conn).delete(username)
    }

    fn list_overview(&self) -> Result<Vec<EmployeeOverview>> {
        let conn = self.connect()?;
        UserStore::new(&conn).list_overview()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("ledger.db"), DEFAULT_BUSY_TIMEOUT).unwrap();

        assert!(db.path().exists());
        assert_eq!(db.schema_version().unwrap(), 3);
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        Database::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        let db = Database::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        assert_eq!(db.schema_version().unwrap(), 3);
    }

    #[test]
    fn test_open_in_missing_directory_is_unavailable() {
        let dir = tempdir().unwrap();
        let result = Database::open(dir.path().join("nope").join("ledger.db"), DEFAULT_BUSY_TIMEOUT);
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }

    #[test]
    fn test_connect_after_file_removed_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let db = Database::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(db.connect(), Err(Error::StorageUnavailable(_))));
        // connect must not have recreated the file
        assert!(!path.exists());
    }
}
