//! Storage repository traits
//!
//! The surface other features use, independent of the SQLite stores behind it.

use crate::error::Result;
use crate::models::{EmployeeOverview, EndSession, LatestAttendance, LedgerRow, Role, User};

/// Attendance operations exposed to collaborators
pub trait AttendanceRepository {
    /// Open a new attendance record stamped now
    fn record_login(&self, username: &str) -> Result<crate::models::AttendanceRecord>;

    /// Close the user's most recent open record, if any
    fn record_logout(&self, username: &str) -> Result<EndSession>;

    /// Login/logout times of the user's most recent record
    fn fetch_latest(&self, username: &str) -> Result<Option<LatestAttendance>>;

    /// Up to `limit` records, newest first
    fn fetch_history(&self, username: &str, limit: u32) -> Result<Vec<LedgerRow>>;
}

/// Staff account operations
pub trait UserRepository {
    /// Create a new user
    fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User>;

    /// Find user by username
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Change a user's role; false when no such user
    fn update_role(&self, username: &str, role: Role) -> Result<bool>;

    /// Delete a user account; false when no such user
    fn delete_user(&self, username: &str) -> Result<bool>;

    /// Every user with their latest attendance timestamps
    fn list_overview(&self) -> Result<Vec<EmployeeOverview>>;
}
