//! User storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{format_timestamp, parse_timestamp_column, truncate_to_secs, OptionalExt};
use crate::error::Result;
use crate::models::{EmployeeOverview, Role, User};

pub struct UserStore<'a> {
    conn: &'a Connection,
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: Role::from_stored(&row.get::<_, String>(3)?),
        created_at: parse_timestamp_column(&row.get::<_, String>(4)?)?,
    })
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new user
    #[instrument(skip(self, password_hash))]
    pub fn create(&self, username: &str, password_hash: &str, role: Role) -> Result<User> {
        let created_at = truncate_to_secs(Utc::now());
        self.conn.execute(
            "INSERT INTO users (username, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![username, password_hash, role.as_str(), format_timestamp(&created_at)],
        )?;

        Ok(User {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at,
        })
    }

    /// Find user by username
    #[instrument(skip(self))]
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, password_hash, role, created_at FROM users WHERE username = ?1",
        )?;

        let user = stmt
            .query_row(params![username], user_from_row)
            .optional()?;

        Ok(user)
    }

    /// Update the role for a given username
    #[instrument(skip(self))]
    pub fn update_role(&self, username: &str, role: Role) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE users SET role = ?1 WHERE username = ?2",
            params![role.as_str(), username],
        )?;
        Ok(updated > 0)
    }

    /// Delete a user. Their attendance history is kept.
    #[instrument(skip(self))]
    pub fn delete(&self, username: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM users WHERE username = ?1", params![username])?;
        Ok(deleted > 0)
    }

    /// All users with the raw timestamps of their most recent attendance row
    pub fn list_overview(&self) -> Result<Vec<EmployeeOverview>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.username, u.role, a.login_time, a.logout_time
             FROM users u
             LEFT JOIN attendance a
                ON a.id = (SELECT MAX(id) FROM attendance WHERE username = u.username)
             ORDER BY u.username COLLATE NOCASE ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(EmployeeOverview {
                    username: row.get(0)?,
                    role: Role::from_stored(&row.get::<_, String>(1)?),
                    last_login: row.get(2)?,
                    last_logout: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
