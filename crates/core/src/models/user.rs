//! User and role models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Staff role, stored as lowercase text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Employee,
    /// Registered but no role chosen yet, or unrecognized role text
    #[default]
    None,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Employee => "employee",
            Role::None => "none",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::Employee => "Employee",
            Role::None => "No role",
        }
    }

    /// Lenient parse for stored or externally supplied role text.
    ///
    /// Matching is case-insensitive; anything unrecognized is `Role::None`.
    pub fn from_stored(value: &str) -> Role {
        value.parse().unwrap_or(Role::None)
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("manager") {
            Ok(Role::Manager)
        } else if s.eq_ignore_ascii_case("employee") {
            Ok(Role::Employee)
        } else if s.eq_ignore_ascii_case("none") {
            Ok(Role::None)
        } else {
            Err(Error::InvalidOperation(format!("unknown role '{}'", s)))
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A local staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity::new(self.username.clone(), self.role)
    }
}

/// An authenticated (username, role) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_case_insensitive() {
        assert_eq!("Manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("EMPLOYEE".parse::<Role>().unwrap(), Role::Employee);
        assert_eq!(" none ".parse::<Role>().unwrap(), Role::None);
        assert!("chef".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_from_stored_is_lenient() {
        assert_eq!(Role::from_stored("mAnAgEr"), Role::Manager);
        assert_eq!(Role::from_stored(""), Role::None);
        assert_eq!(Role::from_stored("owner"), Role::None);
    }

    #[test]
    fn test_role_round_trips_through_text() {
        for role in [Role::Manager, Role::Employee, Role::None] {
            assert_eq!(Role::from_stored(role.as_str()), role);
        }
    }
}
