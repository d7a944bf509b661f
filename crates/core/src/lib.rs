//! La Mesa Core Library
//!
//! Attendance ledger, shift classification, session registry and staff
//! accounts for the La Mesa restaurant desk.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod permissions;
pub mod session;
pub mod shift;
pub mod storage;

pub use auth::{Authenticator, PasswordAuthenticator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use models::*;
pub use permissions::*;
pub use session::{SessionRegistry, SessionState};
pub use shift::{RosterStatus, ShiftClassifier, ShiftSummary};
pub use storage::{AttendanceRepository, Database, UserRepository};
