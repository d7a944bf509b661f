//! Application state management
//!
//! Wires authentication, the attendance ledger and the session registry into
//! the login and logout flows.

use std::path::{Path, PathBuf};

use lamesa_core::{
    AppConfig, AttendanceRecord, AttendanceRepository, Authenticator, Capability, Database,
    EndSession, Error, Identity, Ledger, PasswordAuthenticator, Result, Role, SessionRegistry,
    User,
};

/// Main application state
pub struct AppState {
    pub ledger: Ledger,
    pub session: SessionRegistry,
    auth: PasswordAuthenticator<Database>,
    data_dir: PathBuf,
}

/// What happened at login
#[derive(Debug)]
pub struct LoginReport {
    pub identity: Identity,
    /// Clock-in result; a failure here does not undo the login
    pub clock_in: Result<AttendanceRecord>,
}

impl AppState {
    pub fn new(config: &AppConfig, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let ledger = Ledger::open(config, data_dir)?;
        Ok(Self::with_ledger(ledger, data_dir))
    }

    /// Build around an existing ledger (tests inject one with a manual clock)
    pub fn with_ledger(ledger: Ledger, data_dir: &Path) -> Self {
        let auth = PasswordAuthenticator::new(ledger.database().clone());
        Self {
            ledger,
            session: SessionRegistry::new(),
            auth,
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn authenticator(&self) -> &PasswordAuthenticator<Database> {
        &self.auth
    }

    pub fn register(&self, username: &str, password: &str, role: Role) -> Result<User> {
        self.auth.register(username, password, role)
    }

    /// Authenticate, start the session, and clock in.
    ///
    /// Only valid while anonymous; the current user must log out first so
    /// their open record gets closed.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginReport> {
        if let Some(current) = self.session.current_user() {
            return Err(Error::InvalidOperation(format!(
                "already signed in as {}",
                current.username
            )));
        }

        let identity = self.auth.authenticate(username, password)?;

        self.session.login(identity.username.clone(), identity.role);

        let clock_in = self.ledger.record_login(&identity.username);
        if let Err(e) = &clock_in {
            tracing::error!(username = %identity.username, error = %e, "Clock-in failed");
        }

        Ok(LoginReport { identity, clock_in })
    }

    /// Clock out and clear the session.
    ///
    /// The session is cleared even when the ledger cannot be written.
    pub fn logout(&self) -> Result<Option<EndSession>> {
        let Some(username) = self.session.username() else {
            return Ok(None);
        };

        let outcome = self.ledger.record_logout(&username);
        self.session.logout();

        match outcome {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                tracing::error!(%username, error = %e, "Clock-out failed");
                Err(e)
            }
        }
    }

    /// Error unless the current session has `capability`
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.session.has_role(capability) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!("{:?}", capability)))
        }
    }

    /// Username of the signed-in user, or an error when anonymous
    pub fn current_username(&self) -> Result<String> {
        self.session
            .username()
            .ok_or_else(|| Error::PermissionDenied("not signed in".to_string()))
    }
}
