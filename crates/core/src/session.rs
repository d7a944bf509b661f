//! Session registry
//!
//! Holds the identity of whoever is signed in to this process. It is an
//! ordinary value owned by the application state and handed to the features
//! that need it. Nothing is persisted: a new process starts anonymous.
//!
//! Consumers pull; there are no change notifications.

use std::sync::{PoisonError, RwLock};

use crate::models::{Identity, Role};
use crate::permissions::{Capability, PermissionMatrix};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    state: RwLock<SessionState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever session exists with this identity
    pub fn login(&self, username: impl Into<String>, role: Role) {
        let identity = Identity::new(username, role);
        tracing::info!(username = %identity.username, role = role.as_str(), "Session started");
        *self.state.write().unwrap_or_else(PoisonError::into_inner) =
            SessionState::Authenticated(identity);
    }

    /// Same as `login`, with the role given as text (case-insensitive)
    pub fn set_current_user(&self, username: impl Into<String>, role: &str) {
        self.login(username, Role::from_stored(role));
    }

    /// Back to anonymous
    pub fn logout(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let SessionState::Authenticated(identity) = &*state {
            tracing::info!(username = %identity.username, "Session cleared");
        }
        *state = SessionState::Anonymous;
    }

    pub fn clear(&self) {
        self.logout();
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_user(&self) -> Option<Identity> {
        match self.state() {
            SessionState::Authenticated(identity) => Some(identity),
            SessionState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            *self.state.read().unwrap_or_else(PoisonError::into_inner),
            SessionState::Authenticated(_)
        )
    }

    pub fn username(&self) -> Option<String> {
        self.current_user().map(|identity| identity.username)
    }

    /// `Role::None` when anonymous
    pub fn role(&self) -> Role {
        self.current_user()
            .map(|identity| identity.role)
            .unwrap_or(Role::None)
    }

    pub fn is_manager(&self) -> bool {
        self.role() == Role::Manager
    }

    pub fn is_employee(&self) -> bool {
        self.role() == Role::Employee
    }

    pub fn has_role(&self, capability: Capability) -> bool {
        self.is_authenticated() && PermissionMatrix::can_perform(self.role(), capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_anonymous() {
        let session = SessionRegistry::new();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(session.current_user().is_none());
        assert_eq!(session.role(), Role::None);
        assert!(!session.has_role(Capability::ViewMenu));
    }

    #[test]
    fn test_manager_session_then_clear() {
        let session = SessionRegistry::new();
        session.set_current_user("carol", "manager");

        assert!(session.is_manager());
        assert!(!session.is_employee());
        assert_eq!(session.username().as_deref(), Some("carol"));
        assert!(session.has_role(Capability::ManageEmployees));

        session.clear();
        assert!(session.current_user().is_none());
        assert!(!session.is_manager());
        assert!(!session.has_role(Capability::ManageEmployees));
    }

    #[test]
    fn test_role_text_is_case_insensitive() {
        let session = SessionRegistry::new();
        session.set_current_user("dan", "EmPlOyEe");
        assert!(session.is_employee());

        session.set_current_user("dan", "barista");
        assert_eq!(session.role(), Role::None);
        assert!(!session.is_employee());
    }

    #[test]
    fn test_login_replaces_existing_session() {
        let session = SessionRegistry::new();
        session.login("erin", Role::Employee);
        session.login("fay", Role::Manager);

        assert_eq!(
            session.current_user(),
            Some(Identity::new("fay", Role::Manager))
        );
    }

    #[test]
    fn test_employee_capabilities() {
        let session = SessionRegistry::new();
        session.login("gus", Role::Employee);
        assert!(session.has_role(Capability::ViewOwnAttendance));
        assert!(!session.has_role(Capability::EditSettings));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = SessionRegistry::new();
        let b = SessionRegistry::new();
        a.login("hal", Role::Manager);
        assert!(b.current_user().is_none());
    }
}
