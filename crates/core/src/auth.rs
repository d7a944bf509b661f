//! Credential checking and account registration

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::instrument;

use crate::error::{Error, Result};
use crate::models::{Identity, Role, User};
use crate::storage::UserRepository;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Validates credentials and says who the caller is
pub trait Authenticator {
    fn authenticate(&self, username: &str, password: &str) -> Result<Identity>;
}

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Authentication(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> Result<()> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|_| Error::Authentication("Invalid stored password".to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| Error::Authentication("Invalid password".to_string()))
}

/// Argon2 password authentication against the user table
pub struct PasswordAuthenticator<R> {
    users: R,
}

impl<R: UserRepository> PasswordAuthenticator<R> {
    pub fn new(users: R) -> Self {
        Self { users }
    }

    pub fn users(&self) -> &R {
        &self.users
    }

    /// Create an account with the chosen role
    #[instrument(skip(self, password))]
    pub fn register(&self, username: &str, password: &str, role: Role) -> Result<User> {
        let username = username.trim();
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(Error::InvalidOperation(format!(
                "Username must be at least {} characters",
                MIN_USERNAME_LEN
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::InvalidOperation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.users.find_user_by_username(username)?.is_some() {
            return Err(Error::InvalidOperation(
                "Username already exists".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;
        let user = self.users.create_user(username, &password_hash, role)?;
        tracing::info!(user_id = user.id, role = role.as_str(), "Registered user");
        Ok(user)
    }
}

impl<R: UserRepository> Authenticator for PasswordAuthenticator<R> {
    #[instrument(skip(self, password))]
    fn authenticate(&self, username: &str, password: &str) -> Result<Identity> {
        let user = self
            .users
            .find_user_by_username(username.trim())?
            .ok_or_else(|| Error::Authentication("User not found".to_string()))?;

        verify_password(password, &user.password_hash)?;
        Ok(user.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Database, DEFAULT_BUSY_TIMEOUT};
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, PasswordAuthenticator<Database>) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db"), DEFAULT_BUSY_TIMEOUT).unwrap();
        (dir, PasswordAuthenticator::new(db))
    }

    #[test]
    fn test_register_then_authenticate() {
        let (_dir, auth) = setup();
        auth.register("carol", "s3cret!", Role::Manager).unwrap();

        let identity = auth.authenticate("carol", "s3cret!").unwrap();
        assert_eq!(identity, Identity::new("carol", Role::Manager));
    }

    #[test]
    fn test_wrong_password_and_unknown_user() {
        let (_dir, auth) = setup();
        auth.register("dave", "hunter22", Role::Employee).unwrap();

        assert!(matches!(
            auth.authenticate("dave", "hunter23"),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            auth.authenticate("nobody", "hunter22"),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_register_validation() {
        let (_dir, auth) = setup();
        assert!(auth.register("ab", "longenough", Role::Employee).is_err());
        assert!(auth.register("abc", "short", Role::Employee).is_err());

        auth.register("abc", "longenough", Role::Employee).unwrap();
        let dup = auth.register("abc", "different", Role::Manager);
        assert!(matches!(dup, Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_stored_hash_is_not_plaintext() {
        let (_dir, auth) = setup();
        let user = auth.register("erin", "plaintext", Role::Employee).unwrap();
        assert_ne!(user.password_hash, "plaintext");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn test_corrupt_stored_hash() {
        let (_dir, auth) = setup();
        auth.users()
            .create_user("fred", "not-a-phc-string", Role::Employee)
            .unwrap();
        assert!(matches!(
            auth.authenticate("fred", "whatever"),
            Err(Error::Authentication(_))
        ));
    }
}
