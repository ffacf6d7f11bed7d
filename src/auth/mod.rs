//! Account management: registration, login, and the current-session pointer.
//!
//! Records live behind the [`KeyValueStore`] boundary under a single `users`
//! key plus a `current_user` pointer. Passwords are stored in plaintext and
//! compared directly: a faithful port of the demo flow this replaces, not a
//! hardened credential system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use tracing::debug;

use crate::storage::{get_json, set_json, KeyValueStore, StorageError};
use crate::utils::id::unique_id;

pub mod otp;

pub const USERS_KEY: &str = "users";
pub const CURRENT_USER_KEY: &str = "current_user";

/// A registered account. Immutable once created; the store never rewrites
/// an existing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub is_authenticated: bool,
    pub registration_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialRecord {
    #[serde(flatten)]
    user: User,
    password: String,
}

#[derive(Debug)]
pub enum AuthError {
    /// Registration hit an email or mobile that already has an account.
    DuplicateUser { identifier: String },

    /// No account matched the identifier, or the password was wrong.
    InvalidCredentials,

    Storage(StorageError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::DuplicateUser { identifier } => {
                write!(f, "An account already exists for '{}'", identifier)
            }
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::Storage(err) => write!(f, "{}", err),
        }
    }
}

impl StdError for AuthError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AuthError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage(err)
    }
}

pub struct CredentialStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create an account. Fails with [`AuthError::DuplicateUser`] when the
    /// email or mobile already belongs to a record; both identifiers map to
    /// the same account.
    pub fn register(
        &self,
        full_name: &str,
        email: &str,
        mobile: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let mut records = self.records();

        if let Some(existing) = records.iter().find(|r| {
            r.user.email.eq_ignore_ascii_case(email) || r.user.mobile == mobile
        }) {
            let identifier = if existing.user.email.eq_ignore_ascii_case(email) {
                email
            } else {
                mobile
            };
            return Err(AuthError::DuplicateUser {
                identifier: identifier.to_string(),
            });
        }

        let user = User {
            id: unique_id("user"),
            full_name: full_name.to_string(),
            email: email.to_string(),
            mobile: mobile.to_string(),
            is_authenticated: true,
            registration_date: Utc::now(),
        };
        records.push(CredentialRecord {
            user: user.clone(),
            password: password.to_string(),
        });
        set_json(&self.store, USERS_KEY, &records)?;
        debug!(user_id = %user.id, "registered account");
        Ok(user)
    }

    /// Look an account up by email or mobile and check the password.
    pub fn login(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let records = self.records();
        let record = records
            .iter()
            .find(|r| {
                r.user.email.eq_ignore_ascii_case(identifier) || r.user.mobile == identifier
            })
            .ok_or(AuthError::InvalidCredentials)?;

        if record.password != password {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(record.user.clone())
    }

    /// Clear the current-session pointer. Registered accounts remain.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.remove(CURRENT_USER_KEY)?;
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        get_json(&self.store, CURRENT_USER_KEY)
    }

    pub fn set_current(&self, user: &User) -> Result<(), AuthError> {
        set_json(&self.store, CURRENT_USER_KEY, user)?;
        Ok(())
    }

    fn records(&self) -> Vec<CredentialRecord> {
        get_json(&self.store, USERS_KEY).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> CredentialStore<MemoryStore> {
        CredentialStore::new(MemoryStore::new())
    }

    #[test]
    fn login_works_with_either_identifier() {
        let accounts = store();
        let registered = accounts
            .register("Asha Rao", "asha@example.com", "9876543210", "s3cret")
            .expect("register");

        let by_mobile = accounts.login("9876543210", "s3cret").expect("mobile login");
        let by_email = accounts
            .login("asha@example.com", "s3cret")
            .expect("email login");

        assert_eq!(by_mobile.id, registered.id);
        assert_eq!(by_email.id, registered.id);
    }

    #[test]
    fn duplicate_email_or_mobile_is_rejected() {
        let accounts = store();
        accounts
            .register("Asha Rao", "asha@example.com", "9876543210", "s3cret")
            .expect("register");

        let by_email =
            accounts.register("Other", "ASHA@example.com", "1112223334", "pw");
        assert!(matches!(by_email, Err(AuthError::DuplicateUser { .. })));

        let by_mobile = accounts.register("Other", "other@example.com", "9876543210", "pw");
        assert!(matches!(by_mobile, Err(AuthError::DuplicateUser { .. })));
    }

    #[test]
    fn wrong_password_and_unknown_identifier_fail_alike() {
        let accounts = store();
        accounts
            .register("Asha Rao", "asha@example.com", "9876543210", "s3cret")
            .expect("register");

        assert!(matches!(
            accounts.login("asha@example.com", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login("nobody@example.com", "s3cret"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn logout_clears_only_the_session_pointer() {
        let accounts = store();
        let user = accounts
            .register("Asha Rao", "asha@example.com", "9876543210", "s3cret")
            .expect("register");
        accounts.set_current(&user).expect("set current");
        assert_eq!(accounts.current_user().map(|u| u.id), Some(user.id.clone()));

        accounts.logout().expect("logout");
        assert!(accounts.current_user().is_none());

        // The record survives; logging in again still works.
        let again = accounts.login("asha@example.com", "s3cret").expect("login");
        assert_eq!(again.id, user.id);
    }

    #[test]
    fn corrupted_user_list_reads_as_empty() {
        let raw = MemoryStore::new();
        raw.set(USERS_KEY, "{definitely not json").expect("seed");
        let accounts = CredentialStore::new(raw);

        assert!(matches!(
            accounts.login("asha@example.com", "s3cret"),
            Err(AuthError::InvalidCredentials)
        ));
        // Registration starts a fresh list rather than failing.
        accounts
            .register("Asha Rao", "asha@example.com", "9876543210", "s3cret")
            .expect("register after corruption");
    }
}
