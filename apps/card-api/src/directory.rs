//! The user-store collaborator behind the login endpoint.
//!
//! Persistence for users, cards, and decks lives outside this service; the
//! login flow only needs credential verification, so that is the whole
//! interface.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use cardlib_common::id::{prefix, prefixed_ulid};

use crate::auth::roles::Role;
use crate::error::ApiError;

/// A user record as the login endpoint sees it: the exact claims the chat
/// gateway will later trust.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub role: Role,
}

/// Abstraction over the user store, credential verification only.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Verify a username/password pair. `Ok(None)` means unknown user or
    /// wrong password; the caller must not distinguish the two.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation (local development / tests)
// ---------------------------------------------------------------------------

struct StoredUser {
    id: String,
    password_hash: String,
    role: Role,
}

pub struct MemoryDirectory {
    users: Mutex<HashMap<String, StoredUser>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Add a user with an Argon2id-hashed password. Returns the new user's ID.
    pub fn insert(&self, username: &str, password: &str, role: Role) -> Result<String, ApiError> {
        let password_hash = hash_password(password)?;
        let id = prefixed_ulid(prefix::USER);
        self.users.lock().unwrap().insert(
            username.to_string(),
            StoredUser {
                id: id.clone(),
                password_hash,
                role,
            },
        );
        Ok(id)
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, ApiError> {
        let users = self.users.lock().unwrap();
        let Some(stored) = users.get(username) else {
            return Ok(None);
        };

        if verify_password(password, &stored.password_hash).is_err() {
            return Ok(None);
        }

        Ok(Some(UserRecord {
            id: stored.id.clone(),
            name: username.to_string(),
            role: stored.role,
        }))
    }
}

/// Hash a password using Argon2id with a random salt.
fn hash_password(password: &str) -> Result<String, ApiError> {
    use argon2::Argon2;
    use password_hash::rand_core::OsRng;
    use password_hash::{PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| ApiError::internal("Password hashing failed"))
}

/// Verify a password against an Argon2id hash.
fn verify_password(password: &str, hash: &str) -> Result<(), ()> {
    use argon2::Argon2;
    use password_hash::{PasswordHash, PasswordVerifier};

    let parsed = PasswordHash::new(hash).map_err(|_| ())?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn authenticate_with_correct_password() {
        let directory = MemoryDirectory::new();
        let id = directory.insert("alice", "hunter2", Role::Moderator).unwrap();

        let record = directory
            .authenticate("alice", "hunter2")
            .await
            .unwrap()
            .expect("should authenticate");
        assert_eq!(record.id, id);
        assert_eq!(record.name, "alice");
        assert_eq!(record.role, Role::Moderator);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_both_yield_none() {
        let directory = MemoryDirectory::new();
        directory.insert("alice", "hunter2", Role::User).unwrap();

        assert!(directory
            .authenticate("alice", "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(directory
            .authenticate("bob", "hunter2")
            .await
            .unwrap()
            .is_none());
    }
}
