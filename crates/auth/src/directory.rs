//! Identity directory: credential storage and verification.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use warden_core::{DomainError, DomainResult, Page, Pagination, UserId};

use crate::model::{StoredUser, UserRecord};
use crate::password;
use crate::store::RbacStore;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 8;

/// Input for [`IdentityDirectory::create_identity`].
#[derive(Clone, Deserialize)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
}

impl core::fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Clone, Default, Deserialize)]
pub struct IdentityChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    /// New plaintext password; re-hashed before storage.
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// Stores users with one-way password hashes and answers credential checks.
pub struct IdentityDirectory<S> {
    store: Arc<S>,
}

impl<S> Clone for IdentityDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: RbacStore> IdentityDirectory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a user. Username and email must both be unused.
    pub fn create_identity(&self, new: NewIdentity) -> DomainResult<UserRecord> {
        validate_username(&new.username)?;
        let email = normalize_email(&new.email)?;
        validate_password(&new.password)?;

        if self.store.find_user_by_username(&new.username)?.is_some() {
            return Err(DomainError::conflict("username already exists"));
        }
        if self.store.find_user_by_email(&email)?.is_some() {
            return Err(DomainError::conflict("email already exists"));
        }

        let password_hash =
            password::hash_password(&new.password).map_err(|e| DomainError::internal(e.to_string()))?;

        let now = Utc::now();
        let stored = self.store.insert_user(StoredUser {
            id: UserId::new(),
            username: new.username,
            email,
            password_hash,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        })?;

        info!(user_id = %stored.id, username = %stored.username, "identity created");
        Ok(stored.to_record())
    }

    /// Check a username/password pair.
    ///
    /// Unknown username, inactive account and wrong password all yield
    /// `Ok(None)`; callers cannot tell them apart.
    pub fn verify_credentials(
        &self,
        username: &str,
        plaintext: &str,
    ) -> DomainResult<Option<UserRecord>> {
        let Some(user) = self.store.find_user_by_username(username)? else {
            password::verify_against_dummy(plaintext);
            debug!("credential check failed");
            return Ok(None);
        };

        let matches = password::verify_password(plaintext, &user.password_hash);
        if !matches || !user.is_active {
            debug!("credential check failed");
            return Ok(None);
        }

        Ok(Some(user.to_record()))
    }

    /// Apply a partial update. A supplied password is re-hashed.
    pub fn update_identity(&self, id: UserId, changes: IdentityChanges) -> DomainResult<UserRecord> {
        let mut user = self
            .store
            .find_user(id)?
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))?;

        if let Some(username) = changes.username {
            validate_username(&username)?;
            if username != user.username && self.store.find_user_by_username(&username)?.is_some() {
                return Err(DomainError::conflict("username already exists"));
            }
            user.username = username;
        }
        if let Some(email) = changes.email {
            let email = normalize_email(&email)?;
            if email != user.email && self.store.find_user_by_email(&email)?.is_some() {
                return Err(DomainError::conflict("email already exists"));
            }
            user.email = email;
        }
        if let Some(plaintext) = changes.password {
            validate_password(&plaintext)?;
            user.password_hash = password::hash_password(&plaintext)
                .map_err(|e| DomainError::internal(e.to_string()))?;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();

        let stored = self.store.update_user(user)?;
        info!(user_id = %stored.id, "identity updated");
        Ok(stored.to_record())
    }

    pub fn get_identity(&self, id: UserId) -> DomainResult<Option<UserRecord>> {
        Ok(self.store.find_user(id)?.map(|u| u.to_record()))
    }

    pub fn find_by_username(&self, username: &str) -> DomainResult<Option<UserRecord>> {
        Ok(self
            .store
            .find_user_by_username(username)?
            .map(|u| u.to_record()))
    }

    pub fn find_by_email(&self, email: &str) -> DomainResult<Option<UserRecord>> {
        let email = email.trim().to_lowercase();
        Ok(self.store.find_user_by_email(&email)?.map(|u| u.to_record()))
    }

    /// Delete a user together with its role assignments.
    pub fn delete_identity(&self, id: UserId) -> DomainResult<()> {
        self.store.delete_user(id)?;
        info!(user_id = %id, "identity deleted");
        Ok(())
    }

    pub fn list_identities(&self, pagination: Pagination) -> DomainResult<Page<UserRecord>> {
        Ok(self.store.list_users(pagination)?.map(|u| u.to_record()))
    }
}

fn validate_username(username: &str) -> DomainResult<()> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(DomainError::validation(
            "username",
            format!("must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(DomainError::validation(
            "username",
            "may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("email", "invalid email format"));
    }
    Ok(email)
}

fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}
