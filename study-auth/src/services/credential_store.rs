//! Storage boundary for credential records.
//!
//! Implementations must enforce username and email uniqueness atomically with
//! the insert, reporting a duplicate as [`AuthError::Conflict`]. The registry's
//! own existence check runs first but is not a guard on its own.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::models::{Credential, NewCredential, Role, SubjectId};
use crate::services::AuthError;

pub const USERNAME_TAKEN: &str = "Username is already taken";
pub const EMAIL_TAKEN: &str = "Email is already in use";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert(&self, credential: NewCredential) -> Result<Credential, AuthError>;
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Credential>, AuthError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AuthError>;
    /// Replace the role set. Returns false when the record doesn't exist.
    async fn set_roles(&self, id: SubjectId, roles: &BTreeSet<Role>) -> Result<bool, AuthError>;
    /// Flip the verified flag if it is currently unset. Returns whether it flipped.
    async fn set_email_verified(&self, id: SubjectId) -> Result<bool, AuthError>;
    async fn set_password_hash(&self, id: SubjectId, hash: &str) -> Result<bool, AuthError>;
    async fn delete(&self, id: SubjectId) -> Result<bool, AuthError>;
    async fn health_check(&self) -> Result<(), AuthError>;
}

#[derive(Default)]
struct MemoryState {
    next_id: SubjectId,
    records: BTreeMap<SubjectId, Credential>,
}

/// Mutex-guarded store; the uniqueness check and insert share one critical section.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    state: Mutex<MemoryState>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, AuthError> {
        self.state.lock().map_err(|e| {
            AuthError::Internal(anyhow::anyhow!("Credential store mutex poisoned: {}", e))
        })
    }

    fn update<F>(&self, id: SubjectId, f: F) -> Result<bool, AuthError>
    where
        F: FnOnce(&mut Credential) -> bool,
    {
        let mut state = self.lock()?;
        Ok(state.records.get_mut(&id).map(f).unwrap_or(false))
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert(&self, credential: NewCredential) -> Result<Credential, AuthError> {
        let mut state = self.lock()?;

        let records = &state.records;
        if records.values().any(|c| c.username == credential.username) {
            return Err(AuthError::Conflict(USERNAME_TAKEN.to_string()));
        }
        if records.values().any(|c| c.email == credential.email) {
            return Err(AuthError::Conflict(EMAIL_TAKEN.to_string()));
        }

        state.next_id += 1;
        let record = credential.into_credential(state.next_id, Utc::now());
        state.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Credential>, AuthError> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError> {
        Ok(self
            .lock()?
            .records
            .values()
            .find(|c| c.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AuthError> {
        Ok(self
            .lock()?
            .records
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn set_roles(&self, id: SubjectId, roles: &BTreeSet<Role>) -> Result<bool, AuthError> {
        self.update(id, |c| {
            c.roles = roles.clone();
            true
        })
    }

    async fn set_email_verified(&self, id: SubjectId) -> Result<bool, AuthError> {
        self.update(id, |c| !std::mem::replace(&mut c.email_verified, true))
    }

    async fn set_password_hash(&self, id: SubjectId, hash: &str) -> Result<bool, AuthError> {
        self.update(id, |c| {
            c.password_hash = hash.to_string();
            true
        })
    }

    async fn delete(&self, id: SubjectId) -> Result<bool, AuthError> {
        Ok(self.lock()?.records.remove(&id).is_some())
    }

    async fn health_check(&self) -> Result<(), AuthError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_roles;

    fn new_credential(username: &str, email: &str) -> NewCredential {
        NewCredential {
            first_name: None,
            last_name: None,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            roles: default_roles(),
        }
    }

    #[tokio::test]
    async fn assigns_increasing_ids() {
        let store = InMemoryCredentialStore::new();
        let a = store.insert(new_credential("a", "a@x.com")).await.unwrap();
        let b = store.insert(new_credential("b", "b@x.com")).await.unwrap();
        assert!(b.id > a.id);
        assert!(!a.email_verified);
    }

    #[tokio::test]
    async fn rejects_duplicates_on_insert() {
        let store = InMemoryCredentialStore::new();
        store.insert(new_credential("a", "a@x.com")).await.unwrap();

        let err = store
            .insert(new_credential("a", "other@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(ref m) if m == USERNAME_TAKEN));

        let err = store
            .insert(new_credential("other", "a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(ref m) if m == EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn verified_flag_flips_once() {
        let store = InMemoryCredentialStore::new();
        let a = store.insert(new_credential("a", "a@x.com")).await.unwrap();

        assert!(store.set_email_verified(a.id).await.unwrap());
        assert!(!store.set_email_verified(a.id).await.unwrap());
        assert!(!store.set_email_verified(999).await.unwrap());
    }
}
