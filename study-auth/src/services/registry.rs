//! Credential registry - identity records, role sets and the verified flag.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::{default_roles, Credential, NewCredential, Role, SubjectId};
use crate::services::credential_store::{CredentialStore, EMAIL_TAKEN, USERNAME_TAKEN};
use crate::services::AuthError;
use crate::utils::{hash_password, Password};

/// Input for [`CredentialRegistry::create`].
#[derive(Debug, Clone)]
pub struct CreateCredential {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub password: Password,
    /// Empty means the default role set.
    pub roles: BTreeSet<Role>,
}

/// Sign-in treats any identifier containing `@` as an email, so usernames can't hold one.
pub fn is_valid_username(username: &str) -> bool {
    !username.trim().is_empty() && !username.contains('@')
}

/// Emails are matched case-insensitively by storing them lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct CredentialRegistry {
    store: Arc<dyn CredentialStore>,
}

impl CredentialRegistry {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    #[tracing::instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create(&self, input: CreateCredential) -> Result<Credential, AuthError> {
        if !is_valid_username(&input.username) {
            return Err(AuthError::Validation(
                "Username must not be blank or contain '@'".to_string(),
            ));
        }

        let email = normalize_email(&input.email);

        let existing = self.store.find_by_username(&input.username).await?;
        if existing.is_some() {
            return Err(AuthError::Conflict(USERNAME_TAKEN.to_string()));
        }
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let roles = if input.roles.is_empty() {
            default_roles()
        } else {
            input.roles
        };

        // The store's unique constraints decide races between concurrent sign-ups.
        let credential = self
            .store
            .insert(NewCredential {
                first_name: input.first_name,
                last_name: input.last_name,
                username: input.username,
                email,
                password_hash: password_hash.into_string(),
                roles,
            })
            .await?;

        tracing::info!(subject_id = credential.id, "Credential created");
        Ok(credential)
    }

    pub async fn find_by_id(&self, id: SubjectId) -> Result<Credential, AuthError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Credential, AuthError> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Credential, AuthError> {
        self.store
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))
    }

    /// Replace the role set wholesale.
    #[tracing::instrument(skip(self))]
    pub async fn set_roles(
        &self,
        id: SubjectId,
        roles: BTreeSet<Role>,
    ) -> Result<Credential, AuthError> {
        if roles.is_empty() {
            return Err(AuthError::Validation(
                "A user must hold at least one role".to_string(),
            ));
        }

        if !self.store.set_roles(id, &roles).await? {
            return Err(AuthError::NotFound("User not found".to_string()));
        }

        tracing::info!(subject_id = id, roles = ?roles, "Roles replaced");
        self.find_by_id(id).await
    }

    /// One-way flip. A second call fails with `Conflict`.
    pub async fn mark_email_verified(&self, id: SubjectId) -> Result<Credential, AuthError> {
        if self.store.set_email_verified(id).await? {
            tracing::info!(subject_id = id, "Email verified");
            return self.find_by_id(id).await;
        }

        // Nothing flipped: either the record is gone or it was already verified.
        self.find_by_id(id).await?;
        Err(AuthError::Conflict("Email is already verified".to_string()))
    }

    pub async fn set_password(&self, id: SubjectId, password: &Password) -> Result<(), AuthError> {
        let hash = hash_password(password)?;
        if !self.store.set_password_hash(id, hash.as_str()).await? {
            return Err(AuthError::NotFound("User not found".to_string()));
        }
        tracing::info!(subject_id = id, "Password updated");
        Ok(())
    }

    pub async fn delete(&self, id: SubjectId) -> Result<(), AuthError> {
        if !self.store.delete(id).await? {
            return Err(AuthError::NotFound("User not found".to_string()));
        }
        tracing::info!(subject_id = id, "Credential deleted");
        Ok(())
    }
}
