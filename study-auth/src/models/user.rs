//! Credential model - user identity, password hash, roles and verification flag.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use utoipa::ToSchema;

use super::Role;

/// Opaque numeric subject identifier.
pub type SubjectId = i64;

/// Stored credential record.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: SubjectId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub roles: BTreeSet<Role>,
    pub created_utc: DateTime<Utc>,
}

impl Credential {
    /// Convert to sanitized response (no password hash).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self)
    }

    pub fn role_list(&self) -> Vec<Role> {
        self.roles.iter().copied().collect()
    }
}

/// Fields for a credential that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
}

impl NewCredential {
    /// Materialize as a stored record with the id assigned by the store.
    pub fn into_credential(self, id: SubjectId, created_utc: DateTime<Utc>) -> Credential {
        Credential {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            email_verified: false,
            roles: self.roles,
            created_utc,
        }
    }
}

/// Identity returned to callers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: SubjectId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub email_verified: bool,
    pub roles: Vec<Role>,
    pub created_utc: DateTime<Utc>,
}

impl From<&Credential> for UserResponse {
    fn from(c: &Credential) -> Self {
        Self {
            id: c.id,
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            username: c.username.clone(),
            email: c.email.clone(),
            email_verified: c.email_verified,
            roles: c.role_list(),
            created_utc: c.created_utc,
        }
    }
}
