//! PostgreSQL credential store.
//!
//! Uniqueness is enforced by the `credentials_username_key` and
//! `credentials_email_key` constraints; a violation surfaces as `Conflict`
//! even when two sign-ups pass the registry's pre-check concurrently.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use std::collections::BTreeSet;

use crate::models::{Credential, NewCredential, Role, SubjectId};
use crate::services::credential_store::{CredentialStore, EMAIL_TAKEN, USERNAME_TAKEN};
use crate::services::AuthError;

const SELECT_CREDENTIAL: &str = r#"
    SELECT c.id, c.first_name, c.last_name, c.username, c.email, c.password_hash,
           c.email_verified, c.created_utc,
           ARRAY(
               SELECT r.role_name FROM credential_roles r
               WHERE r.credential_id = c.id ORDER BY r.role_name
           ) AS roles
    FROM credentials c
"#;

#[derive(Debug, FromRow)]
struct CredentialRow {
    id: i64,
    first_name: Option<String>,
    last_name: Option<String>,
    username: String,
    email: String,
    password_hash: String,
    email_verified: bool,
    created_utc: DateTime<Utc>,
    roles: Vec<String>,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        let roles: BTreeSet<Role> = row
            .roles
            .iter()
            .filter_map(|name| {
                let role = Role::from_token(name);
                if role.is_none() {
                    tracing::warn!(
                        credential_id = row.id,
                        role = %name,
                        "Unknown role in role table"
                    );
                }
                role
            })
            .collect();

        Credential {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            email_verified: row.email_verified,
            roles,
            created_utc: row.created_utc,
        }
    }
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        clause: &str,
        bind: FindBy<'_>,
    ) -> Result<Option<Credential>, AuthError> {
        let sql = format!("{} WHERE {}", SELECT_CREDENTIAL, clause);
        let query = sqlx::query_as::<_, CredentialRow>(&sql);
        let query = match bind {
            FindBy::Id(id) => query.bind(id),
            FindBy::Text(value) => query.bind(value),
        };

        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.map(Credential::from))
    }
}

enum FindBy<'a> {
    Id(SubjectId),
    Text(&'a str),
}

fn map_insert_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("credentials_email_key") => AuthError::Conflict(EMAIL_TAKEN.to_string()),
                _ => AuthError::Conflict(USERNAME_TAKEN.to_string()),
            };
        }
    }
    AuthError::from(err)
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert(&self, credential: NewCredential) -> Result<Credential, AuthError> {
        let mut tx = self.pool.begin().await?;

        let (id, created_utc): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO credentials (first_name, last_name, username, email, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_utc
            "#,
        )
        .bind(&credential.first_name)
        .bind(&credential.last_name)
        .bind(&credential.username)
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        for role in &credential.roles {
            sqlx::query("INSERT INTO credential_roles (credential_id, role_name) VALUES ($1, $2)")
                .bind(id)
                .bind(role.as_authority())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(credential.into_credential(id, created_utc))
    }

    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Credential>, AuthError> {
        self.find_one("c.id = $1", FindBy::Id(id)).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError> {
        self.find_one("c.username = $1", FindBy::Text(username))
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AuthError> {
        self.find_one("c.email = $1", FindBy::Text(email)).await
    }

    async fn set_roles(&self, id: SubjectId, roles: &BTreeSet<Role>) -> Result<bool, AuthError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT id FROM credentials WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Ok(false);
        }

        sqlx::query("DELETE FROM credential_roles WHERE credential_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for role in roles {
            sqlx::query("INSERT INTO credential_roles (credential_id, role_name) VALUES ($1, $2)")
                .bind(id)
                .bind(role.as_authority())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn set_email_verified(&self, id: SubjectId) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE credentials SET email_verified = TRUE WHERE id = $1 AND email_verified = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_password_hash(&self, id: SubjectId, hash: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE credentials SET password_hash = $1 WHERE id = $2")
            .bind(hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: SubjectId) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM credentials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn health_check(&self) -> Result<(), AuthError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            AuthError::from(e)
        })?;
        Ok(())
    }
}
