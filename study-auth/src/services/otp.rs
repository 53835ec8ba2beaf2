//! One-time code issuance and the email verification flow.
//!
//! Codes are generated from the OS random source, stored as a SHA-256 digest
//! under `otp:{purpose}:{subject_id}` and compared in constant time. Storing a
//! new code for the same subject and purpose overwrites the previous one.

use chrono::Duration;
use rand::{rngs::OsRng, Rng};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::OtpConfig;
use crate::models::{Credential, OtpPurpose, SubjectId};
use crate::services::email::Mailer;
use crate::services::otp_store::OtpStore;
use crate::services::registry::CredentialRegistry;
use crate::services::AuthError;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub fn generate_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

fn digest(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Issue and consume codes for any purpose.
#[derive(Clone)]
pub struct OneTimeCodes {
    store: Arc<dyn OtpStore>,
    code_length: usize,
}

impl OneTimeCodes {
    pub fn new(store: Arc<dyn OtpStore>, code_length: usize) -> Self {
        Self { store, code_length }
    }

    /// Generate a fresh code and make it the only live one for this subject and purpose.
    pub async fn issue(
        &self,
        purpose: OtpPurpose,
        subject_id: SubjectId,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let code = generate_code(self.code_length);
        self.store
            .put(&purpose.store_key(subject_id), &digest(&code), ttl)
            .await?;
        Ok(code)
    }

    /// Check `code` against the live entry and delete it on a match.
    ///
    /// The read and the delete are separate store calls, so two concurrent
    /// validations of the same code can both succeed.
    pub async fn consume(
        &self,
        purpose: OtpPurpose,
        subject_id: SubjectId,
        code: &str,
    ) -> Result<(), AuthError> {
        let key = purpose.store_key(subject_id);

        let stored = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| AuthError::Invalid("Invalid or expired code".to_string()))?;

        let candidate = digest(code);
        if !bool::from(candidate.as_bytes().ct_eq(stored.as_bytes())) {
            tracing::debug!(subject_id, purpose = purpose.as_str(), "Code mismatch");
            return Err(AuthError::Invalid("Invalid or expired code".to_string()));
        }

        self.store.delete(&key).await?;
        Ok(())
    }
}

/// UNVERIFIED -> CODE_SENT -> VERIFIED, with resend returning to CODE_SENT.
#[derive(Clone)]
pub struct OtpVerificationFlow {
    codes: OneTimeCodes,
    registry: CredentialRegistry,
    mailer: Arc<dyn Mailer>,
    code_ttl: Duration,
}

impl OtpVerificationFlow {
    pub fn new(
        codes: OneTimeCodes,
        registry: CredentialRegistry,
        mailer: Arc<dyn Mailer>,
        config: &OtpConfig,
    ) -> Self {
        Self {
            codes,
            registry,
            mailer,
            code_ttl: Duration::seconds(config.code_lifetime_seconds),
        }
    }

    /// Store a new code and dispatch it without waiting for delivery.
    #[tracing::instrument(skip(self, email))]
    pub async fn send_code(&self, subject_id: SubjectId, email: &str) -> Result<(), AuthError> {
        let code = self
            .codes
            .issue(OtpPurpose::EmailVerification, subject_id, self.code_ttl)
            .await?;

        let mailer = self.mailer.clone();
        let email = email.to_string();
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_verification_code(&email, subject_id, &code)
                .await
            {
                tracing::error!(subject_id, error = %e, "Failed to deliver verification code");
            }
        });

        crate::services::metrics::record_otp_sent(OtpPurpose::EmailVerification);
        tracing::info!(subject_id, "Verification code issued");
        Ok(())
    }

    pub async fn resend(&self, email: &str) -> Result<(), AuthError> {
        let no_account = || AuthError::NotFound("No unverified account for this email".to_string());

        let credential = match self.registry.find_by_email(email).await {
            Ok(c) if !c.email_verified => c,
            Ok(_) | Err(AuthError::NotFound(_)) => return Err(no_account()),
            Err(e) => return Err(e),
        };

        self.send_code(credential.id, &credential.email).await
    }

    #[tracing::instrument(skip(self, code))]
    pub async fn verify(&self, subject_id: SubjectId, code: &str) -> Result<Credential, AuthError> {
        let outcome = self
            .codes
            .consume(OtpPurpose::EmailVerification, subject_id, code)
            .await;
        crate::services::metrics::record_otp_verification(outcome.is_ok());
        outcome?;

        match self.registry.mark_email_verified(subject_id).await {
            Err(AuthError::NotFound(_)) => {
                Err(AuthError::Conflict("Account no longer exists".to_string()))
            }
            other => other,
        }
    }
}
