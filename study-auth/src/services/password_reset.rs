//! Password reset over one-time codes with the longer confirmation lifetime.

use chrono::Duration;
use std::sync::Arc;

use crate::config::OtpConfig;
use crate::models::{OtpPurpose, SubjectId};
use crate::services::email::Mailer;
use crate::services::otp::OneTimeCodes;
use crate::services::registry::CredentialRegistry;
use crate::services::AuthError;
use crate::utils::Password;

#[derive(Clone)]
pub struct PasswordResetFlow {
    codes: OneTimeCodes,
    registry: CredentialRegistry,
    mailer: Arc<dyn Mailer>,
    code_ttl: Duration,
}

impl PasswordResetFlow {
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
            code_ttl: Duration::hours(config.confirmation_lifetime_hours),
        }
    }

    /// Send a reset code. Unknown addresses succeed silently.
    pub async fn request(&self, email: &str) -> Result<(), AuthError> {
        let credential = match self.registry.find_by_email(email).await {
            Ok(c) => c,
            Err(AuthError::NotFound(_)) => {
                tracing::info!("Password reset requested for unknown email");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let code = self
            .codes
            .issue(OtpPurpose::PasswordReset, credential.id, self.code_ttl)
            .await?;

        let mailer = self.mailer.clone();
        let subject_id = credential.id;
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_password_reset_code(&credential.email, subject_id, &code)
                .await
            {
                tracing::error!(subject_id, error = %e, "Failed to deliver password reset code");
            }
        });

        crate::services::metrics::record_otp_sent(OtpPurpose::PasswordReset);
        tracing::info!(subject_id, "Password reset code issued");
        Ok(())
    }

    #[tracing::instrument(skip(self, code, new_password))]
    pub async fn confirm(
        &self,
        subject_id: SubjectId,
        code: &str,
        new_password: &Password,
    ) -> Result<(), AuthError> {
        self.codes
            .consume(OtpPurpose::PasswordReset, subject_id, code)
            .await?;
        self.registry.set_password(subject_id, new_password).await
    }
}
