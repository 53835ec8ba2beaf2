use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::MailConfig;
use crate::models::{OtpPurpose, SubjectId};

/// Outbound mail used by the one-time code flows.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_code(
        &self,
        to_email: &str,
        subject_id: SubjectId,
        code: &str,
    ) -> Result<(), AppError>;

    async fn send_password_reset_code(
        &self,
        to_email: &str,
        subject_id: SubjectId,
        code: &str,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from_address: String,
    public_base_url: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, AppError> {
        let builder = if config.smtp_user.is_empty() {
            // Local relays (mailhog, mailpit) run without TLS or auth.
            SmtpTransport::builder_dangerous(&config.smtp_host)
        } else {
            let creds = Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.expose_secret().clone(),
            );
            SmtpTransport::starttls_relay(&config.smtp_host)
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid SMTP host: {}", e)))?
                .credentials(creds)
        };

        let transport = builder
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            "SMTP mailer initialized"
        );

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        let transport = self.transport.clone();
        let result = tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, subject = %subject, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification_code(
        &self,
        to_email: &str,
        subject_id: SubjectId,
        code: &str,
    ) -> Result<(), AppError> {
        let link = format!(
            "{}/auth/verify?subject_id={}&code={}",
            self.public_base_url, subject_id, code
        );

        let html_body = format!(
            r#"<html>
  <body style="font-family: Arial, sans-serif;">
    <h2>Confirm your email address</h2>
    <p>Your verification code is <strong>{code}</strong>.</p>
    <p><a href="{link}">Verify email</a></p>
    <p style="color: #666; font-size: 12px;">The code expires shortly. If you didn't sign up, ignore this email.</p>
  </body>
</html>"#
        );

        let plain_body = format!(
            "Confirm your email address\n\nYour verification code is {code}.\n\nOr open: {link}\n\nThe code expires shortly. If you didn't sign up, ignore this email."
        );

        self.send_email(to_email, "Verify your email address", plain_body, html_body)
            .await
    }

    async fn send_password_reset_code(
        &self,
        to_email: &str,
        subject_id: SubjectId,
        code: &str,
    ) -> Result<(), AppError> {
        let link = format!(
            "{}/auth/password-reset/confirm?subject_id={}&code={}",
            self.public_base_url, subject_id, code
        );

        let html_body = format!(
            r#"<html>
  <body style="font-family: Arial, sans-serif;">
    <h2>Password reset</h2>
    <p>Your reset code is <strong>{code}</strong>.</p>
    <p><a href="{link}">Choose a new password</a></p>
    <p style="color: #666; font-size: 12px;">If you didn't request this, ignore this email.</p>
  </body>
</html>"#
        );

        let plain_body = format!(
            "Password reset\n\nYour reset code is {code}.\n\nOr open: {link}\n\nIf you didn't request this, ignore this email."
        );

        self.send_email(to_email, "Reset your password", plain_body, html_body)
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject_id: SubjectId,
    pub purpose: OtpPurpose,
    pub code: String,
}

/// Keeps every message in memory instead of sending it.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_code(&self, subject_id: SubjectId, purpose: OtpPurpose) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.subject_id == subject_id && m.purpose == purpose)
            .map(|m| m.code)
    }

    /// Waits for the spawned dispatch task to deliver `count` messages.
    pub async fn wait_for(&self, count: usize) -> Vec<SentMail> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.sent()
    }

    fn record(&self, mail: SentMail) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(mail);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification_code(
        &self,
        to_email: &str,
        subject_id: SubjectId,
        code: &str,
    ) -> Result<(), AppError> {
        self.record(SentMail {
            to: to_email.to_string(),
            subject_id,
            purpose: OtpPurpose::EmailVerification,
            code: code.to_string(),
        });
        Ok(())
    }

    async fn send_password_reset_code(
        &self,
        to_email: &str,
        subject_id: SubjectId,
        code: &str,
    ) -> Result<(), AppError> {
        self.record(SentMail {
            to: to_email.to_string(),
            subject_id,
            purpose: OtpPurpose::PasswordReset,
            code: code.to_string(),
        });
        Ok(())
    }
}
