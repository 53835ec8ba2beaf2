//! One-time code purposes and their cache keys.

use serde::{Deserialize, Serialize};

use super::SubjectId;

/// What a one-time code proves. Each purpose keeps its own live code per subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    EmailVerification,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::EmailVerification => "email_verification",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }

    /// Cache key holding the live code for `subject_id`.
    pub fn store_key(&self, subject_id: SubjectId) -> String {
        format!("otp:{}:{}", self.as_str(), subject_id)
    }
}
