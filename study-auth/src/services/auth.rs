use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::{Credential, Principal, Role};
use crate::services::otp::OtpVerificationFlow;
use crate::services::registry::{CreateCredential, CredentialRegistry};
use crate::services::token::{IssuedToken, TokenService};
use crate::services::AuthError;
use crate::utils::{
    verify_password, verify_password_for_missing_account, Password, PasswordHashString,
};

#[derive(Debug, Clone)]
pub struct SignUp {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub password: Password,
    pub roles: BTreeSet<Role>,
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: IssuedToken,
    pub principal: Principal,
    pub email: String,
}

#[derive(Clone)]
pub struct AuthenticationService {
    registry: CredentialRegistry,
    verification: Arc<OtpVerificationFlow>,
    tokens: TokenService,
    email_verification_required: bool,
}

impl AuthenticationService {
    pub fn new(
        registry: CredentialRegistry,
        verification: Arc<OtpVerificationFlow>,
        tokens: TokenService,
        email_verification_required: bool,
    ) -> Self {
        Self {
            registry,
            verification,
            tokens,
            email_verification_required,
        }
    }

    pub fn email_verification_required(&self) -> bool {
        self.email_verification_required
    }

    /// Create the record and start email verification.
    ///
    /// The account exists once this returns even if the code could not be
    /// stored; the user can ask for a resend.
    #[tracing::instrument(skip(self, request), fields(username = %request.username))]
    pub async fn sign_up(&self, request: SignUp) -> Result<Credential, AuthError> {
        let credential = self
            .registry
            .create(CreateCredential {
                first_name: request.first_name,
                last_name: request.last_name,
                username: request.username,
                email: request.email,
                password: request.password,
                roles: request.roles,
            })
            .await?;

        if let Err(e) = self
            .verification
            .send_code(credential.id, &credential.email)
            .await
        {
            tracing::error!(
                subject_id = credential.id,
                error = %e,
                "Failed to issue verification code"
            );
        }

        crate::services::metrics::record_sign_up();
        Ok(credential)
    }

    /// `identifier` is treated as an email when it contains `@`, otherwise a username.
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        identifier: &str,
        password: &Password,
    ) -> Result<Session, AuthError> {
        let outcome = self.authenticate(identifier, password).await;
        crate::services::metrics::record_sign_in(match &outcome {
            Ok(_) => "success",
            Err(AuthError::AuthenticationFailed) => "bad_credentials",
            Err(AuthError::Unauthorized(_)) => "unverified",
            Err(_) => "error",
        });
        outcome
    }

    async fn authenticate(
        &self,
        identifier: &str,
        password: &Password,
    ) -> Result<Session, AuthError> {
        let lookup = if identifier.contains('@') {
            self.registry.find_by_email(identifier).await
        } else {
            self.registry.find_by_username(identifier).await
        };

        let credential = match lookup {
            Ok(c) => c,
            Err(AuthError::NotFound(_)) => {
                verify_password_for_missing_account(password);
                return Err(AuthError::AuthenticationFailed);
            }
            Err(e) => return Err(e),
        };

        let hash = PasswordHashString::new(credential.password_hash.as_str());
        if !verify_password(password, &hash) {
            tracing::warn!(
                subject_id = credential.id,
                "Sign-in rejected: password mismatch"
            );
            return Err(AuthError::AuthenticationFailed);
        }

        if self.email_verification_required && !credential.email_verified {
            return Err(AuthError::Unauthorized(
                "Email address has not been verified".to_string(),
            ));
        }

        let token = self
            .tokens
            .issue(credential.id, &credential.username, &credential.roles)?;

        tracing::info!(subject_id = credential.id, "Signed in");
        Ok(Session {
            token,
            principal: Principal::new(credential.id, credential.username, credential.roles),
            email: credential.email,
        })
    }
}
