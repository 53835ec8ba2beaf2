//! Signed, self-contained session tokens.
//!
//! Tokens are HS256 JWTs carrying the subject, username and a snapshot of the
//! subject's roles. There is no server-side session table: a token stays
//! valid until `exp`, and role changes only show up in tokens issued later.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::TokenConfig;
use crate::models::{Principal, Role, SubjectId};
use crate::services::clock::{Clock, SystemClock};

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (credential id)
    pub sub: String,
    pub username: String,
    /// Role snapshot at issuance
    pub roles: Vec<Role>,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A freshly signed token and its absolute expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Why a token was rejected. Callers collapse all of these into one
/// unauthenticated outcome; the kind is kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

impl TokenError {
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::BadSignature => "bad_signature",
            TokenError::Expired => "expired",
        }
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.signing_secret.expose_secret().as_bytes();

        tracing::info!(
            lifetime_minutes = config.lifetime_minutes,
            issuer = %config.issuer,
            "Token service initialized with HS256 key"
        );

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime: Duration::minutes(config.lifetime_minutes),
            issuer: config.issuer.clone(),
            clock,
        }
    }

    /// Sign a token for `subject_id` expiring one configured lifetime from now.
    pub fn issue(
        &self,
        subject_id: SubjectId,
        username: &str,
        roles: &BTreeSet<Role>,
    ) -> Result<IssuedToken, anyhow::Error> {
        let now = self.clock.now();
        let expires_at = now + self.lifetime;

        let claims = SessionClaims {
            sub: subject_id.to_string(),
            username: username.to_string(),
            roles: roles.iter().copied().collect(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok(IssuedToken {
            token,
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    /// Verify signature, structure and expiry, returning the token's principal.
    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| classify(e.kind()))?
            .claims;

        if claims.exp < self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }

        let subject_id = claims
            .sub
            .parse::<SubjectId>()
            .map_err(|_| TokenError::Malformed)?;

        Ok(Principal::new(
            subject_id,
            claims.username,
            claims.roles.into_iter().collect(),
        ))
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
