use service_core::error::AppError;
use thiserror::Error;

use super::token::TokenError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    AuthenticationFailed,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn unauthenticated() -> Self {
        AuthError::Unauthorized("Invalid or expired token".to_string())
    }

    pub fn forbidden() -> Self {
        AuthError::Forbidden("You do not have permission to perform this action".to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        AuthError::unauthenticated()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Internal(anyhow::Error::new(err).context("Database error"))
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Internal(anyhow::Error::new(err).context("Cache error"))
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            AuthError::AuthenticationFailed => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            AuthError::Unauthorized(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            AuthError::Forbidden(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            AuthError::Invalid(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            AuthError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            AuthError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            AuthError::Internal(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::StatusCode;

    #[test]
    fn every_token_failure_looks_the_same() {
        let failures = [
            TokenError::Malformed,
            TokenError::BadSignature,
            TokenError::Expired,
        ];
        let messages: Vec<String> = failures
            .into_iter()
            .map(|e| AuthError::from(e).to_string())
            .collect();
        assert!(messages.iter().all(|m| m == &messages[0]));
    }

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (AuthError::Conflict("dup".into()), StatusCode::CONFLICT),
            (AuthError::AuthenticationFailed, StatusCode::UNAUTHORIZED),
            (AuthError::unauthenticated(), StatusCode::UNAUTHORIZED),
            (AuthError::forbidden(), StatusCode::FORBIDDEN),
            (AuthError::Invalid("bad code".into()), StatusCode::BAD_REQUEST),
            (AuthError::NotFound("nope".into()), StatusCode::NOT_FOUND),
            (
                AuthError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }
}
