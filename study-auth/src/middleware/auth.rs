//! Bearer-token authentication for every inbound request.
//!
//! A request without an `Authorization` header continues as anonymous and is
//! rejected later by handlers that extract [`CurrentPrincipal`]. A header that
//! is present but doesn't validate stops the request with 401 here.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::models::Principal;
use crate::services::AuthError;
use crate::AppState;

pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(next.run(req).await);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or_else(|| {
            tracing::debug!("Authorization header is not a bearer token");
            AuthError::unauthenticated()
        })?;

    let principal = state.tokens.validate(token).map_err(|e| {
        tracing::warn!(kind = e.kind(), "Rejected bearer token");
        crate::services::metrics::record_token_rejection(e.kind());
        AuthError::from(e)
    })?;

    if state.auth.email_verification_required() {
        // Fresh read; the token says nothing about the flag's current value.
        match state.registry.find_by_id(principal.subject_id).await {
            Ok(c) if c.email_verified => {}
            Ok(_) => {
                return Err(AuthError::Unauthorized(
                    "Email address has not been verified".to_string(),
                )
                .into())
            }
            Err(AuthError::NotFound(_)) => return Err(AuthError::unauthenticated().into()),
            Err(e) => return Err(e.into()),
        }
    }

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// The scheme name is matched case-insensitively.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim_start().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated caller. Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| AuthError::Unauthorized("Authentication required".to_string()).into())
    }
}
