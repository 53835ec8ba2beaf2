use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{SignInRequest, SignInResponse, SignUpRequest, SignUpResponse},
        ErrorResponse,
    },
    models::parse_roles,
    services::{AuthError, SignUp},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Create an account and send the email verification code
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = SignUpResponse),
        (status = 400, description = "Unknown role", body = ErrorResponse),
        (status = 409, description = "Username or email already in use", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let roles = parse_roles(req.roles.unwrap_or_default())
        .map_err(|token| AuthError::Validation(format!("Unknown role: {}", token)))?;

    let credential = state
        .auth
        .sign_up(SignUp {
            first_name: req.first_name,
            last_name: req.last_name,
            username: req.username,
            email: req.email,
            password: Password::new(req.password),
            roles,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            success: true,
            message: "Account created. Check your email for a verification code.".to_string(),
            data: credential.sanitized(),
        }),
    ))
}

/// Exchange a username or email and password for a bearer token
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid credentials or unverified email", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignInRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    let session = state
        .auth
        .sign_in(&req.identifier, &Password::new(req.password))
        .await?;

    Ok(Json(SignInResponse {
        token: session.token.token,
        token_type: "Bearer".to_string(),
        expires_at: session.token.expires_at,
        id: session.principal.subject_id,
        username: session.principal.username,
        email: session.email,
        roles: session.principal.roles.into_iter().collect(),
    }))
}
