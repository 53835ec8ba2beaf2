use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{SendOtpRequest, VerifyOtpRequest},
        ErrorResponse, MessageResponse,
    },
    models::UserResponse,
    utils::ValidatedJson,
    AppState,
};

/// Send a new email verification code, replacing any previous one
#[utoipa::path(
    post,
    path = "/auth/otp/send",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 404, description = "No unverified account for this email", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn send_code(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SendOtpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.verification.resend(&req.email).await?;
    Ok(Json(MessageResponse::ok("Verification code sent")))
}

/// Submit a verification code
#[utoipa::path(
    post,
    path = "/auth/otp/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified", body = UserResponse),
        (status = 400, description = "Invalid or expired code", body = ErrorResponse),
        (status = 409, description = "Already verified", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_code(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyOtpRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let credential = state.verification.verify(req.subject_id, &req.code).await?;
    Ok(Json(credential.sanitized()))
}
