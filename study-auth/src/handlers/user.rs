use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::{ErrorResponse, MessageResponse},
    middleware::CurrentPrincipal,
    models::UserResponse,
    AppState,
};

/// Current user's profile
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<UserResponse>, AppError> {
    let credential = state.registry.find_by_id(principal.subject_id).await?;
    Ok(Json(credential.sanitized()))
}

/// Delete the current user's account
#[utoipa::path(
    delete,
    path = "/users/me",
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Account already gone", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<MessageResponse>, AppError> {
    state.registry.delete(principal.subject_id).await?;
    Ok(Json(MessageResponse::ok("Account deleted")))
}
