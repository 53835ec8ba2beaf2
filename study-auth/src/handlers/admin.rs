//! Role promotion endpoints. Every route requires the ADMIN role.

use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::ErrorResponse,
    middleware::CurrentPrincipal,
    models::{SubjectId, UserResponse},
    AppState,
};

/// Grant ADMIN
#[utoipa::path(
    post,
    path = "/admin/users/{id}/admin",
    params(("id" = i64, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Roles updated", body = UserResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn grant_admin(
    State(state): State<AppState>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path(id): Path<SubjectId>,
) -> Result<Json<UserResponse>, AppError> {
    let credential = state.promotion.grant_admin(&actor, id).await?;
    Ok(Json(credential.sanitized()))
}

/// Revoke ADMIN
#[utoipa::path(
    delete,
    path = "/admin/users/{id}/admin",
    params(("id" = i64, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Roles updated", body = UserResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn revoke_admin(
    State(state): State<AppState>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path(id): Path<SubjectId>,
) -> Result<Json<UserResponse>, AppError> {
    let credential = state.promotion.revoke_admin(&actor, id).await?;
    Ok(Json(credential.sanitized()))
}

/// Grant LEADER
#[utoipa::path(
    post,
    path = "/admin/users/{id}/leader",
    params(("id" = i64, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Roles updated", body = UserResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn grant_leader(
    State(state): State<AppState>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path(id): Path<SubjectId>,
) -> Result<Json<UserResponse>, AppError> {
    let credential = state.promotion.grant_leader(&actor, id).await?;
    Ok(Json(credential.sanitized()))
}

/// Revoke LEADER
#[utoipa::path(
    delete,
    path = "/admin/users/{id}/leader",
    params(("id" = i64, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Roles updated", body = UserResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn revoke_leader(
    State(state): State<AppState>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path(id): Path<SubjectId>,
) -> Result<Json<UserResponse>, AppError> {
    let credential = state.promotion.revoke_leader(&actor, id).await?;
    Ok(Json(credential.sanitized()))
}
