//! Caller profile and company user administration.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use vocalyx_core::UserId;

use crate::app::dto::{AssignRoleRequest, InviteRequest, UpdateUserRequest};
use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

/// GET /api/users/me - Verified claims of the current session
pub async fn me(Extension(principal): Extension<PrincipalContext>) -> axum::response::Response {
    (StatusCode::OK, Json(principal.claims().clone())).into_response()
}

/// GET /api/users/me/permissions/:name - Advisory permission lookup
pub async fn check_permission(
    Extension(principal): Extension<PrincipalContext>,
    Path(name): Path<String>,
) -> axum::response::Response {
    (StatusCode::OK, Json(principal.principal().check(&name))).into_response()
}

/// GET /api/users/profile - Current profile, resolved from the store
pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.admin.profile(principal.user_id()).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /api/users/invite
pub async fn invite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<InviteRequest>,
) -> axum::response::Response {
    match services.admin.invite_user(principal.user_id(), body.into()).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /api/users/workspace-users
pub async fn workspace_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.admin.list_company_users(principal.user_id()).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PUT /api/users/:id
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> axum::response::Response {
    let target = match id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let update = match body.into_update() {
        Ok(update) => update,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .admin
        .update_user(principal.user_id(), target, update)
        .await
    {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// DELETE /api/users/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let target = match id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.admin.delete_user(principal.user_id(), target).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /api/users/:id/assign-role
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<AssignRoleRequest>,
) -> axum::response::Response {
    let target = match id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let role = match body.role_id() {
        Ok(role) => role,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .roles
        .assign_role(principal.user_id(), target, role)
        .await
    {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
