//! Custom role management for the caller's company.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use vocalyx_core::RoleId;
use vocalyx_infra::services::RoleView;

use crate::app::dto::CreateRoleRequest;
use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

/// POST /api/users/roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreateRoleRequest>,
) -> axum::response::Response {
    let input = match body.into_new_role() {
        Ok(input) => input,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.roles.create_role(principal.user_id(), input).await {
        Ok(role) => (StatusCode::CREATED, Json(RoleView::from(&role))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /api/users/roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.roles.list_roles(principal.user_id()).await {
        Ok(roles) => {
            let views: Vec<RoleView> = roles.iter().map(RoleView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// DELETE /api/users/roles/:id
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let role_id = match id.parse::<RoleId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.roles.delete_role(principal.user_id(), role_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
