use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::dto::CompanyRequest;
use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

/// POST /api/users/create-company
///
/// Tokens issued before this call keep their company-less claims; the
/// caller logs in again to get a session carrying the company.
pub async fn create_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CompanyRequest>,
) -> axum::response::Response {
    match services
        .admin
        .create_company(principal.user_id(), body.into())
        .await
    {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
