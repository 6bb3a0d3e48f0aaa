//! Sign-up, login, and password recovery. Everything here except password
//! change is reachable without a session.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::dto::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, PerformResetRequest,
    RegisterRequest,
};
use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

/// POST /api/users/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterRequest>,
) -> axum::response::Response {
    match services.admin.register(body.into()).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /api/users/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    match services.credentials.login(&body.email, &body.password).await {
        Ok(session) => (StatusCode::OK, Json(LoginResponse::from(session))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /api/users/forgot-password
///
/// Always 200 for a well-formed request, whether or not the email is known.
pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> axum::response::Response {
    match services.resets.request_reset(&body.email).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "If the email is registered, a reset link has been sent.",
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /api/users/perform-reset
pub async fn perform_reset(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PerformResetRequest>,
) -> axum::response::Response {
    match services
        .resets
        .perform_reset(&body.token, &body.new_password, &body.confirm_password)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Password has been reset." })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /api/users/reset-password (authenticated password change)
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ChangePasswordRequest>,
) -> axum::response::Response {
    match services
        .credentials
        .change_password(principal.user_id(), body.into())
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
