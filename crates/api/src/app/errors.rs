use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use vocalyx_core::DomainError;
use vocalyx_infra::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) if e.is_retryable() => {
            tracing::warn!(error = %e, "store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", "storage is temporarily unavailable")
        }
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal storage error")
        }
        ServiceError::Crypto(msg) => {
            tracing::error!(error = %msg, "crypto failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "crypto_error", "internal error")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::Validation(_)
        | DomainError::InvalidId(_)
        | DomainError::PasswordMismatch
        | DomainError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::DuplicateRole
        | DomainError::EmailTaken
        | DomainError::NoTenant
        | DomainError::AlreadyHasTenant
        | DomainError::RoleInUse => StatusCode::CONFLICT,
        DomainError::SelfDeleteForbidden => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::CrossTenantAccess => StatusCode::FORBIDDEN,
        DomainError::InvalidCredentials | DomainError::InvalidToken | DomainError::ExpiredToken => {
            StatusCode::UNAUTHORIZED
        }
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocalyx_infra::directory::StoreError;

    #[test]
    fn domain_conditions_map_to_distinct_statuses() {
        let status = |e: DomainError| domain_error_to_response(e).status();
        assert_eq!(status(DomainError::not_found("role")), StatusCode::NOT_FOUND);
        assert_eq!(status(DomainError::CrossTenantAccess), StatusCode::FORBIDDEN);
        assert_eq!(status(DomainError::RoleInUse), StatusCode::CONFLICT);
        assert_eq!(status(DomainError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(DomainError::PasswordMismatch), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn transient_store_failures_are_503() {
        let res = service_error_to_response(ServiceError::Store(StoreError::Unavailable("pool".into())));
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let res = service_error_to_response(ServiceError::Store(StoreError::Corrupt("row".into())));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
