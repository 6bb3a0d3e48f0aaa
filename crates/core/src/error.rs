//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// tenant scoping, conflicts). Infrastructure concerns belong elsewhere: a
/// caller retrying one of these gets the same answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A lookup missed. The payload names what was looked up ("user", "role", ...).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The actor has no company but the operation needs one.
    #[error("a company is required for this operation")]
    NoTenant,

    /// The company already has a role with this name.
    #[error("role with this name already exists in your workspace")]
    DuplicateRole,

    /// The email address already belongs to an account.
    #[error("user with this email already exists")]
    EmailTaken,

    /// The entity belongs to a different company than the actor.
    #[error("resource does not belong to your workspace")]
    CrossTenantAccess,

    /// The role is still assigned to at least one user.
    #[error("cannot delete role that is assigned to users")]
    RoleInUse,

    /// An admin tried to delete their own account.
    #[error("cannot delete your own account")]
    SelfDeleteForbidden,

    /// The user already has a company.
    #[error("user already has a company assigned")]
    AlreadyHasTenant,

    /// Unknown email or wrong password (deliberately indistinguishable).
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Session token is malformed or its signature does not verify.
    #[error("invalid session token")]
    InvalidToken,

    /// Session token is past its expiry.
    #[error("session token has expired")]
    ExpiredToken,

    /// New password and its confirmation differ.
    #[error("new password and confirm password do not match")]
    PasswordMismatch,

    /// Password reset token is unknown, already used, or expired.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound(what)
    }

    /// Stable machine-readable code, used as the `error` field of API responses.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::NotFound(_) => "not_found",
            DomainError::NoTenant => "no_tenant",
            DomainError::DuplicateRole => "duplicate_role",
            DomainError::EmailTaken => "email_taken",
            DomainError::CrossTenantAccess => "cross_tenant_access",
            DomainError::RoleInUse => "role_in_use",
            DomainError::SelfDeleteForbidden => "self_delete_forbidden",
            DomainError::AlreadyHasTenant => "already_has_tenant",
            DomainError::InvalidCredentials => "invalid_credentials",
            DomainError::InvalidToken => "invalid_token",
            DomainError::ExpiredToken => "expired_token",
            DomainError::PasswordMismatch => "password_mismatch",
            DomainError::InvalidOrExpiredToken => "invalid_or_expired_token",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_missing_thing() {
        assert_eq!(DomainError::not_found("role").to_string(), "role not found");
    }

    #[test]
    fn credential_failures_share_one_message() {
        // Unknown email and wrong password surface the same text.
        assert_eq!(
            DomainError::InvalidCredentials.to_string(),
            "invalid email or password"
        );
    }

    #[test]
    fn codes_are_snake_case() {
        for err in [
            DomainError::NoTenant,
            DomainError::CrossTenantAccess,
            DomainError::InvalidOrExpiredToken,
            DomainError::validation("x"),
        ] {
            let code = err.code();
            assert!(code.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{code}");
        }
    }
}
