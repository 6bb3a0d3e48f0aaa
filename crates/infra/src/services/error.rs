use thiserror::Error;

use vocalyx_auth::AuthError;
use vocalyx_core::DomainError;

use crate::directory::{StoreError, UniqueKey};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of an application operation.
///
/// `Domain` failures are deterministic: retrying yields the same answer.
/// `Store` failures come from infrastructure and may be transient.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),

    #[error("crypto failure: {0}")]
    Crypto(String),
}

impl ServiceError {
    /// True only for transient infrastructure failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Store(e) if e.is_retryable())
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Constraint violations that mean a domain conflict surface as the domain
/// error; everything else stays an infrastructure failure.
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(UniqueKey::Email) => DomainError::EmailTaken.into(),
            StoreError::Duplicate(UniqueKey::RoleName) => DomainError::DuplicateRole.into(),
            StoreError::MissingReference("role") => DomainError::not_found("role").into(),
            other => ServiceError::Store(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err.as_domain() {
            Some(domain) => ServiceError::Domain(domain),
            None => ServiceError::Crypto(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_clashes_become_domain_errors() {
        assert_eq!(
            ServiceError::from(StoreError::Duplicate(UniqueKey::Email)),
            ServiceError::Domain(DomainError::EmailTaken)
        );
        assert_eq!(
            ServiceError::from(StoreError::Duplicate(UniqueKey::RoleName)),
            ServiceError::Domain(DomainError::DuplicateRole)
        );
    }

    #[test]
    fn only_transient_store_failures_are_retryable() {
        assert!(ServiceError::from(StoreError::Unavailable("down".into())).is_retryable());
        assert!(!ServiceError::from(StoreError::Corrupt("bad row".into())).is_retryable());
        assert!(!ServiceError::Domain(DomainError::RoleInUse).is_retryable());
        assert!(!ServiceError::Crypto("bad key".into()).is_retryable());
    }

    #[test]
    fn token_errors_keep_their_domain_meaning() {
        assert_eq!(
            ServiceError::from(AuthError::ExpiredToken),
            ServiceError::Domain(DomainError::ExpiredToken)
        );
        assert!(matches!(
            ServiceError::from(AuthError::Crypto("x".into())),
            ServiceError::Crypto(_)
        ));
    }
}
