use thiserror::Error;

use vocalyx_core::DomainError;

/// Failures of the credential and session primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed token, bad signature, or an inconsistent time window.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    ExpiredToken,

    /// Hashing/signing machinery failed (bad key, malformed stored hash).
    #[error("crypto failure: {0}")]
    Crypto(String),
}

impl AuthError {
    /// The domain-level condition this error surfaces as, if any.
    ///
    /// `Crypto` has no domain counterpart: it is an internal failure.
    pub fn as_domain(&self) -> Option<DomainError> {
        match self {
            AuthError::InvalidToken(_) => Some(DomainError::InvalidToken),
            AuthError::ExpiredToken => Some(DomainError::ExpiredToken),
            AuthError::Crypto(_) => None,
        }
    }
}
