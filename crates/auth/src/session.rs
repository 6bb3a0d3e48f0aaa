//! HS256 session tokens.
//!
//! Verification is stateless: a token stays valid for its whole lifetime even
//! if the user, role, or permissions change afterwards. There is no revocation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{SessionClaims, SessionSubject, TokenValidationError, validate_claims};
use crate::error::AuthError;

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `subject`, returning the claims it carries as well.
    pub fn issue(
        &self,
        subject: SessionSubject<'_>,
        now: DateTime<Utc>,
    ) -> Result<(String, SessionClaims), AuthError> {
        let claims = SessionClaims::for_subject(subject, now, self.ttl);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))?;
        Ok((token, claims))
    }

    /// Check signature and time window, returning the embedded claims.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window is checked against `now` below.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        validate_claims(&claims, now).map_err(|e| match e {
            TokenValidationError::Expired => AuthError::ExpiredToken,
            other => AuthError::InvalidToken(other.to_string()),
        })?;
        Ok(claims)
    }
}
