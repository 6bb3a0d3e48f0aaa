//! Login, session issuance/verification and self-service password change.

use chrono::Utc;
use tracing::{error, info, warn};

use vocalyx_auth::{PasswordHasher, SessionClaims, SessionIssuer, SessionSubject, User};
use vocalyx_core::{DomainError, UserId};

use super::error::ServiceResult;
use super::require_password;
use crate::directory::Directory;

/// A freshly minted session token and the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone)]
pub struct CredentialService<D> {
    directory: D,
    hasher: PasswordHasher,
    issuer: SessionIssuer,
}

impl<D: Directory> CredentialService<D> {
    pub fn new(directory: D, hasher: PasswordHasher, issuer: SessionIssuer) -> Self {
        Self {
            directory,
            hasher,
            issuer,
        }
    }

    /// Check an email/password pair.
    ///
    /// Unknown email and wrong password fail identically, and both paths pay
    /// for one Argon2 verification.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let Some(user) = self.directory.user_by_email(email.trim()).await? else {
            self.hasher.verify_dummy(password);
            warn!("login rejected");
            return Err(DomainError::InvalidCredentials.into());
        };

        if self.password_matches(&user, password) {
            Ok(user)
        } else {
            warn!(user_id = %user.id, "login rejected");
            Err(DomainError::InvalidCredentials.into())
        }
    }

    /// Mint a session for `user`, resolving company and role names now.
    pub async fn issue_session(&self, user: &User) -> ServiceResult<IssuedSession> {
        let company = match user.company_id {
            Some(id) => self.directory.company(id).await?,
            None => None,
        };
        let custom_role = match user.custom_role_id {
            Some(id) => self.directory.role(id).await?,
            None => None,
        };

        let (token, claims) = self.issuer.issue(
            SessionSubject {
                user,
                company: company.as_ref(),
                custom_role: custom_role.as_ref(),
            },
            Utc::now(),
        )?;
        Ok(IssuedSession { token, claims })
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<IssuedSession> {
        let user = self.authenticate(email, password).await?;
        let session = self.issue_session(&user).await?;
        info!(
            user_id = %user.id,
            company_id = ?user.company_id,
            permission_count = session.claims.permissions.len(),
            "session issued"
        );
        Ok(session)
    }

    /// Signature and time-window check only; the store is never consulted.
    pub fn verify_session(&self, token: &str) -> ServiceResult<SessionClaims> {
        Ok(self.issuer.verify(token, Utc::now())?)
    }

    /// Replace the caller's password after re-checking the current one.
    pub async fn change_password(&self, user_id: UserId, change: PasswordChange) -> ServiceResult<()> {
        if change.new_password != change.confirm_password {
            return Err(DomainError::PasswordMismatch.into());
        }
        require_password("new password", &change.new_password)?;

        let user = self
            .directory
            .user(user_id)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;
        if !self.password_matches(&user, &change.current_password) {
            warn!(user_id = %user.id, "password change rejected");
            return Err(DomainError::InvalidCredentials.into());
        }

        let hash = self.hasher.hash(&change.new_password)?;
        if !self.directory.set_password_hash(user.id, &hash, Utc::now()).await? {
            return Err(DomainError::InvalidCredentials.into());
        }
        info!(user_id = %user.id, "password changed");
        Ok(())
    }

    fn password_matches(&self, user: &User, password: &str) -> bool {
        match self.hasher.verify(password, &user.password_hash) {
            Ok(matches) => matches,
            Err(err) => {
                error!(user_id = %user.id, error = %err, "stored password hash is unreadable");
                false
            }
        }
    }
}
