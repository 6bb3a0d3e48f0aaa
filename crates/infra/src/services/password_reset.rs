//! Mail-link password recovery.

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use vocalyx_auth::{PasswordHasher, PasswordResetToken};
use vocalyx_core::DomainError;

use super::error::ServiceResult;
use super::require_password;
use crate::directory::Directory;
use crate::mail::{MailMessage, Mailer, deliver_best_effort};

pub const RESET_SUBJECT: &str = "Reset your Vocalyx password";

#[derive(Debug, Clone)]
pub struct ResetMailSettings {
    pub from: String,
    /// Page that accepts `?token=`.
    pub reset_url: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct PasswordResetService<D, M> {
    directory: D,
    mailer: M,
    hasher: PasswordHasher,
    settings: ResetMailSettings,
}

impl<D: Directory, M: Mailer> PasswordResetService<D, M> {
    pub fn new(directory: D, mailer: M, hasher: PasswordHasher, settings: ResetMailSettings) -> Self {
        Self {
            directory,
            mailer,
            hasher,
            settings,
        }
    }

    /// Issue a fresh token for `email` and mail the link.
    ///
    /// An unknown email succeeds silently so callers cannot probe accounts.
    pub async fn request_reset(&self, email: &str) -> ServiceResult<()> {
        let email = email.trim();
        let Some(user) = self.directory.user_by_email(email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = PasswordResetToken::issue(user.id, Utc::now(), self.settings.ttl);
        self.directory.issue_reset_token(&token).await?;
        info!(user_id = %user.id, expires_at = %token.expires_at, "password reset token issued");

        deliver_best_effort(&self.mailer, self.reset_mail(&user.email, &token.token)).await;
        Ok(())
    }

    /// Consume `token` and set the new password.
    pub async fn perform_reset(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> ServiceResult<()> {
        if new_password != confirm_password {
            return Err(DomainError::PasswordMismatch.into());
        }
        require_password("new password", new_password)?;

        let now = Utc::now();
        let stored = self.directory.reset_token(token).await?;
        let Some(stored) = stored.filter(|t| t.is_usable(now)) else {
            warn!("password reset rejected");
            return Err(DomainError::InvalidOrExpiredToken.into());
        };

        let hash = self.hasher.hash(new_password)?;
        // The store re-checks usability, so a token raced by another reset loses here.
        if !self.directory.complete_password_reset(token, &hash, now).await? {
            warn!(user_id = %stored.user_id, "password reset lost a race for its token");
            return Err(DomainError::InvalidOrExpiredToken.into());
        }

        info!(user_id = %stored.user_id, "password reset completed");
        Ok(())
    }

    fn reset_mail(&self, to: &str, token: &str) -> MailMessage {
        MailMessage {
            from: self.settings.from.clone(),
            to: to.to_string(),
            subject: RESET_SUBJECT.to_string(),
            body: format!(
                "Click the link to reset your password: {}?token={}\n\
                 This link will expire in {} minutes.",
                self.settings.reset_url,
                token,
                self.settings.ttl.num_minutes()
            ),
        }
    }
}
