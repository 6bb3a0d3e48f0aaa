//! Application services: the tenant-scoped operations, orchestrated over a
//! [`Directory`](crate::directory::Directory) and a [`Mailer`](crate::mail::Mailer).
//!
//! The acting identity is always a `UserId` taken from a verified session.

pub mod admin;
pub mod credentials;
pub mod error;
pub mod password_reset;
pub mod roles;
pub mod views;

use vocalyx_auth::User;
use vocalyx_core::{CompanyId, DomainError, UserId};

use crate::directory::Directory;

pub use admin::{AdminService, Invitation, MailSettings, SignUp};
pub use credentials::{CredentialService, IssuedSession, PasswordChange};
pub use error::{ServiceError, ServiceResult};
pub use password_reset::{PasswordResetService, ResetMailSettings};
pub use roles::RoleService;
pub use views::{PermissionView, RoleView, UserView};

/// Load the acting admin.
async fn acting_admin<D: Directory + ?Sized>(directory: &D, id: UserId) -> ServiceResult<User> {
    directory
        .user(id)
        .await?
        .ok_or_else(|| DomainError::not_found("admin").into())
}

/// Load the acting admin together with the company it is scoped to.
async fn scoped_admin<D: Directory + ?Sized>(
    directory: &D,
    id: UserId,
) -> ServiceResult<(User, CompanyId)> {
    let admin = acting_admin(directory, id).await?;
    let company = admin.require_company()?;
    Ok((admin, company))
}

async fn target_user<D: Directory + ?Sized>(directory: &D, id: UserId) -> ServiceResult<User> {
    directory
        .user(id)
        .await?
        .ok_or_else(|| DomainError::not_found("user").into())
}

/// Passwords only need to be present; strength rules are out of scope.
fn require_password(field: &str, password: &str) -> Result<(), DomainError> {
    if password.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
