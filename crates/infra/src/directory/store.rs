use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use vocalyx_auth::{Company, CustomRole, PasswordResetToken, User, Workspace};
use vocalyx_core::{CompanyId, RoleId, UserId};

/// Unique keys the directory enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    /// `users.email`, global across tenants.
    Email,
    /// `(company_id, role_name)` on custom roles.
    RoleName,
    ResetToken,
    /// Primary key or an unnamed constraint.
    Other,
}

impl core::fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            UniqueKey::Email => "email",
            UniqueKey::RoleName => "role name",
            UniqueKey::ResetToken => "reset token",
            UniqueKey::Other => "record",
        })
    }
}

/// Infrastructure failure of the directory.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient: connection lost, pool exhausted, lock poisoned. Retrying may help.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A unique constraint rejected the write.
    #[error("duplicate {0}")]
    Duplicate(UniqueKey),

    /// A foreign key pointed at a row that does not exist.
    #[error("missing referenced {0}")]
    MissingReference(&'static str),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Any other backend failure. Not retryable.
    #[error("store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Outcome of [`Directory::establish_company`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyAttach {
    Attached,
    /// The owner gained a company in the meantime; nothing was written.
    AlreadyScoped,
    MissingUser,
}

/// Outcome of [`Directory::delete_role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDeletion {
    /// Role and all its permission rows are gone.
    Deleted,
    /// At least one user still references the role; nothing was written.
    InUse,
    Missing,
}

/// Persistence boundary for tenants, users, roles and reset tokens.
///
/// Every method that writes more than one record is atomic: either all of
/// its rows become visible or none do.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn company(&self, id: CompanyId) -> Result<Option<Company>, StoreError>;

    /// Insert `company` and `workspace` and scope `owner` to both.
    ///
    /// Only succeeds while the stored owner has no company yet.
    async fn establish_company(
        &self,
        owner: &User,
        company: &Company,
        workspace: &Workspace,
    ) -> Result<CompanyAttach, StoreError>;

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// All users of a company, oldest first.
    async fn users_in_company(&self, company: CompanyId) -> Result<Vec<User>, StoreError>;

    /// Fails with `Duplicate(Email)` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Write the admin-editable columns of `user`: names, email and custom
    /// role. Other columns keep their stored values. Returns `false` if there
    /// is no such user.
    ///
    /// Fails with `Duplicate(Email)` on an email clash and
    /// `MissingReference("role")` if the custom role no longer exists.
    async fn update_profile(&self, user: &User) -> Result<bool, StoreError>;

    /// Set or clear only the custom role. Returns `false` if there is no such user.
    async fn set_custom_role(
        &self,
        user: UserId,
        role: Option<RoleId>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Replace only the password hash. Returns `false` if there is no such user.
    async fn set_password_hash(
        &self,
        user: UserId,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;

    /// A role with its permission rows.
    async fn role(&self, id: RoleId) -> Result<Option<CustomRole>, StoreError>;

    /// All roles of a company with their permission rows, oldest first.
    async fn roles_in_company(&self, company: CompanyId) -> Result<Vec<CustomRole>, StoreError>;

    async fn role_name_taken(&self, company: CompanyId, name: &str) -> Result<bool, StoreError>;

    /// Insert a role together with its permission rows.
    async fn insert_role(&self, role: &CustomRole) -> Result<(), StoreError>;

    /// Remove a role unless a user references it; permission rows go first.
    async fn delete_role(&self, id: RoleId) -> Result<RoleDeletion, StoreError>;

    /// Mark every unused token of the owner used, then store `token`.
    async fn issue_reset_token(&self, token: &PasswordResetToken) -> Result<(), StoreError>;

    async fn reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>, StoreError>;

    /// Consume a usable token and store the owner's new hash in one step.
    ///
    /// Returns `false` (and writes nothing) if the token is unknown, used, or
    /// expired at `now`.
    async fn complete_password_reset(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
impl<D> Directory for Arc<D>
where
    D: Directory + ?Sized,
{
    async fn company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        (**self).company(id).await
    }

    async fn establish_company(
        &self,
        owner: &User,
        company: &Company,
        workspace: &Workspace,
    ) -> Result<CompanyAttach, StoreError> {
        (**self).establish_company(owner, company, workspace).await
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).user(id).await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).user_by_email(email).await
    }

    async fn users_in_company(&self, company: CompanyId) -> Result<Vec<User>, StoreError> {
        (**self).users_in_company(company).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        (**self).insert_user(user).await
    }

    async fn update_profile(&self, user: &User) -> Result<bool, StoreError> {
        (**self).update_profile(user).await
    }

    async fn set_custom_role(
        &self,
        user: UserId,
        role: Option<RoleId>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        (**self).set_custom_role(user, role, at).await
    }

    async fn set_password_hash(
        &self,
        user: UserId,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        (**self).set_password_hash(user, password_hash, at).await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        (**self).delete_user(id).await
    }

    async fn role(&self, id: RoleId) -> Result<Option<CustomRole>, StoreError> {
        (**self).role(id).await
    }

    async fn roles_in_company(&self, company: CompanyId) -> Result<Vec<CustomRole>, StoreError> {
        (**self).roles_in_company(company).await
    }

    async fn role_name_taken(&self, company: CompanyId, name: &str) -> Result<bool, StoreError> {
        (**self).role_name_taken(company, name).await
    }

    async fn insert_role(&self, role: &CustomRole) -> Result<(), StoreError> {
        (**self).insert_role(role).await
    }

    async fn delete_role(&self, id: RoleId) -> Result<RoleDeletion, StoreError> {
        (**self).delete_role(id).await
    }

    async fn issue_reset_token(&self, token: &PasswordResetToken) -> Result<(), StoreError> {
        (**self).issue_reset_token(token).await
    }

    async fn reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>, StoreError> {
        (**self).reset_token(token).await
    }

    async fn complete_password_reset(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        (**self).complete_password_reset(token, password_hash, now).await
    }
}
