//! User accounts and their tenant lifecycle.
//!
//! A self-registered account starts as an *unscoped* admin (no company). Creating
//! a company scopes it; invited accounts inherit the inviting admin's scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vocalyx_core::{CompanyId, DomainError, DomainResult, Entity, RoleId, UserId, WorkspaceId};

use crate::roles::BasicRole;
use crate::tenant::{Company, Workspace};

/// Placeholder names given to invited accounts until they edit their profile.
pub const INVITED_FIRST_NAME: &str = "Invited";
pub const INVITED_LAST_NAME: &str = "Member";

/// Identity record.
///
/// Invariants:
/// - `email` is globally unique (enforced by the store)
/// - `company_id` and `workspace_id` are set together or not at all
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: BasicRole,
    pub company_id: Option<CompanyId>,
    pub workspace_id: Option<WorkspaceId>,
    pub custom_role_id: Option<RoleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Hand-written so the hash never ends up in logs.
impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("company_id", &self.company_id)
            .field("workspace_id", &self.workspace_id)
            .field("custom_role_id", &self.custom_role_id)
            .finish_non_exhaustive()
    }
}

/// Self-registration input. The password is already hashed.
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// Admin-driven profile edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// `None` clears the custom role.
    pub custom_role_id: Option<RoleId>,
}

impl User {
    /// A fresh self-registered account: ADMIN, no company yet.
    pub fn register(input: Registration, now: DateTime<Utc>) -> DomainResult<Self> {
        let first_name = required("first name", &input.first_name)?;
        let last_name = required("last name", &input.last_name)?;
        let email = validate_email(&input.email)?;

        Ok(Self {
            id: UserId::new(),
            first_name,
            last_name,
            email,
            password_hash: input.password_hash,
            role: BasicRole::Admin,
            company_id: None,
            workspace_id: None,
            custom_role_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// An account created by `admin`, copying the admin's company and workspace.
    pub fn invited(
        admin: &User,
        email: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let company_id = admin.require_company()?;
        let email = validate_email(email)?;

        Ok(Self {
            id: UserId::new(),
            first_name: INVITED_FIRST_NAME.to_string(),
            last_name: INVITED_LAST_NAME.to_string(),
            email,
            password_hash,
            role: BasicRole::User,
            company_id: Some(company_id),
            workspace_id: admin.workspace_id,
            custom_role_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// The user's company, or `NoTenant` for an unscoped account.
    pub fn require_company(&self) -> DomainResult<CompanyId> {
        self.company_id.ok_or(DomainError::NoTenant)
    }

    pub fn is_scoped(&self) -> bool {
        self.company_id.is_some()
    }

    /// Move an unscoped account into a freshly created company.
    pub fn attach_company(
        &mut self,
        company: &Company,
        workspace: &Workspace,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.company_id.is_some() {
            return Err(DomainError::AlreadyHasTenant);
        }
        if workspace.company_id != company.id {
            return Err(DomainError::validation("workspace belongs to a different company"));
        }
        self.company_id = Some(company.id);
        self.workspace_id = Some(workspace.id);
        self.updated_at = now;
        Ok(())
    }

    /// Apply an admin's profile edit. Tenant checks on the role happen before this.
    pub fn apply_profile(&mut self, update: ProfileUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        self.first_name = required("first name", &update.first_name)?;
        self.last_name = required("last name", &update.last_name)?;
        self.email = validate_email(&update.email)?;
        self.custom_role_id = update.custom_role_id;
        self.updated_at = now;
        Ok(())
    }

    pub fn assign_custom_role(&mut self, role: Option<RoleId>, now: DateTime<Utc>) {
        self.custom_role_id = role;
        self.updated_at = now;
    }

    pub fn set_password_hash(&mut self, hash: String, now: DateTime<Utc>) {
        self.password_hash = hash;
        self.updated_at = now;
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

/// Light shape check. Case is preserved: uniqueness is case-sensitive as stored.
pub fn validate_email(email: &str) -> DomainResult<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email.to_string())
        }
        _ => Err(DomainError::validation(format!("'{email}' is not a valid email address"))),
    }
}
