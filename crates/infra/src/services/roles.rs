//! Custom role management and assignment.

use chrono::Utc;
use tracing::info;

use vocalyx_auth::{CustomRole, NewRole, ensure_same_company};
use vocalyx_core::{DomainError, RoleId, UserId};

use super::error::ServiceResult;
use super::views::{UserView, user_view};
use super::{scoped_admin, target_user};
use crate::directory::{Directory, RoleDeletion};

/// Company-scoped role operations.
///
/// Permission flags are stored and handed out, never enforced here.
#[derive(Debug, Clone)]
pub struct RoleService<D> {
    directory: D,
}

impl<D: Directory> RoleService<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Define a role with its permission flags in the admin's company.
    pub async fn create_role(&self, admin_id: UserId, input: NewRole) -> ServiceResult<CustomRole> {
        let (admin, company_id) = scoped_admin(&self.directory, admin_id).await?;
        let role = CustomRole::define(company_id, input, Utc::now())?;

        if self.directory.role_name_taken(company_id, &role.name).await? {
            return Err(DomainError::DuplicateRole.into());
        }
        // A concurrent insert of the same name still surfaces as DuplicateRole.
        self.directory.insert_role(&role).await?;

        info!(
            role_id = %role.id,
            company_id = %company_id,
            admin_id = %admin.id,
            permission_count = role.permissions.len(),
            "custom role created"
        );
        Ok(role)
    }

    /// All roles of the admin's company, permissions included.
    pub async fn list_roles(&self, admin_id: UserId) -> ServiceResult<Vec<CustomRole>> {
        let (_, company_id) = scoped_admin(&self.directory, admin_id).await?;
        Ok(self.directory.roles_in_company(company_id).await?)
    }

    /// Remove an unassigned role and its permissions.
    pub async fn delete_role(&self, admin_id: UserId, role_id: RoleId) -> ServiceResult<()> {
        let (admin, company_id) = scoped_admin(&self.directory, admin_id).await?;
        let role = self
            .directory
            .role(role_id)
            .await?
            .ok_or(DomainError::not_found("role"))?;
        ensure_same_company(company_id, &role)?;

        match self.directory.delete_role(role_id).await? {
            RoleDeletion::Deleted => {
                info!(role_id = %role_id, admin_id = %admin.id, "custom role deleted");
                Ok(())
            }
            RoleDeletion::InUse => Err(DomainError::RoleInUse.into()),
            RoleDeletion::Missing => Err(DomainError::not_found("role").into()),
        }
    }

    /// Set (or with `None`, clear) a user's custom role.
    pub async fn assign_role(
        &self,
        admin_id: UserId,
        target_id: UserId,
        role_id: Option<RoleId>,
    ) -> ServiceResult<UserView> {
        let (admin, company_id) = scoped_admin(&self.directory, admin_id).await?;
        let mut target = target_user(&self.directory, target_id).await?;
        ensure_same_company(company_id, &target)?;

        if let Some(role_id) = role_id {
            let role = self
                .directory
                .role(role_id)
                .await?
                .ok_or(DomainError::not_found("role"))?;
            ensure_same_company(company_id, &role)?;
        }

        target.assign_custom_role(role_id, Utc::now());
        if !self
            .directory
            .set_custom_role(target.id, role_id, target.updated_at)
            .await?
        {
            return Err(DomainError::not_found("user").into());
        }

        match role_id {
            Some(role_id) => info!(user_id = %target.id, role_id = %role_id, admin_id = %admin.id, "custom role assigned"),
            None => info!(user_id = %target.id, admin_id = %admin.id, "custom role cleared"),
        }
        user_view(&self.directory, &target).await
    }
}
