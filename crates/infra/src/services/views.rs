//! Read-side projections handed to callers. None of them carry password hashes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use vocalyx_auth::{BasicRole, Company, CustomRole, User};
use vocalyx_core::{CompanyId, PermissionId, RoleId, UserId, WorkspaceId};

use super::error::ServiceResult;
use crate::directory::Directory;

/// Every stored account is active; there is no suspension.
pub const ACTIVE_STATUS: &str = "Active";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: BasicRole,
    pub company_id: Option<CompanyId>,
    pub company_name: Option<String>,
    pub workspace_id: Option<WorkspaceId>,
    pub custom_role_id: Option<RoleId>,
    pub custom_role_name: Option<String>,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
}

impl UserView {
    pub fn new(user: &User, company: Option<&Company>, role: Option<&CustomRole>) -> Self {
        let company = company.filter(|c| user.company_id == Some(c.id));
        let role = role.filter(|r| user.custom_role_id == Some(r.id));
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            company_id: user.company_id,
            company_name: company.map(|c| c.name.clone()),
            workspace_id: user.workspace_id,
            custom_role_id: user.custom_role_id,
            custom_role_name: role.map(|r| r.name.clone()),
            status: ACTIVE_STATUS,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionView {
    pub id: PermissionId,
    pub permission_name: String,
    pub has_access: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    pub id: RoleId,
    pub role_name: String,
    pub description: Option<String>,
    pub company_id: CompanyId,
    pub permissions: Vec<PermissionView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&CustomRole> for RoleView {
    fn from(role: &CustomRole) -> Self {
        Self {
            id: role.id,
            role_name: role.name.clone(),
            description: role.description.clone(),
            company_id: role.company_id,
            permissions: role
                .permissions
                .iter()
                .map(|p| PermissionView {
                    id: p.id,
                    permission_name: p.name.to_string(),
                    has_access: p.granted,
                })
                .collect(),
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

/// Resolve the company and role names shown on a single profile.
pub(crate) async fn user_view<D: Directory + ?Sized>(directory: &D, user: &User) -> ServiceResult<UserView> {
    let company = match user.company_id {
        Some(id) => directory.company(id).await?,
        None => None,
    };
    let role = match user.custom_role_id {
        Some(id) => directory.role(id).await?,
        None => None,
    };
    Ok(UserView::new(user, company.as_ref(), role.as_ref()))
}

/// Profiles of one company, resolving role names with a single role lookup.
pub(crate) async fn company_user_views<D: Directory + ?Sized>(
    directory: &D,
    company: &Company,
    users: &[User],
) -> ServiceResult<Vec<UserView>> {
    let roles: HashMap<RoleId, CustomRole> = directory
        .roles_in_company(company.id)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    Ok(users
        .iter()
        .map(|u| {
            let role = u.custom_role_id.and_then(|id| roles.get(&id));
            UserView::new(u, Some(company), role)
        })
        .collect())
}
