use serde::Serialize;

use vocalyx_core::{CompanyId, DomainError, DomainResult, RoleId, UserId, WorkspaceId};

use crate::claims::SessionClaims;
use crate::permissions::PermissionSet;
use crate::roles::{BasicRole, CustomRole};
use crate::user::User;

/// Anything that lives inside a company.
pub trait TenantScoped {
    /// Owning company; `None` for records not yet scoped.
    fn company_id(&self) -> Option<CompanyId>;
}

impl TenantScoped for User {
    fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }
}

impl TenantScoped for CustomRole {
    fn company_id(&self) -> Option<CompanyId> {
        Some(self.company_id)
    }
}

/// Tenant guard: the entity must belong to the actor's company.
///
/// An unscoped entity never matches a company.
pub fn ensure_same_company<T: TenantScoped + ?Sized>(
    actor_company: CompanyId,
    entity: &T,
) -> DomainResult<()> {
    if entity.company_id() == Some(actor_company) {
        Ok(())
    } else {
        Err(DomainError::CrossTenantAccess)
    }
}

/// Caller identity as resolved from verified session claims.
///
/// No store lookup is involved, so the view is as of token issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: BasicRole,
    pub company_id: Option<CompanyId>,
    pub workspace_id: Option<WorkspaceId>,
    pub custom_role_id: Option<RoleId>,
    pub permissions: PermissionSet,
}

impl Principal {
    pub fn from_claims(claims: &SessionClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.sub.clone(),
            role: claims.role,
            company_id: claims.company_id,
            workspace_id: claims.workspace_id,
            custom_role_id: claims.custom_role_id,
            permissions: claims.permissions.clone(),
        }
    }

    /// Advisory lookup: nothing in the backend gates on this answer.
    pub fn check(&self, permission: &str) -> PermissionCheck {
        PermissionCheck {
            permission: permission.to_string(),
            granted: self.permissions.is_granted(permission),
            defined: self.permissions.get(permission).is_some(),
        }
    }
}

/// Result of an advisory permission lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionCheck {
    pub permission: String,
    pub granted: bool,
    /// Whether the caller's role mentions the permission at all.
    pub defined: bool,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::permissions::PermissionName;
    use crate::roles::NewRole;
    use crate::user::Registration;

    fn user(company: Option<CompanyId>) -> User {
        let mut u = User::register(
            Registration {
                first_name: "A".into(),
                last_name: "B".into(),
                email: "a@b.c".into(),
                password_hash: "h".into(),
            },
            Utc::now(),
        )
        .unwrap();
        u.company_id = company;
        u
    }

    #[test]
    fn same_company_passes() {
        let c = CompanyId::new();
        assert!(ensure_same_company(c, &user(Some(c))).is_ok());
    }

    #[test]
    fn other_or_missing_company_is_cross_tenant() {
        let c = CompanyId::new();
        assert_eq!(
            ensure_same_company(c, &user(Some(CompanyId::new()))),
            Err(DomainError::CrossTenantAccess)
        );
        assert_eq!(ensure_same_company(c, &user(None)), Err(DomainError::CrossTenantAccess));
    }

    #[test]
    fn roles_are_checked_by_owner() {
        let c = CompanyId::new();
        let role = CustomRole::define(
            CompanyId::new(),
            NewRole {
                name: "r".into(),
                description: None,
                permissions: vec![],
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ensure_same_company(c, &role), Err(DomainError::CrossTenantAccess));
        assert!(ensure_same_company(role.company_id, &role).is_ok());
    }

    #[test]
    fn check_distinguishes_denied_from_undefined() {
        let principal = Principal {
            user_id: UserId::new(),
            email: "bob@acme.com".into(),
            role: BasicRole::User,
            company_id: None,
            workspace_id: None,
            custom_role_id: None,
            permissions: PermissionSet::from_entries([(
                PermissionName::new("edit_orders").unwrap(),
                false,
            )]),
        };

        let denied = principal.check("edit_orders");
        assert!(!denied.granted && denied.defined);

        let unknown = principal.check("view_orders");
        assert!(!unknown.granted && !unknown.defined);
    }
}
