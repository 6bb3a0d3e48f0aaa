use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vocalyx_core::{CompanyId, DomainError, DomainResult, Entity, PermissionId, RoleId};

use crate::permissions::{PermissionName, PermissionSet};

/// Coarse account role carried on every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BasicRole {
    Admin,
    User,
}

impl BasicRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasicRole::Admin => "ADMIN",
            BasicRole::User => "USER",
        }
    }
}

impl core::fmt::Display for BasicRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for BasicRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(BasicRole::Admin),
            "USER" => Ok(BasicRole::User),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// One named capability flag owned by a custom role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    pub id: PermissionId,
    pub role_id: RoleId,
    pub name: PermissionName,
    pub granted: bool,
    pub created_at: DateTime<Utc>,
}

/// A `(name, granted)` pair as supplied when a role is defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrant {
    pub name: PermissionName,
    pub granted: bool,
}

/// Input for defining a new custom role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<PermissionGrant>,
}

/// Company-scoped named role.
///
/// Invariants:
/// - the name is unique within the owning company (enforced by the store)
/// - every permission row points back at this role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRole {
    pub id: RoleId,
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<RolePermission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomRole {
    /// Define a role and its permission rows in one value, so they are
    /// persisted together.
    pub fn define(company_id: CompanyId, input: NewRole, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("role name cannot be empty"));
        }

        let id = RoleId::new();
        let permissions = input
            .permissions
            .into_iter()
            .map(|grant| RolePermission {
                id: PermissionId::new(),
                role_id: id,
                name: grant.name,
                granted: grant.granted,
                created_at: now,
            })
            .collect();

        Ok(Self {
            id,
            company_id,
            name: name.to_string(),
            description: input.description,
            permissions,
            created_at: now,
            updated_at: now,
        })
    }

    /// Flatten the permission rows into the mapping carried by sessions.
    pub fn permission_set(&self) -> PermissionSet {
        PermissionSet::from_entries(
            self.permissions
                .iter()
                .map(|p| (p.name.clone(), p.granted)),
        )
    }
}

impl Entity for CustomRole {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grant(name: &'static str, granted: bool) -> PermissionGrant {
        PermissionGrant {
            name: PermissionName::new(name).unwrap(),
            granted,
        }
    }

    #[test]
    fn permission_rows_belong_to_the_role() {
        let role = CustomRole::define(
            CompanyId::new(),
            NewRole {
                name: "Sales Rep".into(),
                description: None,
                permissions: vec![grant("view_orders", true), grant("edit_orders", false)],
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(role.permissions.len(), 2);
        assert!(role.permissions.iter().all(|p| p.role_id == role.id));
        assert_eq!(role.permissions[0].name.as_str(), "view_orders");
    }

    #[test]
    fn empty_permission_list_is_allowed() {
        let role = CustomRole::define(
            CompanyId::new(),
            NewRole {
                name: "Viewer".into(),
                description: Some("read only".into()),
                permissions: vec![],
            },
            Utc::now(),
        )
        .unwrap();
        assert!(role.permission_set().is_empty());
    }

    #[test]
    fn blank_role_name_is_rejected() {
        let err = CustomRole::define(
            CompanyId::new(),
            NewRole {
                name: " ".into(),
                description: None,
                permissions: vec![],
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn basic_role_uses_uppercase_wire_names() {
        assert_eq!(serde_json::to_string(&BasicRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!("USER".parse::<BasicRole>().unwrap(), BasicRole::User);
        assert!("admin".parse::<BasicRole>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

        #[test]
        fn flattened_set_matches_last_flag_per_name(
            entries in proptest::collection::vec(("[a-z_]{1,8}", any::<bool>()), 0..16)
        ) {
            let grants = entries
                .iter()
                .map(|(n, g)| PermissionGrant {
                    name: PermissionName::new(n.clone()).unwrap(),
                    granted: *g,
                })
                .collect();
            let role = CustomRole::define(
                CompanyId::new(),
                NewRole { name: "r".into(), description: None, permissions: grants },
                Utc::now(),
            )
            .unwrap();
            let set = role.permission_set();

            for (n, _) in &entries {
                let last = entries.iter().rev().find(|(m, _)| m == n).map(|(_, g)| *g);
                prop_assert_eq!(set.get(n), last);
                prop_assert_eq!(set.is_granted(n), last.unwrap_or(false));
            }
            let distinct: std::collections::BTreeSet<_> = entries.iter().map(|(n, _)| n).collect();
            prop_assert_eq!(set.len(), distinct.len());
        }
    }
}
