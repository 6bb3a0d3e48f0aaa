//! Company and workspace records: the tenant boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vocalyx_core::{CompanyId, DomainError, DomainResult, Entity, UserId, WorkspaceId};

/// Tenant record. Owns users, custom roles and workspaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Auxiliary tenant key carried on users next to the company.
///
/// Authorization never consults the workspace; the company is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub company_id: CompanyId,
    pub name: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when an admin creates their company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Company {
    /// Build a company together with its matching workspace, owned by `owner`.
    ///
    /// Nothing is persisted here; the caller writes both records (and the
    /// owner's membership) as one unit.
    pub fn establish(
        fields: NewCompany,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<(Company, Workspace)> {
        let name = fields.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("company name cannot be empty"));
        }

        let company = Company {
            id: CompanyId::new(),
            name: name.to_string(),
            industry: non_blank(fields.industry),
            address: non_blank(fields.address),
            created_at: now,
        };
        let workspace = Workspace {
            id: WorkspaceId::new(),
            company_id: company.id,
            name: company.name.clone(),
            owner_id: owner,
            created_at: now,
        };
        Ok((company, workspace))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Entity for Company {
    type Id = CompanyId;

    fn id(&self) -> CompanyId {
        self.id
    }
}

impl Entity for Workspace {
    type Id = WorkspaceId;

    fn id(&self) -> WorkspaceId {
        self.id
    }
}
