//! In-memory directory for tests/dev.
//!
//! All tables sit behind one lock, so each grouped write is applied under a
//! single write guard and is never observed half-done.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vocalyx_auth::{Company, CustomRole, PasswordResetToken, User, Workspace};
use vocalyx_core::{CompanyId, Entity, RoleId, UserId, WorkspaceId};

use super::store::{CompanyAttach, Directory, RoleDeletion, StoreError, UniqueKey};

#[derive(Debug, Default)]
struct Tables {
    companies: HashMap<CompanyId, Company>,
    workspaces: HashMap<WorkspaceId, Workspace>,
    users: HashMap<UserId, User>,
    roles: HashMap<RoleId, CustomRole>,
    reset_tokens: HashMap<String, PasswordResetToken>,
}

fn put<E: Entity>(table: &mut HashMap<E::Id, E>, record: E) {
    table.insert(record.id(), record);
}

fn sorted_by<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(|row| key(row));
    rows
}

impl Tables {
    fn email_owner(&self, email: &str) -> Option<UserId> {
        self.users.values().find(|u| u.email == email).map(|u| u.id)
    }

    fn check_references(&self, user: &User) -> Result<(), StoreError> {
        if let Some(company) = user.company_id {
            if !self.companies.contains_key(&company) {
                return Err(StoreError::MissingReference("company"));
            }
        }
        self.check_role(user.custom_role_id)
    }

    fn check_role(&self, role: Option<RoleId>) -> Result<(), StoreError> {
        match role {
            Some(role) if !self.roles.contains_key(&role) => Err(StoreError::MissingReference("role")),
            _ => Ok(()),
        }
    }
}

/// In-memory [`Directory`].
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tables: RwLock<Tables>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(self.read()?.companies.get(&id).cloned())
    }

    async fn establish_company(
        &self,
        owner: &User,
        company: &Company,
        workspace: &Workspace,
    ) -> Result<CompanyAttach, StoreError> {
        let mut tables = self.write()?;
        match tables.users.get(&owner.id) {
            None => return Ok(CompanyAttach::MissingUser),
            Some(stored) if stored.company_id.is_some() => return Ok(CompanyAttach::AlreadyScoped),
            Some(_) => {}
        }

        put(&mut tables.companies, company.clone());
        put(&mut tables.workspaces, workspace.clone());
        if let Some(stored) = tables.users.get_mut(&owner.id) {
            stored.company_id = Some(company.id);
            stored.workspace_id = Some(workspace.id);
            stored.updated_at = owner.updated_at;
        }
        Ok(CompanyAttach::Attached)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .email_owner(email)
            .and_then(|id| tables.users.get(&id))
            .cloned())
    }

    async fn users_in_company(&self, company: CompanyId) -> Result<Vec<User>, StoreError> {
        let tables = self.read()?;
        let users = tables
            .users
            .values()
            .filter(|u| u.company_id == Some(company))
            .cloned()
            .collect();
        Ok(sorted_by(users, |u: &User| (u.created_at, u.id)))
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(UniqueKey::Other));
        }
        if tables.email_owner(&user.email).is_some() {
            return Err(StoreError::Duplicate(UniqueKey::Email));
        }
        tables.check_references(user)?;
        put(&mut tables.users, user.clone());
        Ok(())
    }

    async fn update_profile(&self, user: &User) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user.id) {
            return Ok(false);
        }
        if matches!(tables.email_owner(&user.email), Some(owner) if owner != user.id) {
            return Err(StoreError::Duplicate(UniqueKey::Email));
        }
        tables.check_role(user.custom_role_id)?;
        let Some(stored) = tables.users.get_mut(&user.id) else {
            return Ok(false);
        };
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.email = user.email.clone();
        stored.custom_role_id = user.custom_role_id;
        stored.updated_at = user.updated_at;
        Ok(true)
    }

    async fn set_custom_role(
        &self,
        user: UserId,
        role: Option<RoleId>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user) {
            return Ok(false);
        }
        tables.check_role(role)?;
        let Some(stored) = tables.users.get_mut(&user) else {
            return Ok(false);
        };
        stored.assign_custom_role(role, at);
        Ok(true)
    }

    async fn set_password_hash(
        &self,
        user: UserId,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let Some(stored) = tables.users.get_mut(&user) else {
            return Ok(false);
        };
        stored.set_password_hash(password_hash.to_string(), at);
        Ok(true)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let removed = tables.users.remove(&id).is_some();
        if removed {
            tables.reset_tokens.retain(|_, t| t.user_id != id);
        }
        Ok(removed)
    }

    async fn role(&self, id: RoleId) -> Result<Option<CustomRole>, StoreError> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    async fn roles_in_company(&self, company: CompanyId) -> Result<Vec<CustomRole>, StoreError> {
        let tables = self.read()?;
        let roles = tables
            .roles
            .values()
            .filter(|r| r.company_id == company)
            .cloned()
            .collect();
        Ok(sorted_by(roles, |r: &CustomRole| (r.created_at, r.id)))
    }

    async fn role_name_taken(&self, company: CompanyId, name: &str) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .roles
            .values()
            .any(|r| r.company_id == company && r.name == name))
    }

    async fn insert_role(&self, role: &CustomRole) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.companies.contains_key(&role.company_id) {
            return Err(StoreError::MissingReference("company"));
        }
        if tables.roles.contains_key(&role.id) {
            return Err(StoreError::Duplicate(UniqueKey::Other));
        }
        if tables
            .roles
            .values()
            .any(|r| r.company_id == role.company_id && r.name == role.name)
        {
            return Err(StoreError::Duplicate(UniqueKey::RoleName));
        }
        put(&mut tables.roles, role.clone());
        Ok(())
    }

    async fn delete_role(&self, id: RoleId) -> Result<RoleDeletion, StoreError> {
        let mut tables = self.write()?;
        if !tables.roles.contains_key(&id) {
            return Ok(RoleDeletion::Missing);
        }
        if tables.users.values().any(|u| u.custom_role_id == Some(id)) {
            return Ok(RoleDeletion::InUse);
        }
        // Permission rows are embedded in the role, so they leave with it.
        tables.roles.remove(&id);
        Ok(RoleDeletion::Deleted)
    }

    async fn issue_reset_token(&self, token: &PasswordResetToken) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&token.user_id) {
            return Err(StoreError::MissingReference("user"));
        }
        if tables.reset_tokens.contains_key(&token.token) {
            return Err(StoreError::Duplicate(UniqueKey::ResetToken));
        }
        for prior in tables
            .reset_tokens
            .values_mut()
            .filter(|t| t.user_id == token.user_id && !t.used)
        {
            prior.used = true;
        }
        tables.reset_tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>, StoreError> {
        Ok(self.read()?.reset_tokens.get(token).cloned())
    }

    async fn complete_password_reset(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let user_id = match tables.reset_tokens.get(token) {
            Some(t) if t.is_usable(now) => t.user_id,
            _ => return Ok(false),
        };
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Err(StoreError::MissingReference("user"));
        };
        user.set_password_hash(password_hash.to_string(), now);
        if let Some(t) = tables.reset_tokens.get_mut(token) {
            t.used = true;
        }
        Ok(true)
    }
}
