//! Postgres-backed directory.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate(key)`, key derived from the constraint name |
//! | Database (foreign key violation) | `23503` | `MissingReference(table)` |
//! | Database (connection / serialization class) | `08xxx`, `40001`, `40P01`, `57P01` | `Unavailable` |
//! | Database (other) | any other | `Internal` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` |
//! | Decode / ColumnDecode / ColumnNotFound | N/A | `Corrupt` |
//! | Other | N/A | `Internal` |
//!
//! Grouped writes (company + workspace + owner, role + permissions, role
//! deletion, reset token rotation, reset completion) each run in one
//! transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;
use uuid::Uuid;

use vocalyx_auth::{
    BasicRole, Company, CustomRole, PasswordResetToken, PermissionName, RolePermission, User,
    Workspace,
};
use vocalyx_core::{CompanyId, PermissionId, RoleId, UserId, WorkspaceId};

use super::store::{CompanyAttach, Directory, RoleDeletion, StoreError, UniqueKey};

const SCHEMA: &str = include_str!("schema.sql");

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, role, \
     company_id, workspace_id, custom_role_id, created_at, updated_at";

/// Roles joined with their permission rows, so a role and its permissions
/// always come from the same snapshot.
const ROLE_SELECT: &str = "SELECT r.id, r.company_id, r.role_name, r.description, r.created_at, r.updated_at, \
     p.id AS permission_id, p.permission_name, p.granted, p.created_at AS permission_created_at \
     FROM custom_roles r LEFT JOIN role_permissions p ON p.role_id = r.id";

const ROLE_ORDER: &str = "ORDER BY r.created_at ASC, r.id ASC, p.position ASC";

/// Postgres-backed [`Directory`].
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: Arc<PgPool>,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and return a directory (schema is not touched).
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }
}

#[async_trait]
impl Directory for PostgresDirectory {
    #[instrument(skip(self), fields(company_id = %id), err)]
    async fn company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, industry, address, created_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("company", e))?;

        row.as_ref().map(company_from_row).transpose()
    }

    #[instrument(
        skip(self, owner, company, workspace),
        fields(user_id = %owner.id, company_id = %company.id, workspace_id = %workspace.id),
        err
    )]
    async fn establish_company(
        &self,
        owner: &User,
        company: &Company,
        workspace: &Workspace,
    ) -> Result<CompanyAttach, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current = sqlx::query("SELECT company_id FROM users WHERE id = $1 FOR UPDATE")
            .bind(owner.id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("establish_company", e))?;

        match current {
            None => return Ok(CompanyAttach::MissingUser),
            Some(row) => {
                let existing: Option<Uuid> = row.try_get("company_id").map_err(corrupt)?;
                if existing.is_some() {
                    return Ok(CompanyAttach::AlreadyScoped);
                }
            }
        }

        sqlx::query(
            r#"
            INSERT INTO companies (id, name, industry, address, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(company.id.as_uuid())
        .bind(&company.name)
        .bind(&company.industry)
        .bind(&company.address)
        .bind(company.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_company", e))?;

        sqlx::query(
            r#"
            INSERT INTO workspaces (id, company_id, name, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(workspace.id.as_uuid())
        .bind(workspace.company_id.as_uuid())
        .bind(&workspace.name)
        .bind(workspace.owner_id.as_uuid())
        .bind(workspace.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_workspace", e))?;

        sqlx::query(
            r#"
            UPDATE users
            SET company_id = $2, workspace_id = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(owner.id.as_uuid())
        .bind(company.id.as_uuid())
        .bind(workspace.id.as_uuid())
        .bind(owner.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("attach_company", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(CompanyAttach::Attached)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, email), err)]
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_email", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(company_id = %company), err)]
    async fn users_in_company(&self, company: CompanyId) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE company_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(company.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("users_in_company", e))?;

        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, password_hash, role,
                company_id, workspace_id, custom_role_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.company_id.map(Uuid::from))
        .bind(user.workspace_id.map(Uuid::from))
        .bind(user.custom_role_id.map(Uuid::from))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_profile(&self, user: &User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2,
                last_name = $3,
                email = $4,
                custom_role_id = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.custom_role_id.map(Uuid::from))
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_profile", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %user), err)]
    async fn set_custom_role(
        &self,
        user: UserId,
        role: Option<RoleId>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET custom_role_id = $2, updated_at = $3 WHERE id = $1")
            .bind(user.as_uuid())
            .bind(role.map(Uuid::from))
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_custom_role", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, password_hash), fields(user_id = %user), err)]
    async fn set_password_hash(
        &self,
        user: UserId,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(user.as_uuid())
            .bind(password_hash)
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_password_hash", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn role(&self, id: RoleId) -> Result<Option<CustomRole>, StoreError> {
        let rows = sqlx::query(&format!("{ROLE_SELECT} WHERE r.id = $1 {ROLE_ORDER}"))
            .bind(id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("role", e))?;

        Ok(roles_from_rows(&rows)?.into_iter().next())
    }

    #[instrument(skip(self), fields(company_id = %company), err)]
    async fn roles_in_company(&self, company: CompanyId) -> Result<Vec<CustomRole>, StoreError> {
        let rows = sqlx::query(&format!("{ROLE_SELECT} WHERE r.company_id = $1 {ROLE_ORDER}"))
            .bind(company.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("roles_in_company", e))?;

        roles_from_rows(&rows)
    }

    #[instrument(skip(self), fields(company_id = %company), err)]
    async fn role_name_taken(&self, company: CompanyId, name: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM custom_roles WHERE company_id = $1 AND role_name = $2
            ) AS taken
            "#,
        )
        .bind(company.as_uuid())
        .bind(name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("role_name_taken", e))?;

        row.try_get("taken").map_err(corrupt)
    }

    #[instrument(
        skip(self, role),
        fields(role_id = %role.id, company_id = %role.company_id, permission_count = role.permissions.len()),
        err
    )]
    async fn insert_role(&self, role: &CustomRole) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO custom_roles (id, company_id, role_name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.company_id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_role", e))?;

        for (position, permission) in role.permissions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (id, role_id, permission_name, granted, position, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(permission.id.as_uuid())
            .bind(role.id.as_uuid())
            .bind(permission.name.as_str())
            .bind(permission.granted)
            .bind(position as i32)
            .bind(permission.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_role_permission", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn delete_role(&self, id: RoleId) -> Result<RoleDeletion, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let exists = sqlx::query("SELECT id FROM custom_roles WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        if exists.is_none() {
            return Ok(RoleDeletion::Missing);
        }

        let in_use = sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE custom_role_id = $1) AS in_use")
            .bind(id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        if in_use.try_get::<bool, _>("in_use").map_err(corrupt)? {
            return Ok(RoleDeletion::InUse);
        }

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role_permissions", e))?;

        let deleted = sqlx::query("DELETE FROM custom_roles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e));
        match deleted {
            Ok(_) => {}
            // A user was assigned concurrently; the FK keeps the role alive.
            Err(StoreError::MissingReference(_)) => return Ok(RoleDeletion::InUse),
            Err(e) => return Err(e),
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(RoleDeletion::Deleted)
    }

    #[instrument(skip(self, token), fields(user_id = %token.user_id), err)]
    async fn issue_reset_token(&self, token: &PasswordResetToken) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE user_id = $1 AND used = FALSE")
            .bind(token.user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("invalidate_reset_tokens", e))?;

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (token, user_id, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id.as_uuid())
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_reset_token", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    #[instrument(skip(self, token), err)]
    async fn reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT token, user_id, expires_at, used, created_at
            FROM password_reset_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reset_token", e))?;

        row.as_ref().map(reset_token_from_row).transpose()
    }

    #[instrument(skip(self, token, password_hash), err)]
    async fn complete_password_reset(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let consumed = sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET used = TRUE
            WHERE token = $1 AND used = FALSE AND expires_at > $2
            RETURNING user_id
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("consume_reset_token", e))?;

        let Some(row) = consumed else {
            return Ok(false);
        };
        let user_id: Uuid = row.try_get("user_id").map_err(corrupt)?;

        let updated = sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("store_password_hash", e))?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::MissingReference("user"));
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(true)
    }
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn company_from_row(row: &PgRow) -> Result<Company, StoreError> {
    Ok(Company {
        id: CompanyId::from_uuid(row.try_get("id").map_err(corrupt)?),
        name: row.try_get("name").map_err(corrupt)?,
        industry: row.try_get("industry").map_err(corrupt)?,
        address: row.try_get("address").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role").map_err(corrupt)?;
    let company_id: Option<Uuid> = row.try_get("company_id").map_err(corrupt)?;
    let workspace_id: Option<Uuid> = row.try_get("workspace_id").map_err(corrupt)?;
    let custom_role_id: Option<Uuid> = row.try_get("custom_role_id").map_err(corrupt)?;

    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(corrupt)?),
        first_name: row.try_get("first_name").map_err(corrupt)?,
        last_name: row.try_get("last_name").map_err(corrupt)?,
        email: row.try_get("email").map_err(corrupt)?,
        password_hash: row.try_get("password_hash").map_err(corrupt)?,
        role: role
            .parse::<BasicRole>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        company_id: company_id.map(CompanyId::from_uuid),
        workspace_id: workspace_id.map(WorkspaceId::from_uuid),
        custom_role_id: custom_role_id.map(RoleId::from_uuid),
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

fn role_from_row(row: &PgRow) -> Result<CustomRole, StoreError> {
    Ok(CustomRole {
        id: RoleId::from_uuid(row.try_get("id").map_err(corrupt)?),
        company_id: CompanyId::from_uuid(row.try_get("company_id").map_err(corrupt)?),
        name: row.try_get("role_name").map_err(corrupt)?,
        description: row.try_get("description").map_err(corrupt)?,
        permissions: Vec::new(),
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

fn roles_from_rows(rows: &[PgRow]) -> Result<Vec<CustomRole>, StoreError> {
    let joined = rows
        .iter()
        .map(|row| {
            let role = role_from_row(row)?;
            let permission = permission_from_row(row, role.id)?;
            Ok((role, permission))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(group_joined_roles(joined))
}

/// Fold joined rows (one per permission, or one with no permission) into
/// roles. Rows of one role are adjacent; order is kept.
fn group_joined_roles<I>(rows: I) -> Vec<CustomRole>
where
    I: IntoIterator<Item = (CustomRole, Option<RolePermission>)>,
{
    let mut roles: Vec<CustomRole> = Vec::new();
    for (role, permission) in rows {
        if roles.last().map(|r| r.id) != Some(role.id) {
            roles.push(role);
        }
        if let (Some(permission), Some(current)) = (permission, roles.last_mut()) {
            current.permissions.push(permission);
        }
    }
    roles
}

fn permission_from_row(row: &PgRow, role_id: RoleId) -> Result<Option<RolePermission>, StoreError> {
    let Some(id) = row.try_get::<Option<Uuid>, _>("permission_id").map_err(corrupt)? else {
        return Ok(None);
    };
    let name: String = row.try_get("permission_name").map_err(corrupt)?;
    Ok(Some(RolePermission {
        id: PermissionId::from_uuid(id),
        role_id,
        name: PermissionName::new(name).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        granted: row.try_get("granted").map_err(corrupt)?,
        created_at: row.try_get("permission_created_at").map_err(corrupt)?,
    }))
}

fn reset_token_from_row(row: &PgRow) -> Result<PasswordResetToken, StoreError> {
    Ok(PasswordResetToken {
        token: row.try_get("token").map_err(corrupt)?,
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(corrupt)?),
        expires_at: row.try_get("expires_at").map_err(corrupt)?,
        used: row.try_get("used").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

fn unique_key(constraint: Option<&str>) -> UniqueKey {
    match constraint {
        Some("users_email_unique") => UniqueKey::Email,
        Some("custom_roles_company_name_unique") => UniqueKey::RoleName,
        Some("password_reset_tokens_token_unique") => UniqueKey::ResetToken,
        _ => UniqueKey::Other,
    }
}

fn referenced_table(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_custom_role_fk") => "role",
        Some("users_company_fk") => "company",
        Some("users_workspace_fk") => "workspace",
        Some(name) if name.starts_with("role_permissions") => "role",
        Some(name) if name.starts_with("password_reset_tokens") => "user",
        Some(name) if name.starts_with("custom_roles") || name.starts_with("workspaces") => "company",
        _ => "record",
    }
}

/// Map SQLx errors to `StoreError`, keeping transient failures retryable.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            let code = db_err.code();
            match code.as_deref() {
                Some("23505") => StoreError::Duplicate(unique_key(db_err.constraint())),
                Some("23503") => StoreError::MissingReference(referenced_table(db_err.constraint())),
                Some(c) if c.starts_with("08") || matches!(c, "40001" | "40P01" | "57P01") => {
                    StoreError::Unavailable(msg)
                }
                _ => StoreError::Internal(msg),
            }
        }
        sqlx::Error::PoolClosed
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(format!("{} in {}", err, operation)),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => StoreError::Corrupt(format!("{} in {}", err, operation)),
        _ => StoreError::Internal(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_names_map_to_keys() {
        assert_eq!(unique_key(Some("users_email_unique")), UniqueKey::Email);
        assert_eq!(unique_key(Some("custom_roles_company_name_unique")), UniqueKey::RoleName);
        assert_eq!(unique_key(None), UniqueKey::Other);
        assert_eq!(referenced_table(Some("users_custom_role_fk")), "role");
        assert_eq!(referenced_table(Some("password_reset_tokens_user_id_fkey")), "user");
    }

    #[test]
    fn joined_rows_fold_into_roles() {
        let now = Utc::now();
        let rep = CustomRole {
            id: RoleId::new(),
            company_id: CompanyId::new(),
            name: "Sales Rep".into(),
            description: None,
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let empty = CustomRole {
            id: RoleId::new(),
            name: "Viewer".into(),
            ..rep.clone()
        };
        let grant = |name: &'static str, granted| RolePermission {
            id: PermissionId::new(),
            role_id: rep.id,
            name: PermissionName::new(name).unwrap(),
            granted,
            created_at: now,
        };

        let roles = group_joined_roles(vec![
            (rep.clone(), Some(grant("view_orders", true))),
            (rep.clone(), Some(grant("edit_orders", false))),
            (empty.clone(), None),
        ]);

        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].id, rep.id);
        assert_eq!(roles[0].permission_set().get("view_orders"), Some(true));
        assert_eq!(roles[0].permission_set().get("edit_orders"), Some(false));
        assert_eq!(roles[1].id, empty.id);
        assert!(roles[1].permissions.is_empty());
    }

    #[test]
    fn pool_failures_are_retryable() {
        assert!(map_sqlx_error("op", sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!map_sqlx_error("op", sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn schema_names_every_mapped_constraint() {
        for name in [
            "users_email_unique",
            "custom_roles_company_name_unique",
            "password_reset_tokens_token_unique",
            "users_custom_role_fk",
        ] {
            assert!(SCHEMA.contains(name), "{name}");
        }
    }
}
