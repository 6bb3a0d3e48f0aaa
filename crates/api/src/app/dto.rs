use serde::{Deserialize, Serialize};

use vocalyx_auth::{NewCompany, NewRole, PermissionGrant, PermissionName, ProfileUpdate, SessionClaims};
use vocalyx_core::{DomainError, RoleId};
use vocalyx_infra::services::{Invitation, IssuedSession, PasswordChange, SignUp};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl From<RegisterRequest> for SignUp {
    fn from(req: RegisterRequest) -> Self {
        SignUp {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub email: String,
    pub temp_password: String,
}

impl From<InviteRequest> for Invitation {
    fn from(req: InviteRequest) -> Self {
        Invitation {
            email: req.email,
            temporary_password: req.temp_password,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl From<ChangePasswordRequest> for PasswordChange {
    fn from(req: ChangePasswordRequest) -> Self {
        PasswordChange {
            current_password: req.current_password,
            new_password: req.new_password,
            confirm_password: req.confirm_password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformResetRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRequest {
    pub company_name: String,
    pub industry: Option<String>,
    pub address: Option<String>,
}

impl From<CompanyRequest> for NewCompany {
    fn from(req: CompanyRequest) -> Self {
        NewCompany {
            name: req.company_name,
            industry: req.industry,
            address: req.address,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Absent or `null` clears the custom role.
    #[serde(default)]
    pub custom_role_id: Option<String>,
}

impl UpdateUserRequest {
    pub fn into_update(self) -> Result<ProfileUpdate, DomainError> {
        Ok(ProfileUpdate {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            custom_role_id: parse_optional_role(self.custom_role_id)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub permission_name: String,
    #[serde(alias = "granted")]
    pub has_access: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub role_name: String,
    pub description: Option<String>,
    pub permissions: Vec<PermissionRequest>,
}

impl CreateRoleRequest {
    pub fn into_new_role(self) -> Result<NewRole, DomainError> {
        let permissions = self
            .permissions
            .into_iter()
            .map(|p| {
                Ok(PermissionGrant {
                    name: PermissionName::new(p.permission_name)?,
                    granted: p.has_access,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(NewRole {
            name: self.role_name,
            description: self.description,
            permissions,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    /// `null` clears the custom role.
    #[serde(default)]
    pub custom_role_id: Option<String>,
}

impl AssignRoleRequest {
    pub fn role_id(self) -> Result<Option<RoleId>, DomainError> {
        parse_optional_role(self.custom_role_id)
    }
}

fn parse_optional_role(raw: Option<String>) -> Result<Option<RoleId>, DomainError> {
    raw.map(|id| id.parse::<RoleId>()).transpose()
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: i64,
    pub claims: SessionClaims,
}

impl From<IssuedSession> for LoginResponse {
    fn from(session: IssuedSession) -> Self {
        LoginResponse {
            token: session.token,
            token_type: "Bearer",
            expires_at: session.claims.exp,
            claims: session.claims,
        }
    }
}
