use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vocalyx_core::{CompanyId, RoleId, UserId, WorkspaceId};

use crate::permissions::PermissionSet;
use crate::roles::{BasicRole, CustomRole};
use crate::tenant::Company;
use crate::user::User;

/// Claims embedded in a session token.
///
/// `sub` is the account email. Company and custom-role claims are omitted
/// (not nulled) when the user has none; `permissions` is always present and
/// empty without a custom role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub sub: String,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub role: BasicRole,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<WorkspaceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_role_id: Option<RoleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_role_name: Option<String>,

    #[serde(default)]
    pub permissions: PermissionSet,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Everything a session is minted from, as loaded at issuance time.
#[derive(Debug, Clone, Copy)]
pub struct SessionSubject<'a> {
    pub user: &'a User,
    pub company: Option<&'a Company>,
    pub custom_role: Option<&'a CustomRole>,
}

impl SessionClaims {
    /// Resolve claims for `subject`.
    ///
    /// A company or role that does not match the user's own references is
    /// ignored, so a stale lookup degrades to omitted claims.
    pub fn for_subject(subject: SessionSubject<'_>, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let user = subject.user;
        let company = subject
            .company
            .filter(|c| user.company_id == Some(c.id));
        let role = subject
            .custom_role
            .filter(|r| user.custom_role_id == Some(r.id));

        Self {
            sub: user.email.clone(),
            user_id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            workspace_id: user.workspace_id,
            company_id: company.map(|c| c.id),
            company_name: company.map(|c| c.name.clone()),
            custom_role_id: role.map(|r| r.id),
            custom_role_name: role.map(|r| r.name.clone()),
            permissions: role.map(CustomRole::permission_set).unwrap_or_default(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Tolerated clock drift when checking `iat`.
const IAT_LEEWAY_SECS: i64 = 60;

/// Deterministically validate the time window of decoded claims.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now + IAT_LEEWAY_SECS < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionName;
    use crate::roles::{NewRole, PermissionGrant};
    use crate::tenant::NewCompany;
    use crate::user::Registration;

    fn scoped_user() -> (User, Company) {
        let now = Utc::now();
        let mut user = User::register(
            Registration {
                first_name: "Bob".into(),
                last_name: "Builder".into(),
                email: "bob@acme.com".into(),
                password_hash: "h".into(),
            },
            now,
        )
        .unwrap();
        let (company, workspace) = Company::establish(
            NewCompany {
                name: "Acme".into(),
                industry: None,
                address: None,
            },
            user.id,
            now,
        )
        .unwrap();
        user.attach_company(&company, &workspace, now).unwrap();
        (user, company)
    }

    fn sales_rep(company: CompanyId) -> CustomRole {
        CustomRole::define(
            company,
            NewRole {
                name: "Sales Rep".into(),
                description: None,
                permissions: vec![PermissionGrant {
                    name: PermissionName::new("view_orders").unwrap(),
                    granted: true,
                }],
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn claims_carry_role_and_permissions() {
        let (mut user, company) = scoped_user();
        let role = sales_rep(company.id);
        user.custom_role_id = Some(role.id);

        let claims = SessionClaims::for_subject(
            SessionSubject {
                user: &user,
                company: Some(&company),
                custom_role: Some(&role),
            },
            Utc::now(),
            Duration::hours(24),
        );

        assert_eq!(claims.sub, "bob@acme.com");
        assert_eq!(claims.company_name.as_deref(), Some("Acme"));
        assert_eq!(claims.custom_role_name.as_deref(), Some("Sales Rep"));
        assert_eq!(claims.permissions, role.permission_set());
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn missing_tenant_and_role_are_omitted_not_null() {
        let (mut user, _) = scoped_user();
        user.company_id = None;
        user.workspace_id = None;

        let claims = SessionClaims::for_subject(
            SessionSubject {
                user: &user,
                company: None,
                custom_role: None,
            },
            Utc::now(),
            Duration::hours(1),
        );
        let json = serde_json::to_value(&claims).unwrap();

        assert!(json.get("companyId").is_none());
        assert!(json.get("customRoleName").is_none());
        assert!(json.get("workspaceId").is_none());
        assert_eq!(json["permissions"], serde_json::json!({}));
        assert_eq!(json["role"], "ADMIN");
        assert!(json.get("userId").is_some());
    }

    #[test]
    fn role_not_assigned_to_user_is_ignored() {
        let (user, company) = scoped_user();
        let role = sales_rep(company.id);

        let claims = SessionClaims::for_subject(
            SessionSubject {
                user: &user,
                company: Some(&company),
                custom_role: Some(&role),
            },
            Utc::now(),
            Duration::hours(1),
        );
        assert_eq!(claims.custom_role_id, None);
        assert!(claims.permissions.is_empty());
    }

    #[test]
    fn time_window_checks() {
        let (user, _) = scoped_user();
        let now = Utc::now();
        let subject = SessionSubject {
            user: &user,
            company: None,
            custom_role: None,
        };
        let claims = SessionClaims::for_subject(subject, now, Duration::minutes(5));

        assert_eq!(validate_claims(&claims, now), Ok(()));
        assert_eq!(
            validate_claims(&claims, now + Duration::minutes(5)),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims, now - Duration::minutes(10)),
            Err(TokenValidationError::NotYetValid)
        );

        let broken = SessionClaims { exp: claims.iat, ..claims };
        assert_eq!(
            validate_claims(&broken, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
