//! `vocalyx-auth`: pure authorization core (tenants, users, custom roles, sessions).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod error;
pub mod password;
pub mod permissions;
pub mod reset;
pub mod roles;
pub mod session;
pub mod tenant;
pub mod user;

pub use authorize::{PermissionCheck, Principal, TenantScoped, ensure_same_company};
pub use claims::{SessionClaims, SessionSubject, TokenValidationError, validate_claims};
pub use error::AuthError;
pub use password::PasswordHasher;
pub use permissions::{PermissionName, PermissionSet};
pub use reset::{DEFAULT_RESET_TTL_SECS, PasswordResetToken};
pub use roles::{BasicRole, CustomRole, NewRole, PermissionGrant, RolePermission};
pub use session::SessionIssuer;
pub use tenant::{Company, NewCompany, Workspace};
pub use user::{ProfileUpdate, Registration, User};
