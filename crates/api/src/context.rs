use vocalyx_auth::{Principal, SessionClaims};
use vocalyx_core::UserId;

/// Authenticated caller for a request, resolved from verified session claims.
///
/// Operations only take the user id from here; tenant scope is re-read from
/// the store, so stale company/role claims never widen access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
    claims: SessionClaims,
}

impl PrincipalContext {
    pub fn new(claims: SessionClaims) -> Self {
        Self {
            principal: Principal::from_claims(&claims),
            claims,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}
