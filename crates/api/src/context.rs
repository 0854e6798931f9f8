use fablab_auth::{JwtClaims, Role};
use fablab_core::UserId;

/// Principal context for a request (authenticated identity + role).
///
/// Derived from verified token claims by the auth middleware; immutable for the
/// rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    email: String,
    role: Role,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, email: String, role: Role) -> Self {
        Self { user_id, email, role }
    }

    pub fn from_claims(claims: JwtClaims) -> Self {
        Self::new(claims.sub, claims.email, claims.role)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }
}
