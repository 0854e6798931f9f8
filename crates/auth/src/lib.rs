//! `fablab-auth`: token verification and role-based authorization.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
