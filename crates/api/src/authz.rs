//! API-side authorization guard.
//!
//! Maps the token role onto permissions and checks them before a handler
//! touches the ledger, keeping the domain and infra crates auth-agnostic.

use fablab_auth::{AuthzError, Permission, Principal, Role, authorize};

use crate::context::PrincipalContext;

/// Check that the request principal holds `required`.
pub fn authorize_request(
    principal: &PrincipalContext,
    required: Permission,
) -> Result<(), AuthzError> {
    let role = principal.role();
    let resolved = Principal::new(principal.user_id(), role, permissions_from_role(role));
    authorize(&resolved, required)
}

/// Static role→permission policy.
pub fn permissions_from_role(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![Permission::All],
        Role::Staff => vec![
            Permission::InventoryRead,
            Permission::InventoryWrite,
            Permission::InventoryAdjust,
        ],
        Role::Instructor => vec![Permission::InventoryRead],
    }
}
