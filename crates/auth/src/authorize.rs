use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

/// Check that `principal` holds `required`. Pure; no IO.
pub fn authorize(principal: &Principal, required: Permission) -> Result<(), AuthzError> {
    if principal.holds(required) {
        return Ok(());
    }
    tracing::debug!(
        user_id = %principal.user_id,
        role = %principal.role,
        permission = %required,
        "authorization denied"
    );
    Err(AuthzError::Forbidden(required))
}
