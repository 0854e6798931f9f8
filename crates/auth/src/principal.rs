use serde::{Deserialize, Serialize};

use fablab_core::UserId;

use crate::{Permission, Role};

/// Caller identity resolved for an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role, permissions: Vec<Permission>) -> Self {
        Self {
            user_id,
            role,
            permissions,
        }
    }

    pub fn holds(&self, required: Permission) -> bool {
        self.permissions.iter().any(|p| p.grants(required))
    }
}
