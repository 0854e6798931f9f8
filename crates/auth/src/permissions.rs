use serde::{Deserialize, Serialize};

/// Capability checked before an inventory operation runs.
///
/// `All` is held by administrators and satisfies any requirement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "*")]
    All,
    #[serde(rename = "inventory.read")]
    InventoryRead,
    #[serde(rename = "inventory.write")]
    InventoryWrite,
    #[serde(rename = "inventory.adjust")]
    InventoryAdjust,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::All => "*",
            Permission::InventoryRead => "inventory.read",
            Permission::InventoryWrite => "inventory.write",
            Permission::InventoryAdjust => "inventory.adjust",
        }
    }

    /// Whether holding `self` satisfies `required`.
    pub fn grants(self, required: Permission) -> bool {
        self == Permission::All || self == required
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
