//! UUID-backed identifiers.
//!
//! Each id is its own type so a user id can never be passed where an item
//! record id is expected. All three serialize as the bare UUID string.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh time-ordered (v7) id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<Uuid>()
                    .map(Self)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {e}", stringify!($name))))
            }
        }
    };
}

uuid_id!(
    /// Storage identity of an inventory item, distinct from its business key.
    RecordId
);
uuid_id!(
    /// A staff member acting on the inventory.
    UserId
);
uuid_id!(LogEntryId);
