//! Entity contracts: the per-entity rules governing validation and dispatch.
//!
//! | Entity | Key field | Required fields | Collection path | Locator |
//! |--------|-----------|-----------------|-----------------|---------|
//! | `device` | `mac` | `role_id` | `/api/device` | `mac` |
//! | `guest` | `username` | `password`, `role_id` | `/api/guest` | `username` |

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ValidationError;

/// Supported entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Device,
    Guest,
}

impl EntityKind {
    pub const ALL: [Self; 2] = [Self::Device, Self::Guest];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Guest => "guest",
        }
    }

    pub fn contract(self) -> &'static EntityContract {
        match self {
            Self::Device => &DEVICE,
            Self::Guest => &GUEST,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| {
                let contract = kind.contract();
                normalized == kind.as_str() || contract.aliases.contains(&normalized.as_str())
            })
            .ok_or(ValidationError::InvalidEntity { value: normalized })
    }
}

/// Immutable descriptor for one entity type.
///
/// Selected once per run. The engine never mutates it, so contracts are
/// `'static` and shared freely between in-flight records.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityContract {
    pub kind: EntityKind,
    /// Natural unique key of the entity; doubles as the update/replace locator value.
    pub key_field: &'static str,
    pub required_fields: &'static [&'static str],
    pub aliases: &'static [&'static str],
    /// Collection segment under `/api` used by create.
    pub collection: &'static str,
    /// Locator segment used by update/replace: `/api/<collection>/<locator>/<key>`.
    pub locator: &'static str,
    pub create_privilege: &'static str,
    pub edit_privilege: &'static str,
}

pub static DEVICE: EntityContract = EntityContract {
    kind: EntityKind::Device,
    key_field: "mac",
    required_fields: &["role_id"],
    aliases: &["devices"],
    collection: "device",
    locator: "mac",
    create_privilege: "mac_create",
    edit_privilege: "full-user-control",
};

pub static GUEST: EntityContract = EntityContract {
    kind: EntityKind::Guest,
    key_field: "username",
    required_fields: &["password", "role_id"],
    aliases: &["guests", "guestuser", "guestusers"],
    collection: "guest",
    locator: "username",
    create_privilege: "create_user",
    edit_privilege: "full-user-control",
};

impl EntityContract {
    /// Key field followed by required fields, in declaration order.
    pub fn mandatory_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.key_field).chain(self.required_fields.iter().copied())
    }

    /// Checks an operator privilege listing (`{"privileges": [...]}`) against
    /// the create and edit privileges this entity needs.
    pub fn check_privileges(&self, body: &Value) -> PrivilegeCheck {
        let Some(granted) = body.get("privileges").and_then(Value::as_array) else {
            return PrivilegeCheck::Unavailable;
        };
        let has = |needle: &str| granted.iter().any(|value| value.as_str() == Some(needle));

        PrivilegeCheck::Listed {
            create: has(self.create_privilege),
            edit: has(self.edit_privilege),
        }
    }
}

/// Result of [`EntityContract::check_privileges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeCheck {
    /// The response carried no `privileges` array.
    Unavailable,
    Listed { create: bool, edit: bool },
}
