//! Role and principal documents as the storage collaborator holds them

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entity_id::{PrincipalId, RoleId};
use crate::permission::{Permission, PermissionSet};

fn default_true() -> bool {
    true
}

/// Named bundle of permissions, shared by any number of principals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// System roles cannot be renamed or deleted
    #[serde(default)]
    pub is_system: bool,
}

impl Role {
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Role {
            id,
            name: name.into(),
            description: None,
            permissions: PermissionSet::new(),
            is_active: true,
            is_system: false,
        }
    }

    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// An actor whose permissions are evaluated.
///
/// Roles are referenced by id only; the principal never owns a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
    #[serde(default)]
    pub direct_permissions: PermissionSet,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Principal {
    pub fn new(id: PrincipalId, name: impl Into<String>) -> Self {
        Principal {
            id,
            name: name.into(),
            roles: BTreeSet::new(),
            direct_permissions: PermissionSet::new(),
            is_active: true,
        }
    }

    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.direct_permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
