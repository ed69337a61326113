//! Role and grant administration.
//!
//! Every permission argument is validated against the catalog before the
//! store is touched. Adding something already present and removing something
//! absent are silent no-ops; nothing is written in that case.

use serde::Deserialize;

use crate::entity::{Principal, Role};
use crate::entity_id::{PrincipalId, RoleId};
use crate::error::{Error, Result};
use crate::permission::Permission;
use crate::store::Store;
use crate::vocabulary::Catalog;

/// Longest accepted role name, in bytes
pub const MAX_ROLE_NAME_LEN: usize = 255;

/// Trimmed name, or `Invalid` when empty or longer than [`MAX_ROLE_NAME_LEN`]
fn role_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Invalid("role name cannot be empty".into()));
    }
    if name.len() > MAX_ROLE_NAME_LEN {
        return Err(Error::Invalid(format!("role name exceeds {} bytes", MAX_ROLE_NAME_LEN)));
    }
    Ok(name)
}

/// Changes to a role other than its permission set.
/// An empty `description` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub struct Admin<'a, S: Store + ?Sized> {
    store: &'a S,
    catalog: &'a Catalog,
}

impl<'a, S: Store + ?Sized> Admin<'a, S> {
    pub fn new(store: &'a S, catalog: &'a Catalog) -> Self {
        Admin { store, catalog }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub(crate) fn store(&self) -> &'a S {
        self.store
    }

    fn role(&self, id: &RoleId) -> Result<Role> {
        self.store.find_role(id)?.ok_or_else(|| Error::role_not_found(id))
    }

    fn principal(&self, id: &PrincipalId) -> Result<Principal> {
        self.store.find_principal(id)?.ok_or_else(|| Error::principal_not_found(id))
    }

    // ========================================================================
    // Role permissions
    // ========================================================================

    pub fn add_permission_to_role(&self, role_id: &RoleId, permission: &Permission) -> Result<()> {
        self.catalog.validate(permission)?;
        let mut role = self.role(role_id)?;
        if role.permissions.insert(permission.clone()) {
            self.store.save_role(&role)?;
            tracing::info!(role = %role_id, %permission, "permission added to role");
        }
        Ok(())
    }

    pub fn remove_permission_from_role(&self, role_id: &RoleId, permission: &Permission) -> Result<()> {
        self.catalog.validate(permission)?;
        let mut role = self.role(role_id)?;
        if role.permissions.remove(permission) {
            self.store.save_role(&role)?;
            tracing::info!(role = %role_id, %permission, "permission removed from role");
        }
        Ok(())
    }

    // ========================================================================
    // Direct grants
    // ========================================================================

    pub fn assign_permission_to_user(&self, principal_id: &PrincipalId, permission: &Permission) -> Result<()> {
        self.catalog.validate(permission)?;
        let mut principal = self.principal(principal_id)?;
        if principal.direct_permissions.insert(permission.clone()) {
            self.store.save_principal(&principal)?;
            tracing::info!(principal = %principal_id, %permission, "permission granted");
        }
        Ok(())
    }

    pub fn remove_permission_from_user(&self, principal_id: &PrincipalId, permission: &Permission) -> Result<()> {
        self.catalog.validate(permission)?;
        let mut principal = self.principal(principal_id)?;
        if principal.direct_permissions.remove(permission) {
            self.store.save_principal(&principal)?;
            tracing::info!(principal = %principal_id, %permission, "permission revoked");
        }
        Ok(())
    }

    // ========================================================================
    // Role membership
    // ========================================================================

    /// Both the principal and the role must exist
    pub fn assign_role_to_user(&self, principal_id: &PrincipalId, role_id: &RoleId) -> Result<()> {
        let mut principal = self.principal(principal_id)?;
        self.role(role_id)?;
        if principal.roles.insert(role_id.clone()) {
            self.store.save_principal(&principal)?;
            tracing::info!(principal = %principal_id, role = %role_id, "role assigned");
        }
        Ok(())
    }

    /// Only the principal must exist, so references to deleted roles can be cleaned up
    pub fn remove_role_from_user(&self, principal_id: &PrincipalId, role_id: &RoleId) -> Result<()> {
        let mut principal = self.principal(principal_id)?;
        if principal.roles.remove(role_id) {
            self.store.save_principal(&principal)?;
            tracing::info!(principal = %principal_id, role = %role_id, "role removed");
        }
        Ok(())
    }

    // ========================================================================
    // Role lifecycle
    // ========================================================================

    /// Create a role. Names are unique; every permission must be in the catalog.
    pub fn create_role<I, P>(&self, name: &str, description: Option<&str>, permissions: I) -> Result<Role>
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        let permissions: Vec<Permission> = permissions.into_iter().map(Into::into).collect();
        let invalid: Vec<&str> = permissions
            .iter()
            .filter(|p| !self.catalog.contains(p))
            .map(Permission::as_str)
            .collect();
        if !invalid.is_empty() {
            return Err(Error::InvalidPermission(invalid.join(", ")));
        }
        let name = role_name(name)?;
        if self.store.find_role_by_name(name)?.is_some() {
            return Err(Error::Conflict(format!("role with name '{}' already exists", name)));
        }

        let mut role = Role::new(RoleId::generate()?, name).with_permissions(permissions);
        role.description = description.map(str::to_string);
        self.store.save_role(&role)?;
        tracing::info!(role = %role.id, name = %role.name, "role created");
        Ok(role)
    }

    /// Rename, re-describe or (de)activate a role. System roles keep their name.
    pub fn update_role(&self, role_id: &RoleId, update: RoleUpdate) -> Result<Role> {
        let mut role = self.role(role_id)?;
        if let Some(name) = update.name {
            let name = name.trim();
            if name != role.name {
                if role.is_system {
                    return Err(Error::Conflict(format!("cannot rename system role '{}'", role.name)));
                }
                let name = role_name(name)?;
                if self.store.find_role_by_name(name)?.is_some() {
                    return Err(Error::Conflict(format!("role with name '{}' already exists", name)));
                }
                role.name = name.to_string();
            }
        }
        if let Some(description) = update.description {
            let description = description.trim();
            role.description = (!description.is_empty()).then(|| description.to_string());
        }
        if let Some(active) = update.is_active {
            role.is_active = active;
        }
        self.store.save_role(&role)?;
        tracing::info!(role = %role.id, "role updated");
        Ok(role)
    }

    /// Delete a non-system role. Principals keep a dangling reference, which
    /// contributes nothing when resolving.
    pub fn delete_role(&self, role_id: &RoleId) -> Result<()> {
        let role = self.role(role_id)?;
        if role.is_system {
            return Err(Error::Conflict(format!("cannot delete system role '{}'", role.name)));
        }
        self.store.delete_role(role_id)?;
        tracing::info!(role = %role_id, name = %role.name, "role deleted");
        Ok(())
    }

    pub fn get_role(&self, role_id: &RoleId) -> Result<Role> {
        self.role(role_id)
    }

    pub fn list_roles(&self) -> Result<Vec<Role>> {
        self.store.list_roles()
    }

    // ========================================================================
    // Principals
    // ========================================================================

    /// Create an active principal holding the given roles (each must exist)
    pub fn create_principal(&self, name: &str, roles: &[RoleId]) -> Result<Principal> {
        for r in roles {
            self.role(r)?;
        }
        let mut principal = Principal::new(PrincipalId::generate()?, name);
        principal.roles.extend(roles.iter().cloned());
        self.store.save_principal(&principal)?;
        tracing::info!(principal = %principal.id, "principal created");
        Ok(principal)
    }

    pub fn set_principal_active(&self, principal_id: &PrincipalId, active: bool) -> Result<()> {
        let mut principal = self.principal(principal_id)?;
        if principal.is_active != active {
            principal.is_active = active;
            self.store.save_principal(&principal)?;
            tracing::info!(principal = %principal_id, active, "principal activity changed");
        }
        Ok(())
    }
}
