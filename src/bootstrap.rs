//! Bootstrap and registration

use crate::admin::Admin;
use crate::entity::{Principal, Role};
use crate::entity_id::{PrincipalId, RoleId};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::vocabulary::{GROUP_ADMIN, GROUP_MODERATOR, GROUP_USER_BASIC};

/// Role every registered principal receives
pub const DEFAULT_ROLE: &str = "user";
pub const ADMIN_ROLE: &str = "admin";

const SYSTEM_ROLES: &[(&str, &str, &str)] = &[
    (DEFAULT_ROLE, GROUP_USER_BASIC, "Default role for registered users"),
    ("moderator", GROUP_MODERATOR, "Content moderation"),
    (ADMIN_ROLE, GROUP_ADMIN, "Full access"),
];

/// True once every system role exists
pub fn is_bootstrapped<S: Store + ?Sized>(admin: &Admin<'_, S>) -> Result<bool> {
    for (name, _, _) in SYSTEM_ROLES {
        if admin.store().find_role_by_name(name)?.is_none() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Create the `user`, `moderator` and `admin` system roles from the catalog groups.
///
/// Roles whose name already exists keep their permissions, so this is safe to
/// run on every start. An existing role with a system name that is not yet
/// marked as a system role gets marked. Returns the roles as stored afterwards.
pub fn seed_system_roles<S: Store + ?Sized>(admin: &Admin<'_, S>) -> Result<Vec<Role>> {
    let store = admin.store();
    let mut seeded = Vec::with_capacity(SYSTEM_ROLES.len());
    for &(name, group, description) in SYSTEM_ROLES {
        if let Some(mut existing) = store.find_role_by_name(name)? {
            if !existing.is_system {
                existing.is_system = true;
                store.save_role(&existing)?;
                tracing::warn!(role = %existing.id, name, "existing role adopted as system role");
            }
            seeded.push(existing);
            continue;
        }
        let group = admin
            .catalog()
            .group(group)
            .ok_or_else(|| Error::InvalidPermission(format!("unknown group '{}'", group)))?;
        let role = Role::new(RoleId::new(name), name)
            .with_description(description)
            .with_permissions(group.permissions.iter().cloned())
            .system();
        store.save_role(&role)?;
        tracing::info!(role = %role.id, permissions = role.permissions.len(), "seeded system role");
        seeded.push(role);
    }
    Ok(seeded)
}

/// Create an active principal holding the default role
pub fn register<S: Store + ?Sized>(admin: &Admin<'_, S>, name: &str) -> Result<Principal> {
    let role = admin
        .store()
        .find_role_by_name(DEFAULT_ROLE)?
        .ok_or_else(|| Error::role_not_found(DEFAULT_ROLE))?;
    admin.create_principal(name, &[role.id])
}

/// Make sure `id` exists and holds the admin role. Creates the principal if needed.
pub fn ensure_admin<S: Store + ?Sized>(admin: &Admin<'_, S>, id: &PrincipalId) -> Result<Principal> {
    let store = admin.store();
    let role = store
        .find_role_by_name(ADMIN_ROLE)?
        .ok_or_else(|| Error::role_not_found(ADMIN_ROLE))?;
    if store.find_principal(id)?.is_none() {
        store.save_principal(&Principal::new(id.clone(), id.as_str()))?;
        tracing::info!(principal = %id, "created admin principal");
    }
    admin.assign_role_to_user(id, &role.id)?;
    store.find_principal(id)?.ok_or_else(|| Error::principal_not_found(id))
}
