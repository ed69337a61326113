//! Protected administration API
//!
//! Every mutation requires a caller holding the matching permission. The
//! plain [`Admin`] operations stay available for trusted code (seeding, tests).

use serde::Deserialize;

use crate::admin::{Admin, RoleUpdate};
use crate::entity::{Principal, Role};
use crate::entity_id::{PrincipalId, RoleId};
use crate::error::Result;
use crate::guard::{authenticated, require, Operation};
use crate::matcher::AuthzContext;
use crate::permission::{Permission, PermissionSet};
use crate::resolver::Resolver;
use crate::store::Store;
use crate::vocabulary::{Catalog, ROLE_CREATE, ROLE_DELETE, ROLE_READ, ROLE_UPDATE, USER_MANAGE, USER_READ};

/// Input for [`Protected::create_role`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

pub struct Protected<'a, S: Store + ?Sized> {
    resolver: Resolver<'a, S>,
    admin: Admin<'a, S>,
}

impl<'a, S: Store + ?Sized> Protected<'a, S> {
    pub fn new(store: &'a S, catalog: &'a Catalog) -> Self {
        Protected { resolver: Resolver::new(store), admin: Admin::new(store, catalog) }
    }

    pub fn resolver(&self) -> Resolver<'a, S> {
        self.resolver
    }

    pub fn admin(&self) -> &Admin<'a, S> {
        &self.admin
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Does the caller hold `permission`? Only authentication is required.
    pub fn check(&self, caller: Option<&Principal>, permission: &Permission, owner_id: Option<PrincipalId>) -> Result<bool> {
        authenticated(|who: &Principal, owner: Option<PrincipalId>| -> Result<bool> {
            let ctx = AuthzContext { owner_id: owner, user_id: Some(who.id.clone()) };
            Ok(self.resolver.check_permission(&who.id, permission, Some(&ctx)))
        })
        .call(caller, owner_id)
    }

    /// Effective permissions of `target`. Reading your own needs no permission;
    /// anyone else's needs `user.read`.
    pub fn principal_permissions(&self, caller: Option<&Principal>, target: PrincipalId) -> Result<Option<PermissionSet>> {
        let read = |_: &Principal, id: PrincipalId| self.resolver.effective_for(&id);
        match caller {
            Some(who) if who.id == target => authenticated(read).call(caller, target),
            _ => require(self.resolver, USER_READ, authenticated(read)).call(caller, target),
        }
    }

    // ========================================================================
    // Roles
    // ========================================================================

    /// Requires `role.read`
    pub fn list_roles(&self, caller: Option<&Principal>) -> Result<Vec<Role>> {
        require(self.resolver, ROLE_READ, authenticated(|_: &Principal, ()| self.admin.list_roles())).call(caller, ())
    }

    /// Requires `role.read`
    pub fn get_role(&self, caller: Option<&Principal>, role_id: RoleId) -> Result<Role> {
        require(self.resolver, ROLE_READ, authenticated(|_: &Principal, id: RoleId| self.admin.get_role(&id))).call(caller, role_id)
    }

    /// Requires `role.create`
    pub fn create_role(&self, caller: Option<&Principal>, new: NewRole) -> Result<Role> {
        let op = authenticated(|_: &Principal, new: NewRole| {
            self.admin.create_role(&new.name, new.description.as_deref(), new.permissions)
        });
        require(self.resolver, ROLE_CREATE, op).call(caller, new)
    }

    /// Requires `role.update`
    pub fn update_role(&self, caller: Option<&Principal>, role_id: RoleId, update: RoleUpdate) -> Result<Role> {
        let op = authenticated(|_: &Principal, (id, update): (RoleId, RoleUpdate)| self.admin.update_role(&id, update));
        require(self.resolver, ROLE_UPDATE, op).call(caller, (role_id, update))
    }

    /// Requires `role.update`
    pub fn add_permission_to_role(&self, caller: Option<&Principal>, role_id: RoleId, permission: Permission) -> Result<()> {
        let op = authenticated(|_: &Principal, (id, p): (RoleId, Permission)| self.admin.add_permission_to_role(&id, &p));
        require(self.resolver, ROLE_UPDATE, op).call(caller, (role_id, permission))
    }

    /// Requires `role.update`
    pub fn remove_permission_from_role(&self, caller: Option<&Principal>, role_id: RoleId, permission: Permission) -> Result<()> {
        let op = authenticated(|_: &Principal, (id, p): (RoleId, Permission)| self.admin.remove_permission_from_role(&id, &p));
        require(self.resolver, ROLE_UPDATE, op).call(caller, (role_id, permission))
    }

    /// Requires `role.delete`
    pub fn delete_role(&self, caller: Option<&Principal>, role_id: RoleId) -> Result<()> {
        let op = authenticated(|_: &Principal, id: RoleId| self.admin.delete_role(&id));
        require(self.resolver, ROLE_DELETE, op).call(caller, role_id)
    }

    // ========================================================================
    // Principals (all require `user.manage`)
    // ========================================================================

    pub fn assign_role_to_user(&self, caller: Option<&Principal>, principal_id: PrincipalId, role_id: RoleId) -> Result<()> {
        let op = authenticated(|_: &Principal, (p, r): (PrincipalId, RoleId)| self.admin.assign_role_to_user(&p, &r));
        require(self.resolver, USER_MANAGE, op).call(caller, (principal_id, role_id))
    }

    pub fn remove_role_from_user(&self, caller: Option<&Principal>, principal_id: PrincipalId, role_id: RoleId) -> Result<()> {
        let op = authenticated(|_: &Principal, (p, r): (PrincipalId, RoleId)| self.admin.remove_role_from_user(&p, &r));
        require(self.resolver, USER_MANAGE, op).call(caller, (principal_id, role_id))
    }

    pub fn assign_permission_to_user(&self, caller: Option<&Principal>, principal_id: PrincipalId, permission: Permission) -> Result<()> {
        let op = authenticated(|_: &Principal, (p, perm): (PrincipalId, Permission)| {
            self.admin.assign_permission_to_user(&p, &perm)
        });
        require(self.resolver, USER_MANAGE, op).call(caller, (principal_id, permission))
    }

    pub fn remove_permission_from_user(&self, caller: Option<&Principal>, principal_id: PrincipalId, permission: Permission) -> Result<()> {
        let op = authenticated(|_: &Principal, (p, perm): (PrincipalId, Permission)| {
            self.admin.remove_permission_from_user(&p, &perm)
        });
        require(self.resolver, USER_MANAGE, op).call(caller, (principal_id, permission))
    }

    pub fn set_principal_active(&self, caller: Option<&Principal>, principal_id: PrincipalId, active: bool) -> Result<()> {
        let op = authenticated(|_: &Principal, (p, a): (PrincipalId, bool)| self.admin.set_principal_active(&p, a));
        require(self.resolver, USER_MANAGE, op).call(caller, (principal_id, active))
    }
}
