//! Storage collaborator contract plus an in-memory implementation

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::entity::{Principal, Role};
use crate::entity_id::{PrincipalId, RoleId};
use crate::error::{Error, Result};

/// Document storage for roles and principals.
///
/// Each call is one atomic single-document operation; concurrent writers to the
/// same document are last-writer-wins.
pub trait Store: Send + Sync {
    fn find_principal(&self, id: &PrincipalId) -> Result<Option<Principal>>;
    fn save_principal(&self, principal: &Principal) -> Result<()>;

    fn find_role(&self, id: &RoleId) -> Result<Option<Role>>;
    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;
    fn save_role(&self, role: &Role) -> Result<()>;
    /// Returns false if there was no such role
    fn delete_role(&self, id: &RoleId) -> Result<bool>;
    /// All roles, ordered by name
    fn list_roles(&self) -> Result<Vec<Role>>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn find_principal(&self, id: &PrincipalId) -> Result<Option<Principal>> {
        (**self).find_principal(id)
    }
    fn save_principal(&self, principal: &Principal) -> Result<()> {
        (**self).save_principal(principal)
    }
    fn find_role(&self, id: &RoleId) -> Result<Option<Role>> {
        (**self).find_role(id)
    }
    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        (**self).find_role_by_name(name)
    }
    fn save_role(&self, role: &Role) -> Result<()> {
        (**self).save_role(role)
    }
    fn delete_role(&self, id: &RoleId) -> Result<bool> {
        (**self).delete_role(id)
    }
    fn list_roles(&self) -> Result<Vec<Role>> {
        (**self).list_roles()
    }
}

/// Process-local store, used by tests and embedders without persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    principals: RwLock<HashMap<PrincipalId, Principal>>,
    roles: RwLock<HashMap<RoleId, Role>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn find_principal(&self, id: &PrincipalId) -> Result<Option<Principal>> {
        Ok(self.principals.read().get(id).cloned())
    }

    fn save_principal(&self, principal: &Principal) -> Result<()> {
        self.principals.write().insert(principal.id.clone(), principal.clone());
        Ok(())
    }

    fn find_role(&self, id: &RoleId) -> Result<Option<Role>> {
        Ok(self.roles.read().get(id).cloned())
    }

    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.roles.read().values().find(|r| r.name == name).cloned())
    }

    fn save_role(&self, role: &Role) -> Result<()> {
        let mut roles = self.roles.write();
        if roles.values().any(|r| r.name == role.name && r.id != role.id) {
            return Err(Error::Conflict(format!("role name '{}' already taken", role.name)));
        }
        roles.insert(role.id.clone(), role.clone());
        Ok(())
    }

    fn delete_role(&self, id: &RoleId) -> Result<bool> {
        Ok(self.roles.write().remove(id).is_some())
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = self.roles.read().values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_are_unique() {
        let store = MemoryStore::new();
        store.save_role(&Role::new("r1".into(), "editor")).unwrap();
        let clash = store.save_role(&Role::new("r2".into(), "editor"));
        assert!(matches!(clash, Err(Error::Conflict(_))));
        // Re-saving the same role under its own name is fine
        store.save_role(&Role::new("r1".into(), "editor").with_description("edits")).unwrap();
        assert_eq!(store.list_roles().unwrap().len(), 1);
    }

    #[test]
    fn list_is_sorted_by_name() {
        let store = MemoryStore::new();
        for (id, name) in [("3", "zeta"), ("1", "alpha"), ("2", "mid")] {
            store.save_role(&Role::new(id.into(), name)).unwrap();
        }
        let names: Vec<String> = store.list_roles().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }
}
