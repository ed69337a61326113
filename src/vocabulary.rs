//! Permission vocabulary: resources, actions, the catalog and seeding groups

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::permission::Permission;

/// Things a permission can be about
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Display, EnumString, EnumIter, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    User,
    Post,
    Role,
    System,
}

/// What a permission allows on its resource
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Display, EnumString, EnumIter, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Supersedes every other action on the same resource
    Manage,
    Moderate,
}

/// Narrowing suffix on a permission. `own` is the only one defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Condition {
    Own,
}

// Permission identifiers
pub const USER_CREATE: &str = "user.create";
pub const USER_READ: &str = "user.read";
pub const USER_UPDATE: &str = "user.update";
pub const USER_UPDATE_OWN: &str = "user.update.own";
pub const USER_DELETE: &str = "user.delete";
pub const USER_MANAGE: &str = "user.manage";

pub const POST_CREATE: &str = "post.create";
pub const POST_READ: &str = "post.read";
pub const POST_UPDATE: &str = "post.update";
pub const POST_UPDATE_OWN: &str = "post.update.own";
pub const POST_DELETE: &str = "post.delete";
pub const POST_DELETE_OWN: &str = "post.delete.own";
pub const POST_MODERATE: &str = "post.moderate";
pub const POST_MANAGE: &str = "post.manage";

pub const ROLE_CREATE: &str = "role.create";
pub const ROLE_READ: &str = "role.read";
pub const ROLE_UPDATE: &str = "role.update";
pub const ROLE_DELETE: &str = "role.delete";
pub const ROLE_MANAGE: &str = "role.manage";

pub const SYSTEM_MANAGE: &str = "system.manage";

/// Every valid identifier, in catalog order
const ALL: &[&str] = &[
    USER_CREATE, USER_READ, USER_UPDATE, USER_UPDATE_OWN, USER_DELETE, USER_MANAGE,
    POST_CREATE, POST_READ, POST_UPDATE, POST_UPDATE_OWN, POST_DELETE, POST_DELETE_OWN,
    POST_MODERATE, POST_MANAGE,
    ROLE_CREATE, ROLE_READ, ROLE_UPDATE, ROLE_DELETE, ROLE_MANAGE,
    SYSTEM_MANAGE,
];

// Group names
pub const GROUP_USER_BASIC: &str = "user_basic";
pub const GROUP_MODERATOR: &str = "moderator";
pub const GROUP_ADMIN: &str = "admin";

const USER_BASIC: &[&str] = &[POST_CREATE, POST_READ, POST_UPDATE_OWN, POST_DELETE_OWN, USER_UPDATE_OWN];

const MODERATOR: &[&str] = &[
    POST_READ, POST_CREATE, POST_UPDATE, POST_DELETE, POST_MODERATE, USER_READ, USER_UPDATE_OWN,
];

/// Named, ordered bundle of permissions used to seed roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGroup {
    pub name: &'static str,
    pub permissions: Vec<Permission>,
}

impl PermissionGroup {
    fn new(name: &'static str, ids: &[&str]) -> Self {
        PermissionGroup { name, permissions: ids.iter().map(|s| Permission::parse(s)).collect() }
    }
}

/// The closed set of valid permissions plus the seeding groups.
///
/// Build it once at startup and share it by reference; it is never mutated.
#[derive(Debug, Clone)]
pub struct Catalog {
    ordered: Vec<Permission>,
    index: BTreeSet<Permission>,
    groups: Vec<PermissionGroup>,
}

impl Catalog {
    /// The catalog of the users/posts/roles application
    pub fn standard() -> Self {
        let ordered: Vec<Permission> = ALL.iter().map(|s| Permission::parse(s)).collect();
        let index = ordered.iter().cloned().collect();
        let groups = vec![
            PermissionGroup::new(GROUP_USER_BASIC, USER_BASIC),
            PermissionGroup::new(GROUP_MODERATOR, MODERATOR),
            PermissionGroup::new(GROUP_ADMIN, ALL),
        ];
        Catalog { ordered, index, groups }
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.index.contains(permission)
    }

    /// Reject identifiers outside the catalog
    pub fn validate(&self, permission: &Permission) -> Result<()> {
        if self.contains(permission) {
            Ok(())
        } else {
            Err(Error::InvalidPermission(permission.to_string()))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.ordered.iter()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn groups(&self) -> &[PermissionGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&PermissionGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Catalog entries keyed by resource, catalog order kept within each resource
    pub fn by_resource(&self) -> BTreeMap<Resource, Vec<&Permission>> {
        let mut grouped: BTreeMap<Resource, Vec<&Permission>> = BTreeMap::new();
        for p in &self.ordered {
            if let Some(r) = p.resource() {
                grouped.entry(r).or_default().push(p);
            }
        }
        grouped
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_catalog_entry_is_well_formed() {
        let c = Catalog::standard();
        assert_eq!(c.len(), 20);
        assert!(c.iter().all(Permission::is_well_formed));
    }

    #[test]
    fn not_every_pair_is_valid() {
        let c = Catalog::standard();
        assert!(c.contains(&Permission::parse("post.moderate")));
        assert!(!c.contains(&Permission::parse("user.moderate")));
        assert!(!c.contains(&Permission::parse("system.read")));
        assert_eq!(
            c.validate(&Permission::parse("user.moderate")),
            Err(Error::InvalidPermission("user.moderate".into()))
        );
    }

    #[test]
    fn admin_group_is_whole_catalog() {
        let c = Catalog::standard();
        let admin = c.group(GROUP_ADMIN).unwrap();
        assert_eq!(admin.permissions, c.iter().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn groups_only_reference_catalog_members() {
        let c = Catalog::standard();
        for g in c.groups() {
            assert!(g.permissions.iter().all(|p| c.contains(p)), "group {}", g.name);
        }
        assert_eq!(c.group(GROUP_USER_BASIC).unwrap().permissions.len(), 5);
        assert_eq!(c.group(GROUP_MODERATOR).unwrap().permissions.len(), 7);
        assert!(c.group("nope").is_none());
    }

    #[test]
    fn by_resource_covers_every_resource() {
        let c = Catalog::standard();
        let grouped = c.by_resource();
        for r in Resource::iter() {
            assert!(grouped.contains_key(&r), "{}", r);
        }
        assert_eq!(grouped[&Resource::System].len(), 1);
        assert_eq!(grouped[&Resource::Post].len(), 8);
    }

    #[test]
    fn enum_names_round_trip() {
        assert_eq!(Resource::Post.to_string(), "post");
        assert_eq!("moderate".parse::<Action>().unwrap(), Action::Moderate);
        assert!("Post".parse::<Resource>().is_err());
    }
}
