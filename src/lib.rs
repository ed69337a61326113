//! Rolegate - role and permission based access control
//!
//! Permissions are dotted identifiers (`post.update.own`) drawn from a closed
//! [`Catalog`]. Principals hold them through roles or direct grants; the
//! [`Resolver`] answers checks and denies whenever it cannot decide.
//!
//! ```
//! use rolegate::{bootstrap, Admin, AuthzContext, Catalog, MemoryStore, Permission, Resolver};
//!
//! let store = MemoryStore::new();
//! let catalog = Catalog::standard();
//! let admin = Admin::new(&store, &catalog);
//! bootstrap::seed_system_roles(&admin).unwrap();
//!
//! let alice = bootstrap::register(&admin, "alice").unwrap();
//! let resolver = Resolver::new(&store);
//! let edit = Permission::parse("post.update.own");
//!
//! let own_post = AuthzContext::owned_by(alice.id.clone());
//! let other_post = AuthzContext::owned_by("bob");
//! assert!(resolver.check_permission(&alice.id, &edit, Some(&own_post)));
//! assert!(!resolver.check_permission(&alice.id, &edit, Some(&other_post)));
//! ```

pub mod admin;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod entity;
pub mod entity_id;
pub mod error;
pub mod guard;
pub mod matcher;
pub mod permission;
pub mod protected;
pub mod resolver;
pub mod store;
pub mod vocabulary;

pub use admin::{Admin, RoleUpdate};
pub use config::Settings;
pub use db::LmdbStore;
pub use entity::{Principal, Role};
pub use entity_id::{PrincipalId, RoleId};
pub use error::{Error, Result};
pub use matcher::{matches, matches_all, matches_any, AuthzContext};
pub use permission::{Permission, PermissionSet};
pub use protected::{NewRole, Protected};
pub use resolver::{Decision, DenyReason, Resolver};
pub use store::{MemoryStore, Store};
pub use vocabulary::{Action, Catalog, Condition, PermissionGroup, Resource};
