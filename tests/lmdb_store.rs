//! LMDB-backed store

use rolegate::db::{MAX_KEY_SIZE, SCHEMA_VERSION};
use rolegate::{
    bootstrap, Admin, Catalog, Error, LmdbStore, Permission, Principal, PrincipalId, Resolver, Role, RoleId,
    RoleUpdate, Store,
};
use tempfile::TempDir;

fn open() -> (TempDir, LmdbStore) {
    let dir = TempDir::new().unwrap();
    let store = LmdbStore::open(dir.path()).unwrap();
    (dir, store)
}

#[test]
fn missing_documents_are_none() {
    let (_dir, store) = open();
    assert!(store.find_principal(&"nobody".into()).unwrap().is_none());
    assert!(store.find_role(&"nothing".into()).unwrap().is_none());
    assert!(store.find_role_by_name("nothing").unwrap().is_none());
    assert!(!store.delete_role(&"nothing".into()).unwrap());
    assert!(store.list_roles().unwrap().is_empty());
}

/// Keys LMDB can't hold behave like absent documents, not storage failures
#[test]
fn unstorable_keys_are_missing() {
    let (_dir, store) = open();
    let long = "x".repeat(MAX_KEY_SIZE + 1);

    assert!(store.find_principal(&PrincipalId::new("")).unwrap().is_none());
    assert!(store.find_principal(&PrincipalId::new(&long)).unwrap().is_none());
    assert!(store.find_role(&RoleId::new("  ")).unwrap().is_none());
    assert!(store.find_role(&RoleId::new(&long)).unwrap().is_none());
    assert!(store.find_role_by_name("").unwrap().is_none());
    assert!(store.find_role_by_name(&long).unwrap().is_none());
    assert!(!store.delete_role(&RoleId::new(&long)).unwrap());

    let resolver = Resolver::new(&store);
    assert_eq!(resolver.effective_for(&PrincipalId::new("")), Ok(None));
    assert!(!resolver.check_permission(&PrincipalId::new(&long), &Permission::parse("post.read"), None));
}

#[test]
fn unstorable_keys_rejected_on_save() {
    let (_dir, store) = open();
    let long = "x".repeat(MAX_KEY_SIZE + 1);

    let e = store.save_role(&Role::new("r1".into(), long.as_str())).unwrap_err();
    assert!(matches!(e, Error::Invalid(_)));
    let e = store.save_role(&Role::new(RoleId::new(&long), "editor")).unwrap_err();
    assert!(matches!(e, Error::Invalid(_)));
    let e = store.save_principal(&Principal::new(PrincipalId::new(""), "nobody")).unwrap_err();
    assert!(matches!(e, Error::Invalid(_)));
    assert!(store.list_roles().unwrap().is_empty());
}

/// Blank or overlong input through the admin API gives client errors
#[test]
fn admin_input_at_key_limits() {
    let (_dir, store) = open();
    let catalog = Catalog::standard();
    let admin = Admin::new(&store, &catalog);
    bootstrap::seed_system_roles(&admin).unwrap();
    let alice = bootstrap::register(&admin, "alice").unwrap();

    let e = admin.assign_role_to_user(&alice.id, &RoleId::new("  ")).unwrap_err();
    assert_eq!(e, Error::role_not_found(""));
    let e = admin.assign_role_to_user(&PrincipalId::new(""), &"user".into()).unwrap_err();
    assert_eq!(e, Error::principal_not_found(""));

    let e = admin.create_role(&"x".repeat(600), None, ["post.read"]).unwrap_err();
    assert!(matches!(e, Error::Invalid(_)));
    assert_eq!(store.list_roles().unwrap().len(), 3);
}

#[test]
fn documents_round_trip() {
    let (_dir, store) = open();
    let role = Role::new("r1".into(), "editor")
        .with_description("edits posts")
        .with_permissions(["post.update", "post.read"]);
    let alice = Principal::new("alice".into(), "Alice").with_role("r1").with_permissions(["user.read"]);

    store.save_role(&role).unwrap();
    store.save_principal(&alice).unwrap();

    assert_eq!(store.find_role(&"r1".into()).unwrap(), Some(role.clone()));
    assert_eq!(store.find_role_by_name("editor").unwrap(), Some(role));
    assert_eq!(store.find_principal(&"alice".into()).unwrap(), Some(alice));
}

/// Data and the schema record survive closing and reopening the environment
#[test]
fn persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = LmdbStore::open(dir.path()).unwrap();
        let catalog = Catalog::standard();
        let admin = Admin::new(&store, &catalog);
        bootstrap::seed_system_roles(&admin).unwrap();
        bootstrap::ensure_admin(&admin, &"root".into()).unwrap();
    }

    let store = LmdbStore::open(dir.path()).unwrap();
    assert_eq!(store.schema_version().unwrap(), Some(SCHEMA_VERSION));
    assert_eq!(store.list_roles().unwrap().len(), 3);
    let resolver = Resolver::new(&store);
    assert!(resolver.check_permission(&"root".into(), &Permission::parse("system.manage"), None));
}

#[test]
fn rename_moves_name_index() {
    let (_dir, store) = open();
    let catalog = Catalog::standard();
    let admin = Admin::new(&store, &catalog);
    let role = admin.create_role("writer", None, ["post.create"]).unwrap();

    admin.update_role(&role.id, RoleUpdate { name: Some("author".into()), ..Default::default() }).unwrap();
    assert!(store.find_role_by_name("writer").unwrap().is_none());
    assert_eq!(store.find_role_by_name("author").unwrap().map(|r| r.id), Some(role.id.clone()));

    // The old name is free again
    admin.create_role("writer", None, ["post.read"]).unwrap();
    let names: Vec<String> = store.list_roles().unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, ["author", "writer"]);
}

#[test]
fn duplicate_name_conflicts() {
    let (_dir, store) = open();
    store.save_role(&Role::new("r1".into(), "editor")).unwrap();
    let e = store.save_role(&Role::new("r2".into(), "editor")).unwrap_err();
    assert!(matches!(e, Error::Conflict(_)));
    assert!(store.find_role(&"r2".into()).unwrap().is_none());
}

#[test]
fn delete_frees_name() {
    let (_dir, store) = open();
    store.save_role(&Role::new("r1".into(), "editor")).unwrap();
    assert!(store.delete_role(&"r1".into()).unwrap());
    assert!(store.find_role_by_name("editor").unwrap().is_none());
    store.save_role(&Role::new("r2".into(), "editor")).unwrap();
}

#[test]
fn clear_all_keeps_schema() {
    let (_dir, store) = open();
    store.save_role(&Role::new("r1".into(), "editor")).unwrap();
    store.save_principal(&Principal::new("a".into(), "A")).unwrap();

    store.clear_all().unwrap();
    assert!(store.list_roles().unwrap().is_empty());
    assert!(store.find_principal(&"a".into()).unwrap().is_none());
    assert_eq!(store.schema_version().unwrap(), Some(SCHEMA_VERSION));
}
