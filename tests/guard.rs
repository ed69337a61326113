//! Guard wrappers: authentication, permission checks and pass-through

use std::cell::Cell;

use rolegate::guard::{authenticated, require, Operation};
use rolegate::{Error, MemoryStore, Principal, PrincipalId, Resolver, Role, Store};

struct Post {
    id: u32,
    author: PrincipalId,
}

fn setup() -> (MemoryStore, Principal, Principal) {
    let store = MemoryStore::new();
    store
        .save_role(&Role::new("user".into(), "user").with_permissions(["post.read", "post.update.own"]))
        .unwrap();
    let alice = Principal::new("alice".into(), "Alice").with_role("user");
    let mod_ = Principal::new("mod".into(), "Mod").with_permissions(["post.manage"]);
    store.save_principal(&alice).unwrap();
    store.save_principal(&mod_).unwrap();
    (store, alice, mod_)
}

// ============================================================================
// RequireAuth
// ============================================================================

#[test]
fn unauthenticated_never_reaches_inner() {
    let called = Cell::new(false);
    let op = authenticated(|_: &Principal, _: ()| {
        called.set(true);
        Ok::<_, Error>(())
    });
    assert_eq!(op.call(None, ()), Err(Error::Unauthenticated));
    assert!(!called.get());
}

#[test]
fn authenticated_passes_principal() {
    let (_, alice, _) = setup();
    let op = authenticated(|who: &Principal, n: i32| Ok::<_, Error>(format!("{}:{}", who.id, n)));
    assert_eq!(op.call(Some(&alice), 3).unwrap(), "alice:3");
}

// ============================================================================
// RequirePermission
// ============================================================================

#[test]
fn granted_runs_inner() {
    let (store, alice, _) = setup();
    let op = require(Resolver::new(&store), "post.read", authenticated(|_: &Principal, id: u32| Ok::<_, Error>(id * 2)));
    assert_eq!(op.call(Some(&alice), 21), Ok(42));
}

/// The error names the required permission and nothing else
#[test]
fn forbidden_carries_permission() {
    let (store, alice, _) = setup();
    let called = Cell::new(false);
    let op = require(
        Resolver::new(&store),
        "post.delete",
        authenticated(|_: &Principal, _: ()| {
            called.set(true);
            Ok::<_, Error>(())
        }),
    );

    let e = op.call(Some(&alice), ()).unwrap_err();
    assert_eq!(e, Error::Forbidden { permission: "post.delete".into() });
    assert_eq!(e.to_string(), "you don't have permission: post.delete");
    assert!(!called.get());
}

#[test]
fn require_without_principal_is_unauthenticated() {
    let (store, _, _) = setup();
    let op = require(Resolver::new(&store), "post.read", authenticated(|_: &Principal, _: ()| Ok::<_, Error>(())));
    assert_eq!(op.call(None, ()), Err(Error::Unauthenticated));
}

/// Inner failures come back unchanged
#[test]
fn inner_errors_pass_through() {
    let (store, alice, _) = setup();
    let op = require(
        Resolver::new(&store),
        "post.read",
        authenticated(|_: &Principal, _: ()| -> rolegate::Result<()> { Err(Error::role_not_found("x")) }),
    );
    assert_eq!(op.call(Some(&alice), ()), Err(Error::role_not_found("x")));
}

/// A principal that is not in the store is denied, not trusted
#[test]
fn unknown_principal_forbidden() {
    let (store, _, _) = setup();
    let stranger = Principal::new("stranger".into(), "S").with_permissions(["post.manage"]);
    let op = require(Resolver::new(&store), "post.read", authenticated(|_: &Principal, _: ()| Ok::<_, Error>(())));
    assert!(matches!(op.call(Some(&stranger), ()), Err(Error::Forbidden { .. })));
}

// ============================================================================
// Ownership and stacking
// ============================================================================

#[test]
fn owner_extracted_from_input() {
    let (store, alice, mod_) = setup();
    let edit = require(
        Resolver::new(&store),
        "post.update.own",
        authenticated(|_: &Principal, post: Post| Ok::<_, Error>(post.id)),
    )
    .with_owner(|post: &Post| Some(post.author.clone()));

    let hers = Post { id: 1, author: "alice".into() };
    let theirs = Post { id: 2, author: "bob".into() };

    assert_eq!(edit.call(Some(&alice), hers), Ok(1));
    assert!(matches!(edit.call(Some(&alice), theirs), Err(Error::Forbidden { .. })));
    // manage covers posts owned by anyone
    assert_eq!(edit.call(Some(&mod_), Post { id: 3, author: "bob".into() }), Ok(3));
}

#[test]
fn no_owner_extractor_means_no_ownership() {
    let (store, alice, _) = setup();
    let edit = require(Resolver::new(&store), "post.update.own", authenticated(|_: &Principal, _: ()| Ok::<_, Error>(())));
    assert!(matches!(edit.call(Some(&alice), ()), Err(Error::Forbidden { .. })));
}

/// Requirements stack; every layer must pass
#[test]
fn wrappers_stack() {
    let (store, alice, mod_) = setup();
    let resolver = Resolver::new(&store);
    let op = require(
        resolver,
        "post.read",
        require(resolver, "post.moderate", authenticated(|who: &Principal, _: ()| Ok::<_, Error>(who.name.clone()))),
    );

    assert_eq!(op.call(Some(&mod_), ()), Ok("Mod".to_string()));
    assert_eq!(op.call(Some(&alice), ()), Err(Error::Forbidden { permission: "post.moderate".into() }));
    assert_eq!(op.permission().as_str(), "post.read");
}

/// Operations can be borrowed and reused
#[test]
fn borrowed_operation() {
    let (store, alice, _) = setup();
    let op = require(Resolver::new(&store), "post.read", authenticated(|_: &Principal, n: u8| Ok::<_, Error>(n)));
    let by_ref = &op;
    assert_eq!(by_ref.call(Some(&alice), 1), Ok(1));
    assert_eq!(op.call(Some(&alice), 2), Ok(2));
}
