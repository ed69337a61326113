//! Authorization guard: composable wrappers around protected operations.
//!
//! ```text
//! caller ──► RequirePermission ──► RequireAuth ──► fn(&Principal, I)
//!              │ no principal: Unauthenticated
//!              │ denied:       Forbidden { permission }
//!              └ granted:      inner result passes through unchanged
//! ```
//!
//! # Example
//! ```
//! use rolegate::guard::{authenticated, require, Operation};
//! use rolegate::{Error, MemoryStore, Principal, Resolver, Store};
//!
//! let store = MemoryStore::new();
//! let alice = Principal::new("alice".into(), "Alice").with_permissions(["post.read"]);
//! store.save_principal(&alice).unwrap();
//!
//! let read_post = require(
//!     Resolver::new(&store),
//!     "post.read",
//!     authenticated(|who: &Principal, post: u32| Ok::<_, Error>(format!("{} reads {}", who.name, post))),
//! );
//!
//! assert_eq!(read_post.call(Some(&alice), 7).unwrap(), "Alice reads 7");
//! assert_eq!(read_post.call(None, 7), Err(Error::Unauthenticated));
//! ```

use crate::entity::Principal;
use crate::entity_id::PrincipalId;
use crate::error::{Error, Result};
use crate::matcher::AuthzContext;
use crate::permission::Permission;
use crate::resolver::{Decision, Resolver};
use crate::store::Store;

/// Something a caller may invoke with an input.
///
/// `caller` is the principal resolved by the authentication step, if any.
pub trait Operation<I> {
    type Output;

    fn call(&self, caller: Option<&Principal>, input: I) -> Result<Self::Output>;
}

impl<I, T: Operation<I> + ?Sized> Operation<I> for &T {
    type Output = T::Output;

    fn call(&self, caller: Option<&Principal>, input: I) -> Result<Self::Output> {
        (**self).call(caller, input)
    }
}

/// Runs `f` only for an authenticated caller
pub struct RequireAuth<F> {
    f: F,
}

/// Wrap `f` so it requires an authenticated principal
pub fn authenticated<F>(f: F) -> RequireAuth<F> {
    RequireAuth { f }
}

impl<F, I, O> Operation<I> for RequireAuth<F>
where
    F: Fn(&Principal, I) -> Result<O>,
{
    type Output = O;

    fn call(&self, caller: Option<&Principal>, input: I) -> Result<O> {
        let principal = caller.ok_or(Error::Unauthenticated)?;
        (self.f)(principal, input)
    }
}

type OwnerFn<'r, I> = Box<dyn Fn(&I) -> Option<PrincipalId> + Send + Sync + 'r>;

/// Runs the inner operation only if the caller holds `permission`
pub struct RequirePermission<'r, S: Store + ?Sized, Op, I> {
    resolver: Resolver<'r, S>,
    permission: Permission,
    owner_of: Option<OwnerFn<'r, I>>,
    inner: Op,
}

/// Wrap `inner` so it requires authentication plus `permission`
pub fn require<'r, S, Op, I>(
    resolver: Resolver<'r, S>,
    permission: impl Into<Permission>,
    inner: Op,
) -> RequirePermission<'r, S, Op, I>
where
    S: Store + ?Sized,
    Op: Operation<I>,
{
    RequirePermission { resolver, permission: permission.into(), owner_of: None, inner }
}

impl<'r, S: Store + ?Sized, Op, I> RequirePermission<'r, S, Op, I> {
    /// Derive the resource owner from the input, for `own` permissions
    pub fn with_owner<X>(mut self, owner_of: X) -> Self
    where
        X: Fn(&I) -> Option<PrincipalId> + Send + Sync + 'r,
    {
        self.owner_of = Some(Box::new(owner_of));
        self
    }

    pub fn permission(&self) -> &Permission {
        &self.permission
    }
}

impl<'r, S, Op, I> Operation<I> for RequirePermission<'r, S, Op, I>
where
    S: Store + ?Sized,
    Op: Operation<I>,
{
    type Output = Op::Output;

    fn call(&self, caller: Option<&Principal>, input: I) -> Result<Op::Output> {
        let principal = caller.ok_or(Error::Unauthenticated)?;
        let context = AuthzContext {
            owner_id: self.owner_of.as_ref().and_then(|f| f(&input)),
            user_id: Some(principal.id.clone()),
        };
        match self.resolver.decide(&principal.id, &self.permission, Some(&context)) {
            Decision::Granted => self.inner.call(Some(principal), input),
            Decision::Denied(reason) => {
                tracing::debug!(principal = %principal.id, permission = %self.permission, %reason, "guard denied");
                Err(Error::Forbidden { permission: self.permission.to_string() })
            }
        }
    }
}
