//! Permission matching
//!
//! A held permission satisfies a required one when any of these holds:
//!
//! 1. exact: same identifier, requirement unconditioned
//! 2. manage: held `R.manage` satisfies anything on resource `R`
//! 3. own-for-own: both `R.A.own`, and the context names the acting
//!    principal as the owner
//! 4. broader: held `R.A` satisfies required `R.A.own` without an ownership check
//!
//! Pure and total: malformed input simply never matches.

use serde::{Deserialize, Serialize};

use crate::entity_id::PrincipalId;
use crate::permission::Permission;
use crate::vocabulary::{Action, Condition};

/// Per-check ownership context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthzContext {
    #[serde(default)]
    pub owner_id: Option<PrincipalId>,
    #[serde(default)]
    pub user_id: Option<PrincipalId>,
}

impl AuthzContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a resource owned by `owner`
    pub fn owned_by(owner: impl Into<PrincipalId>) -> Self {
        AuthzContext { owner_id: Some(owner.into()), user_id: None }
    }

    pub fn with_user(mut self, user: impl Into<PrincipalId>) -> Self {
        self.user_id = Some(user.into());
        self
    }

    /// Both ids present, non-empty and equal
    pub fn is_owner(&self) -> bool {
        match (&self.owner_id, &self.user_id) {
            (Some(o), Some(u)) => !o.is_empty() && o == u,
            _ => false,
        }
    }
}

/// Does any permission in `held` satisfy `required`?
///
/// # Example
/// ```
/// use rolegate::{matches, AuthzContext, Permission, PermissionSet};
///
/// let held: PermissionSet = [Permission::parse("post.update.own")].into_iter().collect();
/// let req = Permission::parse("post.update.own");
///
/// assert!(matches(&held, &req, Some(&AuthzContext::owned_by("a").with_user("a"))));
/// assert!(!matches(&held, &req, Some(&AuthzContext::owned_by("a").with_user("b"))));
/// assert!(!matches(&held, &req, None));
/// ```
pub fn matches<'a, I>(held: I, required: &Permission, context: Option<&AuthzContext>) -> bool
where
    I: IntoIterator<Item = &'a Permission>,
{
    if !required.is_well_formed() {
        return false;
    }
    held.into_iter().any(|h| satisfies(h, required, context))
}

/// True if at least one of `required` is satisfied
pub fn matches_any<'a, I>(held: I, required: &[Permission], context: Option<&AuthzContext>) -> bool
where
    I: IntoIterator<Item = &'a Permission> + Clone,
{
    required.iter().any(|r| matches(held.clone(), r, context))
}

/// True if every one of `required` is satisfied. An empty requirement list is satisfied.
pub fn matches_all<'a, I>(held: I, required: &[Permission], context: Option<&AuthzContext>) -> bool
where
    I: IntoIterator<Item = &'a Permission> + Clone,
{
    required.iter().all(|r| matches(held.clone(), r, context))
}

fn satisfies(held: &Permission, required: &Permission, context: Option<&AuthzContext>) -> bool {
    if !held.is_well_formed() || held.resource() != required.resource() {
        return false;
    }

    // Conditioned requirements go through the ownership rules even on an exact match
    if required.condition().is_none() && held == required {
        return true;
    }

    if held.action() == Some(Action::Manage) {
        return true;
    }

    if held.action() != required.action() {
        return false;
    }

    match (held.condition(), required.condition()) {
        (Some(Condition::Own), Some(Condition::Own)) => {
            context.map(AuthzContext::is_owner).unwrap_or(false)
        }
        (None, Some(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionSet;

    fn set(items: &[&str]) -> PermissionSet {
        items.iter().map(|s| Permission::parse(s)).collect()
    }

    #[test]
    fn malformed_held_entries_are_skipped() {
        let held = set(&["post", "post.manage.extra.bits", "post.read"]);
        assert!(matches(&held, &"post.read".into(), None));
        assert!(!matches(&held, &"post.delete".into(), None));
    }

    #[test]
    fn held_own_does_not_satisfy_unconditioned() {
        let held = set(&["post.update.own"]);
        let ctx = AuthzContext::owned_by("a").with_user("a");
        assert!(!matches(&held, &"post.update".into(), Some(&ctx)));
    }

    #[test]
    fn empty_owner_id_is_absent() {
        let held = set(&["post.update.own"]);
        let ctx = AuthzContext::owned_by("  ").with_user("");
        assert!(!matches(&held, &"post.update.own".into(), Some(&ctx)));
    }

    #[test]
    fn context_rejects_unknown_fields() {
        let ok: AuthzContext = serde_json::from_str(r#"{"owner_id":"A","user_id":"a"}"#).unwrap();
        assert!(ok.is_owner());
        assert!(serde_json::from_str::<AuthzContext>(r#"{"owner_id":"a","is_admin":true}"#).is_err());
    }

    #[test]
    fn any_and_all() {
        let held = set(&["post.read", "user.read"]);
        let reqs = [Permission::parse("post.read"), Permission::parse("role.read")];
        assert!(matches_any(&held, &reqs, None));
        assert!(!matches_all(&held, &reqs, None));
        assert!(matches_all(&held, &reqs[..1], None));
        assert!(matches_all(&held, &[], None));
        assert!(!matches_any(&held, &[], None));
    }
}
