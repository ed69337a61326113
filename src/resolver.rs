//! Effective permission resolution and fail-closed permission checks

use std::fmt;

use crate::entity::Principal;
use crate::entity_id::PrincipalId;
use crate::error::Result;
use crate::matcher::{matches, AuthzContext};
use crate::permission::{Permission, PermissionSet};
use crate::store::Store;

/// Why a check was denied. Kept out of error messages returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    PrincipalMissing,
    PrincipalInactive,
    /// Resolved permissions do not satisfy the requirement
    NotHeld,
    /// Storage failed; denied rather than guessed
    LookupFailed,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DenyReason::PrincipalMissing => "principal missing",
            DenyReason::PrincipalInactive => "principal inactive",
            DenyReason::NotHeld => "not held",
            DenyReason::LookupFailed => "lookup failed",
        })
    }
}

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    Denied(DenyReason),
}

impl Decision {
    #[inline]
    pub fn is_granted(self) -> bool {
        self == Decision::Granted
    }
}

/// Computes what a principal may do, reading roles through a [`Store`]
pub struct Resolver<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<S: Store + ?Sized> Clone for Resolver<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Store + ?Sized> Copy for Resolver<'_, S> {}

impl<'a, S: Store + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Resolver { store }
    }

    /// Union of the permissions of every active assigned role and the direct grants.
    ///
    /// Missing and inactive roles contribute nothing. The principal's own active
    /// flag is not consulted here; see [`Resolver::decide`].
    pub fn effective_permissions(&self, principal: &Principal) -> Result<PermissionSet> {
        let mut set = PermissionSet::new();
        for role_id in &principal.roles {
            match self.store.find_role(role_id)? {
                Some(role) if role.is_active => set.extend(role.permissions),
                Some(_) => tracing::trace!(role = %role_id, "skipping inactive role"),
                None => tracing::debug!(role = %role_id, principal = %principal.id, "dangling role reference"),
            }
        }
        set.extend(principal.direct_permissions.iter().cloned());
        Ok(set)
    }

    /// Effective permissions by id; `None` for a missing principal, empty for an inactive one
    pub fn effective_for(&self, principal_id: &PrincipalId) -> Result<Option<PermissionSet>> {
        match self.store.find_principal(principal_id)? {
            Some(p) if p.is_active => self.effective_permissions(&p).map(Some),
            Some(_) => Ok(Some(PermissionSet::new())),
            None => Ok(None),
        }
    }

    /// Effective permissions by id, empty on any failure
    pub fn permissions_of(&self, principal_id: &PrincipalId) -> PermissionSet {
        match self.effective_for(principal_id) {
            Ok(set) => set.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(principal = %principal_id, error = %e, "permission lookup failed");
                PermissionSet::new()
            }
        }
    }

    /// Typed permission check. Never fails: storage errors deny.
    ///
    /// `context.user_id` defaults to `principal_id` when not set.
    pub fn decide(
        &self,
        principal_id: &PrincipalId,
        required: &Permission,
        context: Option<&AuthzContext>,
    ) -> Decision {
        let decision = match self.try_decide(principal_id, required, context) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(
                    principal = %principal_id,
                    permission = %required,
                    error = %e,
                    "permission check failed closed"
                );
                Decision::Denied(DenyReason::LookupFailed)
            }
        };
        tracing::debug!(principal = %principal_id, permission = %required, ?decision, "permission check");
        decision
    }

    /// `decide` reduced to a boolean
    pub fn check_permission(
        &self,
        principal_id: &PrincipalId,
        required: &Permission,
        context: Option<&AuthzContext>,
    ) -> bool {
        self.decide(principal_id, required, context).is_granted()
    }

    fn try_decide(
        &self,
        principal_id: &PrincipalId,
        required: &Permission,
        context: Option<&AuthzContext>,
    ) -> Result<Decision> {
        let principal = match self.store.find_principal(principal_id)? {
            Some(p) => p,
            None => return Ok(Decision::Denied(DenyReason::PrincipalMissing)),
        };
        if !principal.is_active {
            return Ok(Decision::Denied(DenyReason::PrincipalInactive));
        }

        let held = self.effective_permissions(&principal)?;
        let mut ctx = context.cloned().unwrap_or_default();
        if ctx.user_id.is_none() {
            ctx.user_id = Some(principal_id.clone());
        }

        Ok(if matches(&held, required, Some(&ctx)) {
            Decision::Granted
        } else {
            Decision::Denied(DenyReason::NotHeld)
        })
    }
}
