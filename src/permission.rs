//! Structured permission identifier: `resource.action[.condition]`
//!
//! Parsing is total. A malformed string still produces a `Permission`, it is
//! just not well-formed, and the matcher treats it as matching nothing.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::vocabulary::{Action, Condition, Resource};

/// Set of held permissions. Duplicates collapse, order is irrelevant.
pub type PermissionSet = BTreeSet<Permission>;

/// A single permission identifier.
///
/// Equality, ordering and hashing use the identifier string exactly.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Permission {
    raw: String,
    resource: Option<Resource>,
    action: Option<Action>,
    condition: Option<Condition>,
    well_formed: bool,
}

impl Permission {
    /// Parse an identifier, splitting on `.`.
    ///
    /// # Example
    /// ```
    /// use rolegate::{Action, Condition, Permission, Resource};
    ///
    /// let p = Permission::parse("post.update.own");
    /// assert_eq!(p.resource(), Some(Resource::Post));
    /// assert_eq!(p.action(), Some(Action::Update));
    /// assert_eq!(p.condition(), Some(Condition::Own));
    ///
    /// assert!(!Permission::parse("post").is_well_formed());
    /// ```
    pub fn parse(s: &str) -> Self {
        let parts: Vec<&str> = s.split('.').collect();
        let (resource, action, condition, shape_ok) = match parts.as_slice() {
            [r, a] => (r.parse().ok(), a.parse().ok(), None, true),
            [r, a, c] => {
                let cond = c.parse::<Condition>().ok();
                (r.parse().ok(), a.parse().ok(), cond, cond.is_some())
            }
            _ => (None, None, None, false),
        };
        Permission {
            raw: s.to_string(),
            well_formed: shape_ok && resource.is_some() && action.is_some(),
            resource,
            action,
            condition,
        }
    }

    /// Build from typed parts; always well-formed
    pub fn new(resource: Resource, action: Action, condition: Option<Condition>) -> Self {
        let raw = match condition {
            Some(c) => format!("{}.{}.{}", resource, action, c),
            None => format!("{}.{}", resource, action),
        };
        Permission { raw, resource: Some(resource), action: Some(action), condition, well_formed: true }
    }

    #[inline]
    pub fn resource(&self) -> Option<Resource> {
        self.resource
    }

    #[inline]
    pub fn action(&self) -> Option<Action> {
        self.action
    }

    #[inline]
    pub fn condition(&self) -> Option<Condition> {
        self.condition
    }

    /// True when resource and action are known and the condition, if any, is `own`
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.well_formed
    }

    #[inline]
    pub fn is_own(&self) -> bool {
        self.condition == Some(Condition::Own)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permission({:?})", self.raw)
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Permission {}

impl PartialOrd for Permission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Permission {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Hash for Permission {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

// Lets `PermissionSet::contains("post.read")` work
impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Permission {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Permission::parse(s))
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Permission::parse(s)
    }
}

impl From<String> for Permission {
    fn from(s: String) -> Self {
        Permission::parse(&s)
    }
}

impl From<Permission> for String {
    fn from(p: Permission) -> Self {
        p.raw
    }
}
