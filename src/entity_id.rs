//! Principal and role identifiers.
//!
//! Ids are compared in normalized form: surrounding whitespace trimmed and
//! ASCII lowercased, so `" 64F0A1 "` and `"64f0a1"` are the same id.
//! Generated ids are 24 lowercase hex chars (12 random bytes).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Random bytes in a generated id
pub const ID_BYTES: usize = 12;

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

fn random_hex() -> Result<String> {
    let mut bytes = [0u8; ID_BYTES];
    getrandom::getrandom(&mut bytes).map_err(|e| Error::Storage(format!("id generation failed: {}", e)))?;
    Ok(hex::encode(bytes))
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                $name(normalize(id.as_ref()))
            }

            /// Fresh random id
            pub fn generate() -> Result<Self> {
                Ok($name(random_hex()?))
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[inline]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identity of a principal (user)
    PrincipalId
}

string_id! {
    /// Identity of a role
    RoleId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_comparison() {
        assert_eq!(PrincipalId::new(" 64F0A1 "), PrincipalId::new("64f0a1"));
        assert_ne!(PrincipalId::new("a"), PrincipalId::new("b"));
        assert!(PrincipalId::new("   ").is_empty());
    }

    #[test]
    fn generated_ids_are_hex_and_distinct() {
        let a = RoleId::generate().unwrap();
        let b = RoleId::generate().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), ID_BYTES * 2);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn deserialization_normalizes() {
        let id: PrincipalId = serde_json::from_str("\"ABC\"").unwrap();
        assert_eq!(id.as_str(), "abc");
    }
}
