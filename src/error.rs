//! Error types for rolegate

use thiserror::Error;

/// The main error type for rolegate operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No resolved principal where one is required.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated, but the required permission is not held.
    #[error("you don't have permission: {permission}")]
    Forbidden { permission: String },

    /// A referenced role or principal does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The identifier is not a member of the permission catalog.
    #[error("invalid permission: {0}")]
    InvalidPermission(String),

    /// Malformed input such as an empty or overlong role name.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Immutability or uniqueness violation (system roles, duplicate names).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Settings could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn role_not_found(id: impl ToString) -> Self {
        Error::NotFound { kind: "role", id: id.to_string() }
    }

    pub fn principal_not_found(id: impl ToString) -> Self {
        Error::NotFound { kind: "principal", id: id.to_string() }
    }

    /// Errors that must not be shown to callers verbatim
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Config(_))
    }
}

/// Result type alias for rolegate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Convert any storage-side error to `Error::Storage`
pub fn err<E: std::error::Error>(e: E) -> Error {
    Error::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_names_the_permission() {
        let e = Error::Forbidden { permission: "post.delete".into() };
        assert!(e.to_string().contains("post.delete"));
        assert!(!e.is_internal());
    }

    #[test]
    fn not_found_display() {
        assert_eq!(Error::role_not_found("abc").to_string(), "role not found: abc");
        assert_eq!(Error::principal_not_found("u1").to_string(), "principal not found: u1");
    }

    #[test]
    fn storage_is_internal() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert!(err(io).is_internal());
    }
}
