//! Error types for reflective operations

use mirror_types::TypeError;
use thiserror::Error;

use crate::permissions::ReflectPermission;

/// Result type for reflective operations
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Errors surfaced by the introspection facade.
///
/// Each operation reports the first violated precondition and does no
/// further work.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReflectError {
    /// No field, method or type with that name
    #[error("{what} not found: {name}")]
    NotFound {
        /// What was looked up ("field", "method", ...)
        what: &'static str,
        /// Requested name
        name: String,
    },

    /// Mutation through a handle that does not own addressable storage
    #[error("{operation} using unaddressable value")]
    NotAddressable {
        /// Attempted operation
        operation: &'static str,
    },

    /// Mutation of, or call to, a member that is not exported
    #[error("{operation} using unexported member {name}")]
    NotVisible {
        /// Attempted operation
        operation: &'static str,
        /// Member name
        name: String,
    },

    /// Value of the wrong type or kind
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type or kind
        expected: String,
        /// Actual type or kind
        actual: String,
    },

    /// Wrong number of call arguments
    #[error("{name} expected {expected} arguments but received {received}")]
    ArityMismatch {
        /// Function or method name
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        received: usize,
    },

    /// Index or length outside the valid range
    #[error("Index {index} out of range [0, {bound})")]
    OutOfRange {
        /// Offending index or length
        index: usize,
        /// Exclusive upper bound
        bound: usize,
    },

    /// Operation on an invalid handle, or on a nil value that cannot serve it
    #[error("{operation}: {detail}")]
    InvalidState {
        /// Attempted operation
        operation: &'static str,
        /// What was wrong with the value
        detail: String,
    },

    /// Denied by the permission store
    #[error("Permission denied: {permission} on {type_name}")]
    PermissionDenied {
        /// Type the check was made against
        type_name: String,
        /// Missing permission
        permission: ReflectPermission,
    },

    /// Type declaration failure
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl ReflectError {
    pub(crate) fn invalid(operation: &'static str) -> Self {
        ReflectError::InvalidState {
            operation,
            detail: "invalid value".to_string(),
        }
    }

    pub(crate) fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        ReflectError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn not_found(what: &'static str, name: &str) -> Self {
        ReflectError::NotFound {
            what,
            name: name.to_string(),
        }
    }
}
