//! Type registration errors

use thiserror::Error;

use crate::ty::TypeId;

/// Errors raised while declaring or resolving types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// A type with this name is already declared
    #[error("Duplicate type: {name}")]
    DuplicateType {
        /// Type name
        name: String,
    },

    /// Two fields of one struct share a name
    #[error("Duplicate field {field} in {type_name}")]
    DuplicateField {
        /// Struct name
        type_name: String,
        /// Field name
        field: String,
    },

    /// A method with this name is already declared on the type
    #[error("Duplicate method {method} on {type_name}")]
    DuplicateMethod {
        /// Receiver type name
        type_name: String,
        /// Method name
        method: String,
    },

    /// Type id does not belong to this context
    #[error("Unknown type: {id}")]
    UnknownType {
        /// Offending id
        id: TypeId,
    },

    /// Methods can only be declared on named, non-pointer, non-interface types
    #[error("Invalid receiver type: {type_name}")]
    InvalidReceiver {
        /// Receiver type name
        type_name: String,
    },

    /// Named types cannot be declared over the invalid type
    #[error("Invalid underlying type for {name}")]
    InvalidUnderlying {
        /// Declared name
        name: String,
    },

    /// Embedded fields must name a struct type or a pointer to one
    #[error("Cannot embed {type_name}")]
    InvalidEmbed {
        /// Embedded type name
        type_name: String,
    },
}
