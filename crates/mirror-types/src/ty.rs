//! Core descriptor definitions for the Mirror type system

use std::fmt;

use crate::kind::Kind;
use crate::tag::StructTag;

/// Unique identifier for a type in the type context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// The invalid type (kind [`Kind::Invalid`])
    pub const INVALID: TypeId = TypeId(0);
    /// `bool`
    pub const BOOL: TypeId = TypeId(1);
    /// `int`
    pub const INT: TypeId = TypeId(2);
    /// `float64`
    pub const FLOAT64: TypeId = TypeId(3);
    /// `string`
    pub const STRING: TypeId = TypeId(4);
    /// The empty interface, satisfied by every type
    pub const ANY: TypeId = TypeId(5);

    /// Index into the context's descriptor table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Whether a field or method name is visible outside its defining scope.
///
/// Names starting with an uppercase letter are exported.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// How a method receives its receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverMode {
    /// Receives a copy; part of both the value and pointer method sets
    Value,
    /// Receives a pointer; only part of the pointer method set
    Pointer,
}

/// Parameter and result types of a function or method
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Parameter types, in order
    pub params: Vec<TypeId>,
    /// Result types, in order
    pub results: Vec<TypeId>,
}

impl Signature {
    /// Create a signature
    pub fn new(params: impl Into<Vec<TypeId>>, results: impl Into<Vec<TypeId>>) -> Self {
        Self {
            params: params.into(),
            results: results.into(),
        }
    }
}

/// A struct field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name (the type name for embedded fields)
    pub name: String,
    /// Position within the struct
    pub index: usize,
    /// Byte offset from the start of the struct
    pub offset: usize,
    /// Declared type
    pub ty: TypeId,
    /// Visibility flag
    pub exported: bool,
    /// Embedded field
    pub anonymous: bool,
    /// Field tag
    pub tag: StructTag,
}

/// A method declared on a named type, or required by an interface
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    /// Method name
    pub name: String,
    /// Position in the declaring type's name-sorted method list
    pub index: usize,
    /// Receiver mode
    pub receiver: ReceiverMode,
    /// Visibility flag
    pub exported: bool,
    /// Parameter and result types, receiver excluded
    pub signature: Signature,
}

/// Runtime description of one type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Identity in the owning context
    pub id: TypeId,
    /// Display name: the declared name for named types, a type expression
    /// such as `*User` or `[]int` otherwise
    pub name: String,
    /// Whether the type was declared with a name
    pub named: bool,
    /// Underlying kind
    pub kind: Kind,
    /// Size in bytes
    pub size: usize,
    /// Alignment in bytes
    pub align: usize,
    /// Element type for pointers and slices
    pub elem: Option<TypeId>,
    /// Fields, for struct kinds
    pub fields: Vec<FieldDescriptor>,
    /// Declared methods (named types) or required methods (interfaces),
    /// sorted by name
    pub methods: Vec<MethodDescriptor>,
    /// Signature, for function kinds
    pub signature: Option<Signature>,
}

impl TypeDescriptor {
    pub(crate) fn unnamed(id: TypeId, name: String, kind: Kind) -> Self {
        let (size, align) = kind.layout().unwrap_or((0, 1));
        Self {
            id,
            name,
            named: false,
            kind,
            size,
            align,
            elem: None,
            fields: Vec::new(),
            methods: Vec::new(),
            signature: None,
        }
    }

    /// Descriptor of the invalid sentinel type
    pub fn invalid() -> Self {
        Self::unnamed(TypeId::INVALID, "invalid".to_string(), Kind::Invalid)
    }

    /// Number of fields (zero for non-struct kinds)
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Direct field by name (no promotion through embedded fields)
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared or required method by name
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Parameter count, for function kinds
    pub fn num_in(&self) -> usize {
        self.signature.as_ref().map_or(0, |s| s.params.len())
    }

    /// Result count, for function kinds
    pub fn num_out(&self) -> usize {
        self.signature.as_ref().map_or(0, |s| s.results.len())
    }

    /// Whether this is the invalid sentinel
    pub fn is_invalid(&self) -> bool {
        self.kind == Kind::Invalid
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_exported() {
        assert!(is_exported("UserName"));
        assert!(!is_exported("age"));
        assert!(!is_exported("_Hidden"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_signature_new() {
        let sig = Signature::new([TypeId::INT, TypeId::INT], [TypeId::STRING]);
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.results, vec![TypeId::STRING]);
    }

    #[test]
    fn test_unnamed_descriptor_layout() {
        let desc = TypeDescriptor::unnamed(TypeId(9), "[]int".to_string(), Kind::Slice);
        assert_eq!(desc.size, 24);
        assert_eq!(desc.align, 8);
        assert!(!desc.named);
        assert_eq!(desc.num_fields(), 0);
        assert_eq!(desc.num_in(), 0);
    }
}
