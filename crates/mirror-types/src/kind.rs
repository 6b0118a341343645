//! Type kinds

use std::fmt;

/// The underlying shape of a type, independent of its name.
///
/// A named type such as `MyInt` has kind [`Kind::Int`]; only its
/// [`TypeDescriptor`](crate::TypeDescriptor) remembers the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Sentinel kind of the invalid type (an empty handle)
    Invalid,
    /// `bool`
    Bool,
    /// Signed machine integer
    Int,
    /// IEEE 754 double precision float
    Float64,
    /// UTF-8 string
    String,
    /// Struct with ordered fields
    Struct,
    /// Method set (capability set)
    Interface,
    /// Pointer to an element type
    Ptr,
    /// Growable sequence of an element type
    Slice,
    /// Function value
    Func,
}

impl Kind {
    /// Size and alignment in bytes on a 64-bit target.
    ///
    /// Returns `None` for structs, whose layout depends on their fields.
    pub fn layout(self) -> Option<(usize, usize)> {
        match self {
            Kind::Invalid => Some((0, 1)),
            Kind::Bool => Some((1, 1)),
            Kind::Int | Kind::Float64 | Kind::Ptr | Kind::Func => Some((8, 8)),
            Kind::String | Kind::Interface => Some((16, 8)),
            Kind::Slice => Some((24, 8)),
            Kind::Struct => None,
        }
    }

    /// Whether values of this kind can be nil
    pub fn is_nillable(self) -> bool {
        matches!(self, Kind::Interface | Kind::Ptr | Kind::Slice | Kind::Func)
    }

    /// Whether this is a scalar kind (no inner storage)
    pub fn is_scalar(self) -> bool {
        matches!(self, Kind::Bool | Kind::Int | Kind::Float64 | Kind::String)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float64 => "float64",
            Kind::String => "string",
            Kind::Struct => "struct",
            Kind::Interface => "interface",
            Kind::Ptr => "ptr",
            Kind::Slice => "slice",
            Kind::Func => "func",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(Kind::Invalid.to_string(), "invalid");
        assert_eq!(Kind::Float64.to_string(), "float64");
        assert_eq!(Kind::Interface.to_string(), "interface");
        assert_eq!(Kind::Ptr.to_string(), "ptr");
    }

    #[test]
    fn test_kind_layout() {
        assert_eq!(Kind::String.layout(), Some((16, 8)));
        assert_eq!(Kind::Slice.layout(), Some((24, 8)));
        assert_eq!(Kind::Bool.layout(), Some((1, 1)));
        assert_eq!(Kind::Struct.layout(), None);
    }

    #[test]
    fn test_nillable_kinds() {
        assert!(Kind::Ptr.is_nillable());
        assert!(Kind::Interface.is_nillable());
        assert!(!Kind::Struct.is_nillable());
        assert!(!Kind::Int.is_nillable());
    }
}
