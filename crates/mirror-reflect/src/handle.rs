//! Value handles
//!
//! A [`ValueHandle`] is what the facade hands out: a view of one storage
//! slot together with its static type and two access flags.
//!
//! - `addressable`: the slot is the caller's real storage (reached through a
//!   pointer, a slice element, or a fresh instance), so writes are observable.
//! - `read_only`: the slot was reached through an unexported field.
//!
//! Read-only status reached through an unexported embedded field stops at
//! that field: exported fields promoted out of it stay settable. Only a
//! plain unexported field makes everything below it read-only, which is
//! what the `sticky` bit tracks.

use std::fmt;

use mirror_types::{Kind, TypeId};

use crate::convert::FromValue;
use crate::error::{ReflectError, ReflectResult};
use crate::value::{new_slot, Slot, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flags {
    pub addressable: bool,
    pub read_only: bool,
    pub sticky: bool,
}

impl Flags {
    pub const DETACHED: Flags = Flags {
        addressable: false,
        read_only: false,
        sticky: false,
    };

    pub const ADDRESSABLE: Flags = Flags {
        addressable: true,
        read_only: false,
        sticky: false,
    };

    /// Same visibility, different addressability
    pub fn with_addressable(self, addressable: bool) -> Flags {
        Flags {
            addressable,
            ..self
        }
    }

    /// Flags of a field reached from a value with these flags
    pub fn for_field(self, exported: bool, embedded: bool) -> Flags {
        Flags {
            addressable: self.addressable,
            read_only: self.sticky || !exported,
            sticky: self.sticky || (!exported && !embedded),
        }
    }
}

#[derive(Debug, Clone)]
struct Repr {
    ty: TypeId,
    kind: Kind,
    slot: Slot,
    flags: Flags,
}

/// Runtime handle wrapping a typed value
#[derive(Debug, Clone, Default)]
pub struct ValueHandle {
    repr: Option<Repr>,
}

impl ValueHandle {
    /// The invalid handle (wraps no value)
    pub fn invalid() -> Self {
        Self { repr: None }
    }

    pub(crate) fn from_slot(ty: TypeId, kind: Kind, slot: Slot, flags: Flags) -> Self {
        Self {
            repr: Some(Repr {
                ty,
                kind,
                slot,
                flags,
            }),
        }
    }

    /// Non-addressable handle over a private copy of `value`
    pub(crate) fn detached(ty: TypeId, kind: Kind, value: Value) -> Self {
        Self::from_slot(ty, kind, new_slot(value), Flags::DETACHED)
    }

    fn repr(&self, operation: &'static str) -> ReflectResult<&Repr> {
        self.repr.as_ref().ok_or_else(|| ReflectError::invalid(operation))
    }

    pub(crate) fn slot(&self, operation: &'static str) -> ReflectResult<&Slot> {
        self.repr(operation).map(|r| &r.slot)
    }

    pub(crate) fn flags(&self) -> Flags {
        self.repr.as_ref().map_or(Flags::DETACHED, |r| r.flags)
    }

    /// Whether the handle wraps a value
    pub fn is_valid(&self) -> bool {
        self.repr.is_some()
    }

    /// Static type; [`TypeId::INVALID`] for the invalid handle
    pub fn type_id(&self) -> TypeId {
        self.repr.as_ref().map_or(TypeId::INVALID, |r| r.ty)
    }

    /// Kind of the static type; [`Kind::Invalid`] for the invalid handle
    pub fn kind(&self) -> Kind {
        self.repr.as_ref().map_or(Kind::Invalid, |r| r.kind)
    }

    /// Whether writes through this handle reach the original storage
    pub fn can_addr(&self) -> bool {
        self.flags().addressable
    }

    /// Whether this handle can be assigned to
    pub fn can_set(&self) -> bool {
        let flags = self.flags();
        flags.addressable && !flags.read_only
    }

    /// Whether the wrapped value is nil.
    ///
    /// Kinds that cannot be nil report `false`.
    pub fn is_nil(&self) -> ReflectResult<bool> {
        let repr = self.repr("is_nil")?;
        let nil = repr.slot.borrow().is_nil();
        Ok(nil)
    }

    /// Whether the wrapped value is the zero value of its type
    pub fn is_zero(&self) -> ReflectResult<bool> {
        let repr = self.repr("is_zero")?;
        let zero = repr.slot.borrow().is_zero();
        Ok(zero)
    }

    /// Copy of the wrapped value
    pub fn value(&self) -> ReflectResult<Value> {
        let repr = self.repr("value")?;
        let value = repr.slot.borrow().clone();
        Ok(value)
    }

    /// Convert the wrapped value into a Rust value
    pub fn get<T: FromValue>(&self) -> ReflectResult<T> {
        let repr = self.repr("get")?;
        let value = repr.slot.borrow();
        T::from_value(&value)
    }

    /// Whether both handles view the same storage
    pub fn same_storage(&self, other: &ValueHandle) -> bool {
        match (&self.repr, &other.repr) {
            (Some(a), Some(b)) => std::rc::Rc::ptr_eq(&a.slot, &b.slot),
            _ => false,
        }
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Some(repr) => write!(f, "{}", repr.slot.borrow()),
            None => f.write_str("<invalid value>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_handle() {
        let h = ValueHandle::invalid();
        assert!(!h.is_valid());
        assert_eq!(h.kind(), Kind::Invalid);
        assert_eq!(h.type_id(), TypeId::INVALID);
        assert!(!h.can_addr());
        assert!(matches!(h.is_nil(), Err(ReflectError::InvalidState { .. })));
        assert!(matches!(h.is_zero(), Err(ReflectError::InvalidState { .. })));
        assert_eq!(h.to_string(), "<invalid value>");
    }

    #[test]
    fn test_detached_handle() {
        let h = ValueHandle::detached(TypeId::INT, Kind::Int, Value::Int(0));
        assert!(h.is_valid());
        assert!(!h.can_addr());
        assert!(!h.can_set());
        assert_eq!(h.is_nil(), Ok(false));
        assert_eq!(h.is_zero(), Ok(true));
        assert_eq!(h.get::<i64>(), Ok(0));
    }

    #[test]
    fn test_flags() {
        let slot = new_slot(Value::String("x".to_string()));
        let h = ValueHandle::from_slot(
            TypeId::STRING,
            Kind::String,
            slot.clone(),
            Flags::ADDRESSABLE.for_field(false, false),
        );
        assert!(h.can_addr());
        assert!(!h.can_set());

        let other = ValueHandle::from_slot(TypeId::STRING, Kind::String, slot, Flags::ADDRESSABLE);
        assert!(other.can_set());
        assert!(h.same_storage(&other));
    }

    #[test]
    fn test_embedded_read_only_does_not_stick() {
        let embedded = Flags::ADDRESSABLE.for_field(false, true);
        assert!(embedded.read_only);
        assert!(!embedded.for_field(true, false).read_only);
        assert!(embedded.for_field(false, false).read_only);

        let hidden = Flags::ADDRESSABLE.for_field(false, false);
        assert!(hidden.for_field(true, false).read_only);
        assert!(hidden.for_field(true, true).for_field(true, false).read_only);
        assert!(hidden.with_addressable(false).read_only);
    }
}
