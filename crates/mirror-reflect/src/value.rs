//! Runtime value representation
//!
//! Storage is a tree of [`Slot`]s. A struct owns one slot per field so a
//! field handle can point straight at its storage; a pointer shares the slot
//! of its target; a slice shares a backing array of slots.
//!
//! `Clone` follows assignment semantics rather than `Rc` semantics: cloning a
//! struct allocates fresh field storage, while pointers and slices keep
//! sharing what they refer to.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mirror_types::{Kind, TypeContext, TypeId};

use crate::dispatch::NativeFn;
use crate::handle::ValueHandle;

/// Shared, mutable storage cell for one value
pub type Slot = Rc<RefCell<Value>>;

/// Allocate a new slot holding `value`
pub fn new_slot(value: Value) -> Slot {
    Rc::new(RefCell::new(value))
}

/// Overwrite the contents of `slot`.
///
/// Struct field storage is reused so existing handles to those fields
/// observe the write.
pub(crate) fn assign(slot: &Slot, value: Value) {
    let mut current = slot.borrow_mut();
    if let (Value::Struct(dst), Value::Struct(src)) = (&*current, &value) {
        if dst.len() == src.len() {
            for (d, s) in dst.iter().zip(src) {
                let incoming = s.borrow().clone();
                assign(d, incoming);
            }
            return;
        }
    }
    *current = value;
}

/// A runtime value
#[derive(Debug)]
pub enum Value {
    /// `bool`
    Bool(bool),
    /// Any int-kinded type
    Int(i64),
    /// Any float64-kinded type
    Float(f64),
    /// Any string-kinded type
    String(String),
    /// Struct fields in declaration order
    Struct(Vec<Slot>),
    /// Interface holding a dynamic value, or nil
    Interface(Option<Box<Dynamic>>),
    /// Pointer to a slot, or nil
    Ptr(Option<Slot>),
    /// Slice header
    Slice(SliceValue),
    /// Function value, or nil
    Func(Option<FuncValue>),
}

/// Dynamic value stored in an interface
#[derive(Debug, Clone)]
pub struct Dynamic {
    /// Concrete type of the value
    pub ty: TypeId,
    /// The value itself
    pub value: Value,
}

/// Slice header: a view of the first `len` slots of a shared backing array.
///
/// Capacity is the length of the backing array.
#[derive(Debug, Clone, Default)]
pub struct SliceValue {
    array: Option<Rc<RefCell<Vec<Slot>>>>,
    len: usize,
}

impl SliceValue {
    /// The nil slice
    pub fn nil() -> Self {
        Self::default()
    }

    /// Slice over `array` showing its first `len` elements
    pub fn from_array(array: Vec<Slot>, len: usize) -> Self {
        let len = len.min(array.len());
        Self {
            array: Some(Rc::new(RefCell::new(array))),
            len,
        }
    }

    /// Whether this is the nil slice
    pub fn is_nil(&self) -> bool {
        self.array.is_none()
    }

    /// Number of visible elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no elements are visible
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing array
    pub fn cap(&self) -> usize {
        self.array.as_ref().map_or(0, |a| a.borrow().len())
    }

    /// Slot of element `index`, if visible
    pub fn get(&self, index: usize) -> Option<Slot> {
        if index >= self.len {
            return None;
        }
        self.array.as_ref().and_then(|a| a.borrow().get(index).cloned())
    }

    /// Slots of the visible elements
    pub fn elements(&self) -> Vec<Slot> {
        self.array
            .as_ref()
            .map(|a| a.borrow().iter().take(self.len).cloned().collect())
            .unwrap_or_default()
    }

    /// Same backing array with a different length (caller checks capacity)
    pub(crate) fn with_len(&self, len: usize) -> Self {
        Self {
            array: self.array.clone(),
            len,
        }
    }
}

/// A callable function value, optionally bound to a receiver
#[derive(Clone)]
pub struct FuncValue {
    /// Function type
    pub ty: TypeId,
    /// Function or method name
    pub name: String,
    /// Bound receiver; invalid for free functions
    pub receiver: ValueHandle,
    pub(crate) body: NativeFn,
}

impl fmt::Debug for FuncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncValue")
            .field("ty", &self.ty)
            .field("name", &self.name)
            .field("bound", &self.receiver.is_valid())
            .finish()
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(i) => Value::Int(*i),
            Value::Float(x) => Value::Float(*x),
            Value::String(s) => Value::String(s.clone()),
            Value::Struct(fields) => Value::Struct(
                fields
                    .iter()
                    .map(|slot| new_slot(slot.borrow().clone()))
                    .collect(),
            ),
            Value::Interface(dynamic) => Value::Interface(dynamic.clone()),
            Value::Ptr(target) => Value::Ptr(target.clone()),
            Value::Slice(slice) => Value::Slice(slice.clone()),
            Value::Func(func) => Value::Func(func.clone()),
        }
    }
}

impl Value {
    /// Zero value of `ty`; `None` for the invalid type
    pub fn zero(types: &TypeContext, ty: TypeId) -> Option<Value> {
        let desc = types.get(ty)?;
        let value = match desc.kind {
            Kind::Invalid => return None,
            Kind::Bool => Value::Bool(false),
            Kind::Int => Value::Int(0),
            Kind::Float64 => Value::Float(0.0),
            Kind::String => Value::String(String::new()),
            Kind::Struct => {
                let mut fields = Vec::with_capacity(desc.fields.len());
                for field in &desc.fields {
                    fields.push(new_slot(Value::zero(types, field.ty)?));
                }
                Value::Struct(fields)
            }
            Kind::Interface => Value::Interface(None),
            Kind::Ptr => Value::Ptr(None),
            Kind::Slice => Value::Slice(SliceValue::nil()),
            Kind::Func => Value::Func(None),
        };
        Some(value)
    }

    /// Whether this is the zero value of its type
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            // -0.0 is not the zero value
            Value::Float(x) => x.to_bits() == 0,
            Value::String(s) => s.is_empty(),
            Value::Struct(fields) => fields.iter().all(|f| f.borrow().is_zero()),
            Value::Interface(dynamic) => dynamic.is_none(),
            Value::Ptr(target) => target.is_none(),
            Value::Slice(slice) => slice.is_nil(),
            Value::Func(func) => func.is_none(),
        }
    }

    /// Whether this value is nil; false for kinds that cannot be nil
    pub fn is_nil(&self) -> bool {
        match self {
            Value::Interface(dynamic) => dynamic.is_none(),
            Value::Ptr(target) => target.is_none(),
            Value::Slice(slice) => slice.is_nil(),
            Value::Func(func) => func.is_none(),
            _ => false,
        }
    }

    /// The kind this representation belongs to
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float64,
            Value::String(_) => Kind::String,
            Value::Struct(_) => Kind::Struct,
            Value::Interface(_) => Kind::Interface,
            Value::Ptr(_) => Kind::Ptr,
            Value::Slice(_) => Kind::Slice,
            Value::Func(_) => Kind::Func,
        }
    }

    /// The value itself, or the dynamic value when this is a non-nil interface
    pub fn concrete(&self) -> &Value {
        match self {
            Value::Interface(Some(dynamic)) => dynamic.value.concrete(),
            other => other,
        }
    }

    fn fmt_depth(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Struct(fields) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    field.borrow().fmt_depth(f, depth + 1)?;
                }
                f.write_str("}")
            }
            Value::Interface(None) | Value::Ptr(None) | Value::Func(None) => f.write_str("<nil>"),
            Value::Interface(Some(dynamic)) => dynamic.value.fmt_depth(f, depth),
            Value::Ptr(Some(target)) => {
                let inner = target.borrow();
                if depth == 0 && matches!(*inner, Value::Struct(_) | Value::Slice(_)) {
                    f.write_str("&")?;
                    inner.fmt_depth(f, depth + 1)
                } else {
                    write!(f, "{:p}", Rc::as_ptr(target))
                }
            }
            Value::Slice(slice) => {
                f.write_str("[")?;
                for (i, element) in slice.elements().iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    element.borrow().fmt_depth(f, depth + 1)?;
                }
                f.write_str("]")
            }
            Value::Func(Some(func)) => write!(f, "{:p}", Rc::as_ptr(&func.body)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_depth(f, 0)
    }
}
