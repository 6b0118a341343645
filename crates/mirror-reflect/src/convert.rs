//! Traits for converting between Mirror values and Rust values.
//!
//! `ToValue` types know their builtin [`TypeId`], so `Reflector::value_of`
//! can wrap them without further annotation. `FromValue` sees through
//! interfaces, mirroring a type assertion on the dynamic value.

use mirror_types::TypeId;

use crate::error::{ReflectError, ReflectResult};
use crate::handle::ValueHandle;
use crate::value::Value;

/// Convert from a Mirror value to a Rust type.
pub trait FromValue: Sized {
    /// Convert, returning `TypeMismatch` if the kinds disagree
    fn from_value(value: &Value) -> ReflectResult<Self>;
}

/// Convert from a Rust type to a Mirror value.
pub trait ToValue {
    /// Builtin type of converted values
    fn static_type() -> TypeId;

    /// Convert to a Value
    fn to_value(self) -> Value;
}

fn mismatch(expected: &str, got: &Value) -> ReflectError {
    ReflectError::mismatch(expected, got.kind().to_string())
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.concrete() {
            Value::Int(i) => Ok(*i),
            other => Err(mismatch("int", other)),
        }
    }
}

impl ToValue for i64 {
    fn static_type() -> TypeId {
        TypeId::INT
    }

    fn to_value(self) -> Value {
        Value::Int(self)
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide)
            .map_err(|_| ReflectError::mismatch("int within i32 range", wide.to_string()))
    }
}

impl ToValue for i32 {
    fn static_type() -> TypeId {
        TypeId::INT
    }

    fn to_value(self) -> Value {
        Value::Int(self as i64)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.concrete() {
            Value::Float(x) => Ok(*x),
            other => Err(mismatch("float64", other)),
        }
    }
}

impl ToValue for f64 {
    fn static_type() -> TypeId {
        TypeId::FLOAT64
    }

    fn to_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.concrete() {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl ToValue for bool {
    fn static_type() -> TypeId {
        TypeId::BOOL
    }

    fn to_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.concrete() {
            Value::String(s) => Ok(s.clone()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl ToValue for String {
    fn static_type() -> TypeId {
        TypeId::STRING
    }

    fn to_value(self) -> Value {
        Value::String(self)
    }
}

impl ToValue for &str {
    fn static_type() -> TypeId {
        TypeId::STRING
    }

    fn to_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        Ok(value.clone())
    }
}

// Slices convert element-wise
impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.concrete() {
            Value::Slice(slice) => slice
                .elements()
                .iter()
                .map(|slot| T::from_value(&slot.borrow()))
                .collect(),
            other => Err(mismatch("slice", other)),
        }
    }
}

/// Convert call argument `index`
pub fn arg<T: FromValue>(args: &[ValueHandle], index: usize) -> ReflectResult<T> {
    args.get(index)
        .ok_or(ReflectError::OutOfRange {
            index,
            bound: args.len(),
        })?
        .get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{new_slot, Dynamic, SliceValue};

    #[test]
    fn test_primitives_round_trip() {
        assert_eq!(i64::from_value(&42i64.to_value()), Ok(42));
        assert_eq!(bool::from_value(&true.to_value()), Ok(true));
        assert_eq!(String::from_value(&"hi".to_value()), Ok("hi".to_string()));
        assert_eq!(f64::from_value(&2.5f64.to_value()), Ok(2.5));
        assert_eq!(<&str as ToValue>::static_type(), TypeId::STRING);
    }

    #[test]
    fn test_kind_mismatch() {
        let err = i64::from_value(&Value::String("x".to_string())).unwrap_err();
        assert_eq!(
            err,
            ReflectError::TypeMismatch {
                expected: "int".to_string(),
                actual: "string".to_string()
            }
        );
    }

    #[test]
    fn test_i32_range() {
        assert_eq!(i32::from_value(&Value::Int(7)), Ok(7));
        assert!(i32::from_value(&Value::Int(i64::MAX)).is_err());
    }

    #[test]
    fn test_sees_through_interface() {
        let boxed = Value::Interface(Some(Box::new(Dynamic {
            ty: TypeId::STRING,
            value: Value::String("tangfire".to_string()),
        })));
        assert_eq!(String::from_value(&boxed), Ok("tangfire".to_string()));
        assert!(String::from_value(&Value::Interface(None)).is_err());
    }

    #[test]
    fn test_slice_to_vec() {
        let slice = Value::Slice(SliceValue::from_array(
            vec![new_slot(Value::Int(1)), new_slot(Value::Int(2)), new_slot(Value::Int(0))],
            2,
        ));
        assert_eq!(Vec::<i64>::from_value(&slice), Ok(vec![1, 2]));
    }
}
