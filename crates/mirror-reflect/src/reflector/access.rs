//! Field access, pointer traversal and assignment

use mirror_types::{FieldDescriptor, Kind, TypeId};
use tracing::trace;

use super::Reflector;
use crate::error::{ReflectError, ReflectResult};
use crate::handle::ValueHandle;
use crate::permissions::ReflectPermission;
use crate::value::{assign, new_slot, Value};

impl Reflector {
    // ========================================================================
    // Field reads
    // ========================================================================

    /// Field of a struct handle by name, including promoted fields.
    ///
    /// The result is addressable when `handle` is, and read-only when the
    /// field is not visible or sits below a non-embedded unexported field.
    pub fn field_by_name(&self, handle: &ValueHandle, name: &str) -> ReflectResult<ValueHandle> {
        let (field, _) = self.resolve_field(handle, name, "field_by_name")?;
        self.require(handle.type_id(), ReflectPermission::READ)?;
        trace!(type_name = %self.types.name(handle.type_id()), field = name, "field read");
        Ok(field)
    }

    /// Field `index` of a struct handle
    pub fn field(&self, handle: &ValueHandle, index: usize) -> ReflectResult<ValueHandle> {
        self.struct_type(handle, "field")?;
        let field = self.field_at(handle, index, "field")?;
        self.require(handle.type_id(), ReflectPermission::READ)?;
        Ok(field)
    }

    /// Field reached by an index path through embedded structs
    pub fn field_by_index(
        &self,
        handle: &ValueHandle,
        path: &[usize],
    ) -> ReflectResult<ValueHandle> {
        self.struct_type(handle, "field_by_index")?;
        let mut current = handle.clone();
        for &index in path {
            current = self.field_at(&current, index, "field_by_index")?;
        }
        self.require(handle.type_id(), ReflectPermission::READ)?;
        Ok(current)
    }

    /// Resolve a field without visibility or permission checks
    pub(crate) fn resolve_field(
        &self,
        handle: &ValueHandle,
        name: &str,
        operation: &'static str,
    ) -> ReflectResult<(ValueHandle, FieldDescriptor)> {
        let ty = self.struct_type(handle, operation)?;
        let (path, field) = self
            .types
            .find_field(ty, name)
            .ok_or_else(|| ReflectError::not_found("field", name))?;

        let mut current = handle.clone();
        for &index in &path {
            current = self.field_at(&current, index, operation)?;
        }
        Ok((current, field))
    }

    fn struct_type(&self, handle: &ValueHandle, operation: &'static str) -> ReflectResult<TypeId> {
        if !handle.is_valid() {
            return Err(ReflectError::invalid(operation));
        }
        if handle.kind() != Kind::Struct {
            return Err(ReflectError::mismatch("struct", handle.kind().to_string()));
        }
        Ok(handle.type_id())
    }

    /// Direct field `index`, dereferencing an embedded pointer first
    fn field_at(
        &self,
        handle: &ValueHandle,
        index: usize,
        operation: &'static str,
    ) -> ReflectResult<ValueHandle> {
        let owner = if handle.kind() == Kind::Ptr {
            self.deref_pointer(handle, operation)?
        } else {
            handle.clone()
        };

        let desc = self.types.resolve(owner.type_id())?;
        if desc.kind != Kind::Struct {
            return Err(ReflectError::mismatch("struct", desc.name.clone()));
        }
        let field = desc.fields.get(index).ok_or(ReflectError::OutOfRange {
            index,
            bound: desc.fields.len(),
        })?;

        let slot = {
            let storage = owner.slot(operation)?.borrow();
            match &*storage {
                Value::Struct(fields) => fields.get(index).cloned(),
                _ => None,
            }
        };
        let slot = slot.ok_or_else(|| ReflectError::InvalidState {
            operation,
            detail: format!("{} value has no field {}", desc.name, index),
        })?;

        let flags = owner.flags().for_field(field.exported, field.anonymous);
        Ok(ValueHandle::from_slot(field.ty, self.types.kind(field.ty), slot, flags))
    }

    // ========================================================================
    // Pointers
    // ========================================================================

    /// Target of a non-nil pointer; always addressable
    fn deref_pointer(
        &self,
        handle: &ValueHandle,
        operation: &'static str,
    ) -> ReflectResult<ValueHandle> {
        let elem = self
            .types
            .elem(handle.type_id())
            .ok_or_else(|| ReflectError::mismatch("ptr", handle.kind().to_string()))?;
        let target = match &*handle.slot(operation)?.borrow() {
            Value::Ptr(target) => target.clone(),
            other => return Err(ReflectError::mismatch("ptr", other.kind().to_string())),
        };
        let slot = target.ok_or_else(|| ReflectError::InvalidState {
            operation,
            detail: "nil pointer dereference".to_string(),
        })?;
        let flags = handle.flags().with_addressable(true);
        Ok(ValueHandle::from_slot(elem, self.types.kind(elem), slot, flags))
    }

    /// The handle a method body operates on: the pointer target for
    /// pointer receivers, the receiver itself otherwise
    pub(crate) fn deref_receiver(&self, receiver: &ValueHandle) -> ReflectResult<ValueHandle> {
        if receiver.kind() == Kind::Ptr {
            self.deref_pointer(receiver, "receiver")
        } else if receiver.is_valid() {
            Ok(receiver.clone())
        } else {
            Err(ReflectError::invalid("receiver"))
        }
    }

    /// Value a pointer points to, or the dynamic value of an interface.
    ///
    /// A pointer target is addressable; an interface's dynamic value is a
    /// copy. Nil pointers and nil interfaces yield the invalid handle.
    pub fn elem(&self, handle: &ValueHandle) -> ReflectResult<ValueHandle> {
        match handle.kind() {
            Kind::Ptr => {
                if handle.is_nil()? {
                    return Ok(ValueHandle::invalid());
                }
                self.deref_pointer(handle, "elem")
            }
            Kind::Interface => {
                let dynamic = match &*handle.slot("elem")?.borrow() {
                    Value::Interface(dynamic) => dynamic.clone(),
                    other => {
                        return Err(ReflectError::mismatch(
                            "interface",
                            other.kind().to_string(),
                        ))
                    }
                };
                Ok(match dynamic {
                    Some(dynamic) => {
                        let kind = self.types.kind(dynamic.ty);
                        let flags = handle.flags().with_addressable(false);
                        ValueHandle::from_slot(dynamic.ty, kind, new_slot(dynamic.value), flags)
                    }
                    None => ValueHandle::invalid(),
                })
            }
            Kind::Invalid => Err(ReflectError::invalid("elem")),
            other => Err(ReflectError::mismatch("ptr or interface", other.to_string())),
        }
    }

    /// Pointer to an addressable value
    pub fn addr(&self, handle: &ValueHandle) -> ReflectResult<ValueHandle> {
        let slot = handle.slot("addr")?;
        if !handle.can_addr() {
            return Err(ReflectError::NotAddressable { operation: "addr" });
        }
        let ty = self.types.pointer_to(handle.type_id());
        let flags = handle.flags().with_addressable(false);
        Ok(ValueHandle::from_slot(
            ty,
            Kind::Ptr,
            new_slot(Value::Ptr(Some(slot.clone()))),
            flags,
        ))
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Assign a field of a struct handle.
    ///
    /// Checks, first failure wins: the field exists, it is visible, the
    /// handle is addressable, `WRITE` is granted, the value is assignable
    /// to the field's declared type.
    pub fn set_field(
        &self,
        handle: &ValueHandle,
        name: &str,
        value: &ValueHandle,
    ) -> ReflectResult<()> {
        let (target, _) = self.resolve_field(handle, name, "set_field")?;
        if target.flags().read_only {
            return Err(ReflectError::NotVisible {
                operation: "set_field",
                name: name.to_string(),
            });
        }
        if !target.can_addr() {
            return Err(ReflectError::NotAddressable {
                operation: "set_field",
            });
        }
        self.require(handle.type_id(), ReflectPermission::WRITE)?;
        self.store(&target, value)?;
        trace!(type_name = %self.types.name(handle.type_id()), field = name, "field written");
        Ok(())
    }

    /// Assign `value` to the storage behind `target`
    pub fn set(&self, target: &ValueHandle, value: &ValueHandle) -> ReflectResult<()> {
        self.check_settable(target, "set")?;
        self.store(target, value)
    }

    /// Assign to an int-kinded handle
    pub fn set_int(&self, target: &ValueHandle, value: i64) -> ReflectResult<()> {
        self.set_scalar(target, "set_int", Kind::Int, Value::Int(value))
    }

    /// Assign to a float64-kinded handle
    pub fn set_float(&self, target: &ValueHandle, value: f64) -> ReflectResult<()> {
        self.set_scalar(target, "set_float", Kind::Float64, Value::Float(value))
    }

    /// Assign to a string-kinded handle
    pub fn set_string(&self, target: &ValueHandle, value: &str) -> ReflectResult<()> {
        self.set_scalar(target, "set_string", Kind::String, Value::String(value.to_string()))
    }

    /// Assign to a bool handle
    pub fn set_bool(&self, target: &ValueHandle, value: bool) -> ReflectResult<()> {
        self.set_scalar(target, "set_bool", Kind::Bool, Value::Bool(value))
    }

    fn set_scalar(
        &self,
        target: &ValueHandle,
        operation: &'static str,
        kind: Kind,
        value: Value,
    ) -> ReflectResult<()> {
        self.check_settable(target, operation)?;
        if target.kind() != kind {
            return Err(ReflectError::mismatch(kind.to_string(), target.kind().to_string()));
        }
        assign(target.slot(operation)?, value);
        Ok(())
    }

    /// Visibility, addressability and `WRITE` checks shared by setters
    pub(crate) fn check_settable(
        &self,
        target: &ValueHandle,
        operation: &'static str,
    ) -> ReflectResult<()> {
        if !target.is_valid() {
            return Err(ReflectError::invalid(operation));
        }
        let flags = target.flags();
        if flags.read_only {
            return Err(ReflectError::NotVisible {
                operation,
                name: self.types.name(target.type_id()),
            });
        }
        if !flags.addressable {
            return Err(ReflectError::NotAddressable { operation });
        }
        self.require(target.type_id(), ReflectPermission::WRITE)
    }
}

#[cfg(test)]
mod tests {
    use mirror_types::{StructDef, TypeId};

    use super::*;

    fn setup() -> (Reflector, TypeId) {
        let mut r = Reflector::new();
        let user = r
            .declare_struct(
                StructDef::new("User")
                    .field("Name", TypeId::STRING)
                    .field("private", TypeId::INT),
            )
            .unwrap();
        (r, user)
    }

    #[test]
    fn test_set_field_through_pointer() {
        let (r, user) = setup();
        let ptr = r.new_pointer(user).unwrap();
        let elem = r.elem(&ptr).unwrap();
        assert!(elem.can_addr());

        r.set_field(&elem, "Name", &r.value_of("x")).unwrap();
        let name = r.field_by_name(&elem, "Name").unwrap();
        assert_eq!(name.get::<String>(), Ok("x".to_string()));
        assert_eq!(ptr.to_string(), "&{x 0}");
    }

    #[test]
    fn test_set_field_error_order() {
        let (r, user) = setup();
        let addressable = r.new_instance(user).unwrap();
        let plain = r
            .value_of_typed(user, addressable.value().unwrap())
            .unwrap();

        assert!(matches!(
            r.set_field(&addressable, "Missing", &r.value_of(1i64)),
            Err(ReflectError::NotFound { .. })
        ));
        for handle in [&addressable, &plain] {
            assert!(matches!(
                r.set_field(handle, "private", &r.value_of(5i64)),
                Err(ReflectError::NotVisible { .. })
            ));
        }
        assert_eq!(
            r.set_field(&plain, "Name", &r.value_of("x")),
            Err(ReflectError::NotAddressable {
                operation: "set_field"
            })
        );
        assert!(matches!(
            r.set_field(&addressable, "Name", &r.value_of(1i64)),
            Err(ReflectError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unexported_field_is_read_only() {
        let (r, user) = setup();
        let inst = r.new_instance(user).unwrap();
        let private = r.field_by_name(&inst, "private").unwrap();
        assert!(private.can_addr());
        assert!(!private.can_set());
        assert!(matches!(
            r.set_int(&private, 18),
            Err(ReflectError::NotVisible { .. })
        ));
        assert_eq!(private.get::<i64>(), Ok(0));
    }

    #[test]
    fn test_kind_setters() {
        let (r, user) = setup();
        let inst = r.new_instance(user).unwrap();
        let name = r.field(&inst, 0).unwrap();

        r.set_string(&name, "myl").unwrap();
        assert_eq!(inst.to_string(), "{myl 0}");
        assert_eq!(
            r.set_int(&name, 1),
            Err(ReflectError::TypeMismatch {
                expected: "int".to_string(),
                actual: "string".to_string()
            })
        );
        assert!(matches!(
            r.set_float(&r.value_of(3.4f64), 1.0),
            Err(ReflectError::NotAddressable { .. })
        ));
    }

    #[test]
    fn test_elem_and_addr() {
        let (r, user) = setup();
        let inst = r.new_instance(user).unwrap();

        let ptr = r.addr(&inst).unwrap();
        assert_eq!(r.type_name(ptr.type_id()), "*User");
        assert!(r.elem(&ptr).unwrap().same_storage(&inst));

        let nil = r.value_of_typed(r.pointer_to(user), Value::Ptr(None)).unwrap();
        assert!(!r.elem(&nil).unwrap().is_valid());
        assert!(matches!(
            r.addr(&r.value_of(1i64)),
            Err(ReflectError::NotAddressable { .. })
        ));
        assert!(matches!(
            r.elem(&r.value_of(1i64)),
            Err(ReflectError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_promoted_fields() {
        let mut r = Reflector::new();
        let base = r
            .declare_struct(StructDef::new("Base").field("ID", TypeId::INT))
            .unwrap();
        let derived = r
            .declare_struct(StructDef::new("Derived").embed(base).field("Label", TypeId::STRING))
            .unwrap();

        let inst = r.new_instance(derived).unwrap();
        let id = r.field_by_name(&inst, "ID").unwrap();
        r.set_int(&id, 7).unwrap();
        assert_eq!(r.field_by_index(&inst, &[0, 0]).unwrap().get::<i64>(), Ok(7));
        assert_eq!(inst.to_string(), "{{7} }");
    }

    #[test]
    fn test_fields_promoted_from_unexported_embed() {
        let mut r = Reflector::new();
        let inner = r
            .declare_struct(
                StructDef::new("inner")
                    .field("X", TypeId::INT)
                    .field("y", TypeId::INT),
            )
            .unwrap();
        let outer = r
            .declare_struct(StructDef::new("Outer").embed(inner))
            .unwrap();
        let hidden = r
            .declare_struct(StructDef::new("Hidden").field("detail", outer))
            .unwrap();

        let inst = r.new_instance(outer).unwrap();
        r.set_field(&inst, "X", &r.value_of(5i64)).unwrap();
        assert_eq!(inst.to_string(), "{{5 0}}");
        assert!(matches!(
            r.set_field(&inst, "y", &r.value_of(1i64)),
            Err(ReflectError::NotVisible { .. })
        ));
        let embedded = r.field(&inst, 0).unwrap();
        assert!(!embedded.can_set());
        assert!(r.field(&embedded, 0).unwrap().can_set());

        let nested = r.new_instance(hidden).unwrap();
        let detail = r.field_by_name(&nested, "detail").unwrap();
        assert!(!r.field_by_name(&detail, "X").unwrap().can_set());
    }

    #[test]
    fn test_field_read_permission() {
        let (mut r, user) = setup();
        r.permissions_mut().set_type("User", ReflectPermission::NONE);
        let inst = r.value_of_typed(user, Value::zero(r.types(), user).unwrap()).unwrap();

        assert!(matches!(
            r.field_by_name(&inst, "Missing"),
            Err(ReflectError::NotFound { .. })
        ));
        assert!(matches!(
            r.field_by_name(&inst, "Name"),
            Err(ReflectError::PermissionDenied { .. })
        ));
    }
}
