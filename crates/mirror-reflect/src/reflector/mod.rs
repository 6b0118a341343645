//! The introspection facade
//!
//! [`Reflector`] owns the type registry, the method dispatch table and the
//! permission store. Every reflective operation goes through it:
//!
//! - registration: `declare_struct`, `declare_named`, `declare_interface`,
//!   `define_method`, `define_function`
//! - type queries: `describe_type`, `list_fields`, `list_methods`,
//!   `implements`, ...
//! - value access (`access.rs`): fields, pointers, assignment
//! - invocation (`invoke.rs`): method lookup and calls
//! - creation and sequences (`sequence.rs`)

mod access;
mod invoke;
mod sequence;

use std::rc::Rc;

use mirror_types::{
    ConformanceChecker, FieldDescriptor, Kind, MethodDef, MethodDescriptor, Signature,
    StructDef, TypeContext, TypeDescriptor, TypeId,
};
use tracing::debug;

use crate::config::{ConfigError, ReflectConfig};
use crate::convert::ToValue;
use crate::dispatch::{CallContext, DispatchTable};
use crate::error::{ReflectError, ReflectResult};
use crate::handle::ValueHandle;
use crate::permissions::{PermissionStore, ReflectPermission};
use crate::value::{assign, Dynamic, FuncValue, Value};

/// Registry plus facade for runtime type introspection
#[derive(Debug, Default)]
pub struct Reflector {
    types: TypeContext,
    methods: DispatchTable,
    permissions: PermissionStore,
}

impl Reflector {
    /// Create a reflector with the builtin types and no restrictions
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reflector with the given permissions
    pub fn with_permissions(permissions: PermissionStore) -> Self {
        Self {
            permissions,
            ..Self::default()
        }
    }

    /// Create a reflector from a loaded configuration
    pub fn from_config(config: &ReflectConfig) -> Result<Self, ConfigError> {
        let permissions = PermissionStore::from_config(config)?;
        debug!(
            restricted = permissions.has_any_restrictions(),
            global = %permissions.global(),
            "reflector configured"
        );
        Ok(Self::with_permissions(permissions))
    }

    /// The type registry
    pub fn types(&self) -> &TypeContext {
        &self.types
    }

    /// Conformance checker over the registry
    pub fn checker(&self) -> ConformanceChecker<'_> {
        ConformanceChecker::new(&self.types)
    }

    /// Active permissions
    pub fn permissions(&self) -> &PermissionStore {
        &self.permissions
    }

    /// Active permissions, for reconfiguration
    pub fn permissions_mut(&mut self) -> &mut PermissionStore {
        &mut self.permissions
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Declare a struct type
    pub fn declare_struct(&mut self, def: StructDef) -> ReflectResult<TypeId> {
        let name = def.name.clone();
        let id = self.types.declare_struct(def)?;
        let fields = self.types.get(id).map_or(0, |d| d.num_fields());
        debug!(type_name = %name, fields, "declared struct");
        Ok(id)
    }

    /// Declare a named type over an underlying type (`type MyInt int`)
    pub fn declare_named(&mut self, name: &str, underlying: TypeId) -> ReflectResult<TypeId> {
        let id = self.types.declare_named(name, underlying)?;
        debug!(type_name = name, underlying = %self.types.name(underlying), "declared named type");
        Ok(id)
    }

    /// Declare an interface
    pub fn declare_interface(
        &mut self,
        name: &str,
        requirements: Vec<MethodDef>,
    ) -> ReflectResult<TypeId> {
        let count = requirements.len();
        let id = self.types.declare_interface(name, requirements)?;
        debug!(type_name = name, methods = count, "declared interface");
        Ok(id)
    }

    /// Declare a method on a named type and register its body
    pub fn define_method<F>(
        &mut self,
        receiver: TypeId,
        def: MethodDef,
        body: F,
    ) -> ReflectResult<MethodDescriptor>
    where
        F: Fn(&CallContext<'_>, &[ValueHandle]) -> ReflectResult<Vec<Value>> + 'static,
    {
        let method = self.types.add_method(receiver, def)?;
        self.methods.insert(receiver, method.name.clone(), Rc::new(body));
        debug!(
            type_name = %self.types.name(receiver),
            method = %method.name,
            receiver = ?method.receiver,
            "defined method"
        );
        Ok(method)
    }

    /// Create a free function value
    pub fn define_function<F>(&self, name: &str, signature: Signature, body: F) -> ValueHandle
    where
        F: Fn(&CallContext<'_>, &[ValueHandle]) -> ReflectResult<Vec<Value>> + 'static,
    {
        let ty = self.types.func_of(signature);
        let func = FuncValue {
            ty,
            name: name.to_string(),
            receiver: ValueHandle::invalid(),
            body: Rc::new(body),
        };
        ValueHandle::detached(ty, Kind::Func, Value::Func(Some(func)))
    }

    // ========================================================================
    // Type queries
    // ========================================================================

    /// Type by declared name ("int", "User", "any", ...)
    pub fn lookup_type(&self, name: &str) -> Option<TypeId> {
        self.types.lookup(name)
    }

    /// Pointer type `*elem`
    pub fn pointer_to(&self, elem: TypeId) -> TypeId {
        self.types.pointer_to(elem)
    }

    /// Slice type `[]elem`
    pub fn slice_of(&self, elem: TypeId) -> TypeId {
        self.types.slice_of(elem)
    }

    /// Display name of a type
    pub fn type_name(&self, ty: TypeId) -> String {
        self.types.name(ty)
    }

    /// Descriptor of a type; the invalid descriptor for unknown ids
    pub fn describe(&self, ty: TypeId) -> Rc<TypeDescriptor> {
        self.types
            .get(ty)
            .unwrap_or_else(|| Rc::new(TypeDescriptor::invalid()))
    }

    /// Descriptor of the handle's static type.
    ///
    /// Never fails: the invalid handle is described as kind `invalid`.
    pub fn describe_type(&self, handle: &ValueHandle) -> Rc<TypeDescriptor> {
        self.describe(handle.type_id())
    }

    /// Fields of a struct type in declaration order; empty for other kinds
    pub fn list_fields(&self, ty: TypeId) -> Vec<FieldDescriptor> {
        let desc = self.describe(ty);
        if desc.kind == Kind::Struct {
            desc.fields.clone()
        } else {
            Vec::new()
        }
    }

    /// Field `index` of a struct type
    pub fn type_field(&self, ty: TypeId, index: usize) -> ReflectResult<FieldDescriptor> {
        let desc = self.describe(ty);
        if desc.kind != Kind::Struct {
            return Err(ReflectError::mismatch("struct", desc.name.clone()));
        }
        desc.fields
            .get(index)
            .cloned()
            .ok_or(ReflectError::OutOfRange {
                index,
                bound: desc.fields.len(),
            })
    }

    /// Field by name, including fields promoted from embedded structs.
    ///
    /// Returns the index path from `ty` to the field alongside it.
    pub fn type_field_by_name(
        &self,
        ty: TypeId,
        name: &str,
    ) -> ReflectResult<(Vec<usize>, FieldDescriptor)> {
        self.types
            .find_field(ty, name)
            .ok_or_else(|| ReflectError::not_found("field", name))
    }

    /// Field reached by an index path through embedded structs
    pub fn type_field_by_index(
        &self,
        ty: TypeId,
        path: &[usize],
    ) -> ReflectResult<FieldDescriptor> {
        self.types
            .field_by_index(ty, path)
            .ok_or_else(|| ReflectError::not_found("field", &format!("{:?}", path)))
    }

    /// Methods declared on `ty` (or on its element for pointer types),
    /// sorted by name. Pointer-receiver methods are left out unless
    /// `include_pointer_receiver` is set.
    pub fn list_methods(
        &self,
        ty: TypeId,
        include_pointer_receiver: bool,
    ) -> Vec<MethodDescriptor> {
        self.checker().list_methods(ty, include_pointer_receiver)
    }

    /// Methods callable on a value of type `ty`
    pub fn method_set(&self, ty: TypeId) -> Vec<MethodDescriptor> {
        self.checker().method_set(ty)
    }

    /// Whether `ty` satisfies the capability set `iface`
    pub fn implements(&self, ty: TypeId, iface: TypeId) -> bool {
        self.checker().implements(ty, iface)
    }

    // ========================================================================
    // Wrapping Rust values
    // ========================================================================

    /// Wrap a Rust value. The handle is valid but not addressable.
    pub fn value_of<T: ToValue>(&self, value: T) -> ValueHandle {
        let ty = T::static_type();
        ValueHandle::detached(ty, self.types.kind(ty), value.to_value())
    }

    /// Wrap a value as type `ty` (e.g. an int as `MyInt`).
    ///
    /// The value's representation must match the kind of `ty`.
    pub fn value_of_typed(&self, ty: TypeId, value: Value) -> ReflectResult<ValueHandle> {
        let desc = self.describe(ty);
        if desc.is_invalid() {
            return Err(ReflectError::invalid("value_of_typed"));
        }
        if desc.kind != value.kind() {
            return Err(ReflectError::mismatch(desc.name.clone(), value.kind().to_string()));
        }
        if let Value::Struct(fields) = &value {
            if fields.len() != desc.fields.len() {
                return Err(ReflectError::mismatch(
                    desc.name.clone(),
                    format!("struct with {} fields", fields.len()),
                ));
            }
        }
        Ok(ValueHandle::detached(ty, desc.kind, value))
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Type whose permissions govern access through `ty`: the element of a
    /// pointer, the type itself otherwise
    fn subject(&self, ty: TypeId) -> TypeId {
        match self.types.get(ty) {
            Some(desc) if desc.kind == Kind::Ptr => desc.elem.unwrap_or(ty),
            _ => ty,
        }
    }

    pub(crate) fn require(&self, ty: TypeId, permission: ReflectPermission) -> ReflectResult<()> {
        if !self.permissions.has_any_restrictions() {
            return Ok(());
        }
        let type_name = self.types.name(self.subject(ty));
        self.require_named(&type_name, permission)
    }

    pub(crate) fn require_named(
        &self,
        type_name: &str,
        permission: ReflectPermission,
    ) -> ReflectResult<()> {
        if self.permissions.check(type_name, permission) {
            return Ok(());
        }
        debug!(type_name, %permission, "reflective access denied");
        Err(ReflectError::PermissionDenied {
            type_name: type_name.to_string(),
            permission,
        })
    }

    /// Convert `value` of type `from` for storage in a location of type `to`.
    ///
    /// Concrete values stored into an interface location are boxed with
    /// their dynamic type.
    pub(crate) fn convert_for(
        &self,
        from: TypeId,
        value: Value,
        to: TypeId,
    ) -> ReflectResult<Value> {
        if !self.checker().is_assignable(from, to) {
            return Err(ReflectError::mismatch(
                self.types.name(to),
                self.types.name(from),
            ));
        }
        if from == to || self.types.kind(to) != Kind::Interface {
            return Ok(value);
        }
        Ok(match value {
            Value::Interface(dynamic) => Value::Interface(dynamic),
            other => Value::Interface(Some(Box::new(Dynamic {
                ty: from,
                value: other,
            }))),
        })
    }

    /// Assign `value` into the storage behind `target`, checking only
    /// assignability
    pub(crate) fn store(&self, target: &ValueHandle, value: &ValueHandle) -> ReflectResult<()> {
        let slot = target.slot("store")?;
        let incoming = value.value()?;
        let stored = self.convert_for(value.type_id(), incoming, target.type_id())?;
        assign(slot, stored);
        Ok(())
    }
}
