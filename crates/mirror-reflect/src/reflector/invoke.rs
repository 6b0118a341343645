//! Method lookup and invocation

use mirror_types::{Kind, ReceiverMode, TypeId};
use tracing::debug;

use super::Reflector;
use crate::dispatch::CallContext;
use crate::error::{ReflectError, ReflectResult};
use crate::handle::ValueHandle;
use crate::permissions::ReflectPermission;
use crate::value::{FuncValue, Value};

impl Reflector {
    /// Method of `handle` as a function value bound to its receiver.
    ///
    /// Only the method set of the handle's type is searched, so
    /// pointer-receiver methods need a pointer handle. Value-receiver
    /// methods are bound to a non-addressable copy of the receiver.
    pub fn method_by_name(
        &self,
        handle: &ValueHandle,
        name: &str,
    ) -> ReflectResult<ValueHandle> {
        if !handle.is_valid() {
            return Err(ReflectError::invalid("method_by_name"));
        }
        let ty = handle.type_id();
        let method = self
            .method_set(ty)
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| ReflectError::not_found("method", name))?;
        if !method.exported {
            return Err(ReflectError::NotVisible {
                operation: "method_by_name",
                name: name.to_string(),
            });
        }

        if handle.kind() == Kind::Interface {
            let dynamic = self.elem(handle)?;
            if !dynamic.is_valid() {
                return Err(ReflectError::InvalidState {
                    operation: "method_by_name",
                    detail: format!("method {} called on nil interface", name),
                });
            }
            return self.method_by_name(&dynamic, name);
        }

        let base = self.subject(ty);
        let body = self
            .methods
            .get(base, name)
            .ok_or_else(|| ReflectError::not_found("method body", name))?;

        let receiver = match method.receiver {
            ReceiverMode::Pointer => handle.clone(),
            ReceiverMode::Value => {
                let target = self.deref_receiver(handle)?;
                ValueHandle::detached(target.type_id(), target.kind(), target.value()?)
            }
        };

        let func_ty = self.types.func_of(method.signature.clone());
        let func = FuncValue {
            ty: func_ty,
            name: method.name,
            receiver,
            body,
        };
        Ok(ValueHandle::detached(func_ty, Kind::Func, Value::Func(Some(func))))
    }

    /// Invoke a function value.
    ///
    /// Checks, first failure wins: argument count, argument assignability,
    /// `INVOKE` permission. Arguments are passed by value; results come
    /// back as non-addressable handles.
    pub fn call(
        &self,
        func: &ValueHandle,
        args: &[ValueHandle],
    ) -> ReflectResult<Vec<ValueHandle>> {
        if !func.is_valid() {
            return Err(ReflectError::invalid("call"));
        }
        if func.kind() != Kind::Func {
            return Err(ReflectError::mismatch("func", func.kind().to_string()));
        }
        let func = match func.value()? {
            Value::Func(Some(func)) => func,
            _ => {
                return Err(ReflectError::InvalidState {
                    operation: "call",
                    detail: "call of nil function".to_string(),
                })
            }
        };
        let signature = self
            .types
            .resolve(func.ty)?
            .signature
            .clone()
            .ok_or_else(|| ReflectError::mismatch("func", self.types.name(func.ty)))?;

        if args.len() != signature.params.len() {
            return Err(ReflectError::ArityMismatch {
                name: func.name.clone(),
                expected: signature.params.len(),
                received: args.len(),
            });
        }

        let mut prepared = Vec::with_capacity(args.len());
        for (arg, &param) in args.iter().zip(&signature.params) {
            let value = self.convert_for(arg.type_id(), arg.value()?, param)?;
            prepared.push(ValueHandle::detached(param, self.types.kind(param), value));
        }

        self.require_invoke(&func)?;

        debug!(function = %func.name, args = prepared.len(), "call");
        let ctx = CallContext::new(self, &func.receiver, &func.name);
        let results = (func.body)(&ctx, &prepared)?;

        if results.len() != signature.results.len() {
            return Err(ReflectError::InvalidState {
                operation: "call",
                detail: format!(
                    "{} returned {} values, expected {}",
                    func.name,
                    results.len(),
                    signature.results.len()
                ),
            });
        }
        results
            .into_iter()
            .zip(&signature.results)
            .map(|(value, &ty)| self.wrap_result(value, ty))
            .collect()
    }

    /// Look up a method by name and invoke it
    pub fn call_method(
        &self,
        handle: &ValueHandle,
        name: &str,
        args: &[ValueHandle],
    ) -> ReflectResult<Vec<ValueHandle>> {
        let method = self.method_by_name(handle, name)?;
        self.call(&method, args)
    }

    /// Methods are checked against their receiver's type, free functions
    /// against their own name
    fn require_invoke(&self, func: &FuncValue) -> ReflectResult<()> {
        if !self.permissions.has_any_restrictions() {
            return Ok(());
        }
        if func.receiver.is_valid() {
            self.require(func.receiver.type_id(), ReflectPermission::INVOKE)
        } else {
            self.require_named(&func.name, ReflectPermission::INVOKE)
        }
    }

    /// Check a body's result against its declared type. Concrete builtin
    /// values returned for an interface result are boxed the same way
    /// arguments are.
    fn wrap_result(&self, value: Value, ty: TypeId) -> ReflectResult<ValueHandle> {
        let kind = self.types.kind(ty);
        let value = match (kind, builtin_type(&value)) {
            (Kind::Interface, Some(concrete)) => self.convert_for(concrete, value, ty)?,
            _ if value.kind() == kind => value,
            _ => {
                return Err(ReflectError::mismatch(
                    self.types.name(ty),
                    value.kind().to_string(),
                ))
            }
        };
        Ok(ValueHandle::detached(ty, kind, value))
    }
}

/// Predeclared type of a scalar value
fn builtin_type(value: &Value) -> Option<TypeId> {
    match value {
        Value::Bool(_) => Some(TypeId::BOOL),
        Value::Int(_) => Some(TypeId::INT),
        Value::Float(_) => Some(TypeId::FLOAT64),
        Value::String(_) => Some(TypeId::STRING),
        _ => None,
    }
}
