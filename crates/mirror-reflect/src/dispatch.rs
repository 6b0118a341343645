//! Method dispatch table
//!
//! Each named type registers its methods as typed thunks keyed by
//! (receiver type, method name). Lookup by name never needs true
//! reflection: the descriptor says what the method looks like, the table
//! says what it does.

use std::rc::Rc;

use mirror_types::TypeId;
use rustc_hash::FxHashMap;

use crate::error::{ReflectError, ReflectResult};
use crate::handle::ValueHandle;
use crate::reflector::Reflector;
use crate::value::Value;

/// Native implementation of a method or function.
///
/// Arguments arrive already checked against the declared signature; the
/// thunk returns one value per declared result.
pub type NativeFn = Rc<dyn Fn(&CallContext<'_>, &[ValueHandle]) -> ReflectResult<Vec<Value>>>;

/// What a native body sees while it runs
pub struct CallContext<'r> {
    reflector: &'r Reflector,
    receiver: &'r ValueHandle,
    name: &'r str,
}

impl<'r> CallContext<'r> {
    pub(crate) fn new(reflector: &'r Reflector, receiver: &'r ValueHandle, name: &'r str) -> Self {
        Self {
            reflector,
            receiver,
            name,
        }
    }

    /// The reflector performing the call
    pub fn reflector(&self) -> &'r Reflector {
        self.reflector
    }

    /// Bound receiver: a copy for value receivers, the pointer for pointer
    /// receivers, invalid for free functions
    pub fn receiver(&self) -> &'r ValueHandle {
        self.receiver
    }

    /// Name of the function or method being called
    pub fn name(&self) -> &'r str {
        self.name
    }

    /// Field of the receiver, dereferencing a pointer receiver.
    ///
    /// Methods see unexported fields of their own type, so neither
    /// visibility nor read permission is checked.
    pub fn field(&self, name: &str) -> ReflectResult<ValueHandle> {
        let target = self.reflector.deref_receiver(self.receiver)?;
        let (handle, _) = self.reflector.resolve_field(&target, name, "field")?;
        Ok(handle)
    }

    /// Assign a field of the receiver.
    ///
    /// Only pointer receivers reach the caller's storage; a value receiver
    /// holds a copy and fails with `NotAddressable`.
    pub fn set_field(&self, name: &str, value: &ValueHandle) -> ReflectResult<()> {
        let target = self.reflector.deref_receiver(self.receiver)?;
        let (handle, _) = self.reflector.resolve_field(&target, name, "set_field")?;
        if !handle.can_addr() {
            return Err(ReflectError::NotAddressable {
                operation: "set_field",
            });
        }
        self.reflector.store(&handle, value)
    }
}

/// Registered method bodies
#[derive(Default)]
pub struct DispatchTable {
    methods: FxHashMap<(TypeId, String), NativeFn>,
}

impl DispatchTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body for `receiver.name`
    pub fn insert(&mut self, receiver: TypeId, name: impl Into<String>, body: NativeFn) {
        self.methods.insert((receiver, name.into()), body);
    }

    /// Body for `receiver.name`
    pub fn get(&self, receiver: TypeId, name: &str) -> Option<NativeFn> {
        self.methods.get(&(receiver, name.to_string())).cloned()
    }

    /// Whether `receiver.name` has a body
    pub fn contains(&self, receiver: TypeId, name: &str) -> bool {
        self.methods.contains_key(&(receiver, name.to_string()))
    }

    /// Number of registered bodies
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether no bodies are registered
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("methods", &self.methods.len())
            .finish()
    }
}
