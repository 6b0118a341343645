//! Instance creation and sequence operations

use mirror_types::{Kind, TypeId};
use tracing::trace;

use super::Reflector;
use crate::error::{ReflectError, ReflectResult};
use crate::handle::{Flags, ValueHandle};
use crate::permissions::ReflectPermission;
use crate::value::{assign, new_slot, SliceValue, Slot, Value};

impl Reflector {
    // ========================================================================
    // Creation
    // ========================================================================

    fn zero(&self, ty: TypeId, operation: &'static str) -> ReflectResult<Value> {
        Value::zero(&self.types, ty).ok_or_else(|| ReflectError::InvalidState {
            operation,
            detail: format!("no zero value for type {}", self.types.name(ty)),
        })
    }

    /// Fresh, addressable zero value of `ty`
    pub fn new_instance(&self, ty: TypeId) -> ReflectResult<ValueHandle> {
        let value = self.zero(ty, "new_instance")?;
        self.require(ty, ReflectPermission::CREATE)?;
        trace!(type_name = %self.types.name(ty), "new instance");
        Ok(ValueHandle::from_slot(
            ty,
            self.types.kind(ty),
            new_slot(value),
            Flags::ADDRESSABLE,
        ))
    }

    /// Pointer to a fresh zero value of `ty`
    pub fn new_pointer(&self, ty: TypeId) -> ReflectResult<ValueHandle> {
        let target = self.new_instance(ty)?;
        self.addr(&target)
    }

    /// Addressable sequence of `len` zero elements with room for `cap`
    pub fn new_sequence(
        &self,
        elem: TypeId,
        len: usize,
        cap: usize,
    ) -> ReflectResult<ValueHandle> {
        if cap < len {
            return Err(ReflectError::OutOfRange {
                index: len,
                bound: cap + 1,
            });
        }
        let mut array = backing_array(cap)?;
        for _ in 0..cap {
            array.push(new_slot(self.zero(elem, "new_sequence")?));
        }
        self.require(elem, ReflectPermission::CREATE)?;

        let ty = self.types.slice_of(elem);
        trace!(type_name = %self.types.name(ty), len, cap, "new sequence");
        Ok(ValueHandle::from_slot(
            ty,
            Kind::Slice,
            new_slot(Value::Slice(SliceValue::from_array(array, len))),
            Flags::ADDRESSABLE,
        ))
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    fn slice_header(
        &self,
        handle: &ValueHandle,
        operation: &'static str,
    ) -> ReflectResult<SliceValue> {
        if !handle.is_valid() {
            return Err(ReflectError::invalid(operation));
        }
        match &*handle.slot(operation)?.borrow() {
            Value::Slice(slice) => Ok(slice.clone()),
            other => Err(ReflectError::mismatch("slice", other.kind().to_string())),
        }
    }

    /// Element `index` of a sequence. Elements are always addressable.
    pub fn index(&self, handle: &ValueHandle, index: usize) -> ReflectResult<ValueHandle> {
        let slice = self.slice_header(handle, "index")?;
        let slot = slice.get(index).ok_or(ReflectError::OutOfRange {
            index,
            bound: slice.len(),
        })?;
        let elem = self
            .types
            .elem(handle.type_id())
            .ok_or_else(|| ReflectError::mismatch("slice", self.types.name(handle.type_id())))?;
        let flags = handle.flags().with_addressable(true);
        Ok(ValueHandle::from_slot(elem, self.types.kind(elem), slot, flags))
    }

    /// Number of elements of a sequence, or bytes of a string
    pub fn len(&self, handle: &ValueHandle) -> ReflectResult<usize> {
        if handle.kind() == Kind::String {
            return Ok(handle.get::<String>()?.len());
        }
        Ok(self.slice_header(handle, "len")?.len())
    }

    /// Capacity of a sequence
    pub fn cap(&self, handle: &ValueHandle) -> ReflectResult<usize> {
        Ok(self.slice_header(handle, "cap")?.cap())
    }

    /// Change the length of an addressable sequence within its capacity
    pub fn set_len(&self, handle: &ValueHandle, len: usize) -> ReflectResult<()> {
        let slice = self.slice_header(handle, "set_len")?;
        self.check_settable(handle, "set_len")?;
        if len > slice.cap() {
            return Err(ReflectError::OutOfRange {
                index: len,
                bound: slice.cap() + 1,
            });
        }
        assign(handle.slot("set_len")?, Value::Slice(slice.with_len(len)));
        Ok(())
    }

    /// Sequence with `value` appended.
    ///
    /// Writes into the shared backing array when capacity allows and
    /// copies into a larger one otherwise. The length seen through
    /// `handle` never changes; use the returned handle.
    pub fn append(
        &self,
        handle: &ValueHandle,
        value: &ValueHandle,
    ) -> ReflectResult<ValueHandle> {
        let slice = self.slice_header(handle, "append")?;
        let ty = handle.type_id();
        let elem = self
            .types
            .elem(ty)
            .ok_or_else(|| ReflectError::mismatch("slice", self.types.name(ty)))?;
        let stored = self.convert_for(value.type_id(), value.value()?, elem)?;
        self.require(ty, ReflectPermission::WRITE)?;

        let len = slice.len();
        let grown = if len < slice.cap() {
            let grown = slice.with_len(len + 1);
            if let Some(slot) = grown.get(len) {
                assign(&slot, stored);
            }
            grown
        } else {
            let cap = slice.cap().saturating_mul(2).max(len + 1);
            let mut array = backing_array(cap)?;
            array.extend(
                slice
                    .elements()
                    .iter()
                    .map(|slot| new_slot(slot.borrow().clone())),
            );
            array.push(new_slot(stored));
            while array.len() < cap {
                array.push(new_slot(self.zero(elem, "append")?));
            }
            trace!(type_name = %self.types.name(ty), cap, "sequence reallocated");
            SliceValue::from_array(array, len + 1)
        };

        Ok(ValueHandle::from_slot(
            ty,
            Kind::Slice,
            new_slot(Value::Slice(grown)),
            Flags::DETACHED,
        ))
    }
}

/// Empty backing array with room for `cap` slots
fn backing_array(cap: usize) -> ReflectResult<Vec<Slot>> {
    let mut array = Vec::new();
    array
        .try_reserve_exact(cap)
        .map_err(|_| ReflectError::OutOfRange {
            index: cap,
            bound: isize::MAX as usize / std::mem::size_of::<Slot>(),
        })?;
    Ok(array)
}
