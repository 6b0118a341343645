//! Mirror - runtime type introspection
//!
//! Values are wrapped in [`ValueHandle`]s and inspected or changed through a
//! [`Reflector`], which owns the type registry, method bodies and the
//! permission store.
//!
//! # Example
//!
//! ```ignore
//! use mirror_reflect::{arg, CallContext, Reflector, Value, ValueHandle};
//! use mirror_types::{MethodDef, StructDef, TypeId};
//!
//! let mut r = Reflector::new();
//! let user = r.declare_struct(
//!     StructDef::new("User")
//!         .tagged("UserName", TypeId::STRING, r#"json:"userName""#)
//!         .field("age", TypeId::INT),
//! )?;
//! r.define_method(
//!     user,
//!     MethodDef::pointer("Add", [TypeId::INT, TypeId::INT], [TypeId::INT]),
//!     |_: &CallContext<'_>, args: &[ValueHandle]| {
//!         Ok(vec![Value::Int(arg::<i64>(args, 0)? + arg::<i64>(args, 1)?)])
//!     },
//! )?;
//!
//! let ptr = r.new_pointer(user)?;
//! r.set_field(&r.elem(&ptr)?, "UserName", &r.value_of("tangfire"))?;
//! let sum = r.call_method(&ptr, "Add", &[r.value_of(1i64), r.value_of(2i64)])?;
//! assert_eq!(sum[0].get::<i64>()?, 3);
//! ```
//!
//! Storage is reference-counted and not thread-safe; a reflector and its
//! handles stay on one thread.

#![warn(missing_docs)]

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod permissions;
pub mod reflector;
pub mod value;

pub use config::{ConfigError, ReflectConfig};
pub use convert::{arg, FromValue, ToValue};
pub use dispatch::{CallContext, DispatchTable, NativeFn};
pub use error::{ReflectError, ReflectResult};
pub use handle::ValueHandle;
pub use permissions::{PermissionStore, ReflectPermission, TypePermissionRule};
pub use reflector::Reflector;
pub use value::{Dynamic, FuncValue, SliceValue, Slot, Value};
