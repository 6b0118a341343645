//! Mirror Type System
//!
//! Type descriptors, struct layout, and interface conformance for the Mirror
//! reflection runtime. Descriptors are interned once per type in a
//! [`TypeContext`] and referenced everywhere else by [`TypeId`].

#![warn(missing_docs)]

pub mod conformance;
pub mod context;
pub mod error;
pub mod kind;
pub mod tag;
pub mod ty;

pub use conformance::ConformanceChecker;
pub use context::{FieldDef, MethodDef, StructDef, TypeContext};
pub use error::TypeError;
pub use kind::Kind;
pub use tag::StructTag;
pub use ty::{
    is_exported, FieldDescriptor, MethodDescriptor, ReceiverMode, Signature, TypeDescriptor,
    TypeId,
};
