//! Interface conformance for the Mirror type system
//!
//! Implements method sets, `implements` and assignability. Results of
//! `implements` are memoized in the owning [`TypeContext`] per
//! (type, interface) pair.

use crate::context::TypeContext;
use crate::kind::Kind;
use crate::ty::{MethodDescriptor, ReceiverMode, TypeId};

/// Checker for method sets and interface satisfaction
#[derive(Debug, Clone, Copy)]
pub struct ConformanceChecker<'a> {
    type_ctx: &'a TypeContext,
}

impl<'a> ConformanceChecker<'a> {
    /// Create a checker over a type context
    pub fn new(type_ctx: &'a TypeContext) -> Self {
        ConformanceChecker { type_ctx }
    }

    /// Methods callable on a value of type `ty`, sorted by name.
    ///
    /// - value of a named type: value-receiver methods only
    /// - pointer to a named type: every declared method
    /// - interface: its required methods
    pub fn method_set(&self, ty: TypeId) -> Vec<MethodDescriptor> {
        let Some(desc) = self.type_ctx.get(ty) else {
            return Vec::new();
        };

        match desc.kind {
            Kind::Interface => desc.methods.clone(),
            Kind::Ptr => {
                let Some(elem) = desc.elem.and_then(|e| self.type_ctx.get(e)) else {
                    return Vec::new();
                };
                if matches!(elem.kind, Kind::Interface | Kind::Ptr) {
                    Vec::new()
                } else {
                    elem.methods.clone()
                }
            }
            _ => desc
                .methods
                .iter()
                .filter(|m| m.receiver == ReceiverMode::Value)
                .cloned()
                .collect(),
        }
    }

    /// Methods declared on `ty` (or on its element when `ty` is a pointer),
    /// optionally leaving out pointer-receiver methods
    pub fn list_methods(
        &self,
        ty: TypeId,
        include_pointer_receiver: bool,
    ) -> Vec<MethodDescriptor> {
        let Some(desc) = self.type_ctx.get(ty) else {
            return Vec::new();
        };
        let base = match (desc.kind, desc.elem) {
            (Kind::Ptr, Some(elem)) => match self.type_ctx.get(elem) {
                Some(elem) => elem,
                None => return Vec::new(),
            },
            _ => desc,
        };
        base.methods
            .iter()
            .filter(|m| include_pointer_receiver || m.receiver == ReceiverMode::Value)
            .cloned()
            .collect()
    }

    /// Check whether `ty` satisfies the interface `iface`.
    ///
    /// Every required method must be present in the method set of `ty` with
    /// an identical signature. Returns false when `iface` is not an
    /// interface.
    pub fn implements(&self, ty: TypeId, iface: TypeId) -> bool {
        if let Some(&known) = self.type_ctx.conformance.borrow().get(&(ty, iface)) {
            return known;
        }

        let result = self.check_implements(ty, iface);
        self.type_ctx
            .conformance
            .borrow_mut()
            .insert((ty, iface), result);
        result
    }

    fn check_implements(&self, ty: TypeId, iface: TypeId) -> bool {
        let Some(iface_desc) = self.type_ctx.get(iface) else {
            return false;
        };
        if iface_desc.kind != Kind::Interface {
            return false;
        }
        if self.type_ctx.kind(ty) == Kind::Invalid {
            return false;
        }

        let available = self.method_set(ty);
        iface_desc.methods.iter().all(|required| {
            available
                .iter()
                .any(|m| m.name == required.name && m.signature == required.signature)
        })
    }

    /// Whether a value of type `from` can be stored where `to` is declared:
    /// identical types, or `to` is an interface that `from` implements
    pub fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return from != TypeId::INVALID;
        }
        self.type_ctx.kind(to) == Kind::Interface && self.implements(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MethodDef, StructDef};

    fn setup() -> (TypeContext, TypeId, TypeId, TypeId) {
        let mut ctx = TypeContext::new();
        let user = ctx
            .declare_struct(StructDef::new("User").field("UserName", TypeId::STRING))
            .unwrap();
        ctx.add_method(user, MethodDef::value("GetName", [], [TypeId::STRING]))
            .unwrap();
        ctx.add_method(user, MethodDef::pointer("Color", [], [TypeId::STRING]))
            .unwrap();
        let dog = ctx.declare_struct(StructDef::new("Dog")).unwrap();
        let people = ctx
            .declare_interface("People", vec![MethodDef::required("Color", [], [TypeId::STRING])])
            .unwrap();
        (ctx, user, dog, people)
    }

    #[test]
    fn test_value_and_pointer_method_sets() {
        let (ctx, user, _, _) = setup();
        let checker = ConformanceChecker::new(&ctx);

        let value_set: Vec<String> = checker.method_set(user).into_iter().map(|m| m.name).collect();
        assert_eq!(value_set, vec!["GetName"]);

        let ptr = ctx.pointer_to(user);
        let ptr_set: Vec<String> = checker.method_set(ptr).into_iter().map(|m| m.name).collect();
        assert_eq!(ptr_set, vec!["Color", "GetName"]);
    }

    #[test]
    fn test_list_methods_flag() {
        let (ctx, user, _, _) = setup();
        let checker = ConformanceChecker::new(&ctx);
        assert_eq!(checker.list_methods(user, false).len(), 1);
        assert_eq!(checker.list_methods(user, true).len(), 2);
        let ptr = ctx.pointer_to(user);
        assert_eq!(checker.list_methods(ptr, false).len(), 1);
        assert_eq!(checker.list_methods(TypeId::INT, true).len(), 0);
    }

    #[test]
    fn test_implements_by_receiver_mode() {
        let (ctx, user, dog, people) = setup();
        let checker = ConformanceChecker::new(&ctx);

        assert!(!checker.implements(user, people));
        assert!(checker.implements(ctx.pointer_to(user), people));
        assert!(!checker.implements(dog, people));
        assert!(!checker.implements(ctx.pointer_to(dog), people));
    }

    #[test]
    fn test_signature_must_match() {
        let (mut ctx, _, _, people) = setup();
        let cat = ctx.declare_struct(StructDef::new("Cat")).unwrap();
        ctx.add_method(cat, MethodDef::value("Color", [], [TypeId::INT]))
            .unwrap();
        let checker = ConformanceChecker::new(&ctx);
        assert!(!checker.implements(cat, people));
    }

    #[test]
    fn test_memo_invalidated_by_new_method() {
        let (mut ctx, _, dog, people) = setup();
        assert!(!ConformanceChecker::new(&ctx).implements(dog, people));

        ctx.add_method(dog, MethodDef::value("Color", [], [TypeId::STRING]))
            .unwrap();
        let checker = ConformanceChecker::new(&ctx);
        assert!(checker.implements(dog, people));
        assert!(checker.implements(ctx.pointer_to(dog), people));
    }

    #[test]
    fn test_empty_interface() {
        let (ctx, user, _, people) = setup();
        let checker = ConformanceChecker::new(&ctx);
        assert!(checker.implements(TypeId::INT, TypeId::ANY));
        assert!(checker.implements(user, TypeId::ANY));
        assert!(!checker.implements(TypeId::INVALID, TypeId::ANY));
        // non-interface target
        assert!(!checker.implements(user, TypeId::STRING));
        // interfaces satisfy themselves
        assert!(checker.implements(people, people));
    }

    #[test]
    fn test_assignability() {
        let (mut ctx, user, _, people) = setup();
        let my_int = ctx.declare_named("MyInt", TypeId::INT).unwrap();
        let checker = ConformanceChecker::new(&ctx);

        assert!(checker.is_assignable(TypeId::INT, TypeId::INT));
        assert!(!checker.is_assignable(TypeId::INT, my_int));
        assert!(checker.is_assignable(TypeId::STRING, TypeId::ANY));
        assert!(checker.is_assignable(ctx.pointer_to(user), people));
        assert!(!checker.is_assignable(user, people));
        assert!(!checker.is_assignable(TypeId::INVALID, TypeId::INVALID));
    }
}
