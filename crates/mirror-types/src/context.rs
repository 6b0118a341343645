//! Type context: interning and declaration of types
//!
//! Every descriptor is built once and stored behind an `Rc`; callers hold
//! [`TypeId`]s and resolve them here. Pointer, slice and function types are
//! derived on demand and cached, so asking for `*User` twice yields the same
//! id.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::TypeError;
use crate::kind::Kind;
use crate::tag::StructTag;
use crate::ty::{
    is_exported, FieldDescriptor, MethodDescriptor, ReceiverMode, Signature, TypeDescriptor,
    TypeId,
};

/// A field in a struct declaration
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name; `None` embeds the type under its own name
    pub name: Option<String>,
    /// Declared type
    pub ty: TypeId,
    /// Field tag
    pub tag: StructTag,
}

/// A struct declaration
#[derive(Debug, Clone)]
pub struct StructDef {
    /// Type name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    /// Start a struct declaration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add an untagged field
    pub fn field(self, name: impl Into<String>, ty: TypeId) -> Self {
        self.tagged(name, ty, "")
    }

    /// Add a field with a tag
    pub fn tagged(
        mut self,
        name: impl Into<String>,
        ty: TypeId,
        tag: impl Into<StructTag>,
    ) -> Self {
        self.fields.push(FieldDef {
            name: Some(name.into()),
            ty,
            tag: tag.into(),
        });
        self
    }

    /// Embed a named type (or pointer to one); its fields are promoted
    pub fn embed(mut self, ty: TypeId) -> Self {
        self.fields.push(FieldDef {
            name: None,
            ty,
            tag: StructTag::default(),
        });
        self
    }
}

/// A method declaration, or an interface requirement
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Receiver mode (ignored for interface requirements)
    pub receiver: ReceiverMode,
    /// Parameter and result types
    pub signature: Signature,
}

impl MethodDef {
    /// Method with a value receiver
    pub fn value(
        name: impl Into<String>,
        params: impl Into<Vec<TypeId>>,
        results: impl Into<Vec<TypeId>>,
    ) -> Self {
        Self {
            name: name.into(),
            receiver: ReceiverMode::Value,
            signature: Signature::new(params, results),
        }
    }

    /// Method with a pointer receiver
    pub fn pointer(
        name: impl Into<String>,
        params: impl Into<Vec<TypeId>>,
        results: impl Into<Vec<TypeId>>,
    ) -> Self {
        Self {
            name: name.into(),
            receiver: ReceiverMode::Pointer,
            signature: Signature::new(params, results),
        }
    }

    /// Interface requirement
    pub fn required(
        name: impl Into<String>,
        params: impl Into<Vec<TypeId>>,
        results: impl Into<Vec<TypeId>>,
    ) -> Self {
        Self::value(name, params, results)
    }
}

/// Interning table for type descriptors
#[derive(Debug)]
pub struct TypeContext {
    types: RefCell<Vec<Rc<TypeDescriptor>>>,
    by_name: RefCell<FxHashMap<String, TypeId>>,
    pointers: RefCell<FxHashMap<TypeId, TypeId>>,
    slices: RefCell<FxHashMap<TypeId, TypeId>>,
    funcs: RefCell<FxHashMap<Signature, TypeId>>,
    /// Memoized (type, interface) conformance results
    pub(crate) conformance: RefCell<FxHashMap<(TypeId, TypeId), bool>>,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    /// Create a context holding the builtin types
    pub fn new() -> Self {
        let ctx = Self {
            types: RefCell::new(Vec::new()),
            by_name: RefCell::new(FxHashMap::default()),
            pointers: RefCell::new(FxHashMap::default()),
            slices: RefCell::new(FxHashMap::default()),
            funcs: RefCell::new(FxHashMap::default()),
            conformance: RefCell::new(FxHashMap::default()),
        };

        // Order must match the TypeId constants
        ctx.push(|_| TypeDescriptor::invalid());
        for (name, kind) in [
            ("bool", Kind::Bool),
            ("int", Kind::Int),
            ("float64", Kind::Float64),
            ("string", Kind::String),
        ] {
            let id = ctx.push(|id| TypeDescriptor {
                named: true,
                ..TypeDescriptor::unnamed(id, name.to_string(), kind)
            });
            ctx.by_name.borrow_mut().insert(name.to_string(), id);
        }
        let any = ctx.push(|id| {
            TypeDescriptor::unnamed(id, "interface {}".to_string(), Kind::Interface)
        });
        ctx.by_name.borrow_mut().insert("any".to_string(), any);

        debug_assert_eq!(any, TypeId::ANY);
        ctx
    }

    fn push(&self, make: impl FnOnce(TypeId) -> TypeDescriptor) -> TypeId {
        let mut types = self.types.borrow_mut();
        let id = TypeId(types.len() as u32);
        types.push(Rc::new(make(id)));
        id
    }

    fn replace(&mut self, desc: TypeDescriptor) {
        let index = desc.id.index();
        self.types.get_mut()[index] = Rc::new(desc);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Descriptor for `id`
    pub fn get(&self, id: TypeId) -> Option<Rc<TypeDescriptor>> {
        self.types.borrow().get(id.index()).cloned()
    }

    /// Descriptor for `id`, or an error naming the unknown id
    pub fn resolve(&self, id: TypeId) -> Result<Rc<TypeDescriptor>, TypeError> {
        self.get(id).ok_or(TypeError::UnknownType { id })
    }

    /// Kind of `id`; unknown ids are [`Kind::Invalid`]
    pub fn kind(&self, id: TypeId) -> Kind {
        self.get(id).map_or(Kind::Invalid, |d| d.kind)
    }

    /// Display name of `id`
    pub fn name(&self, id: TypeId) -> String {
        self.get(id)
            .map_or_else(|| "invalid".to_string(), |d| d.name.clone())
    }

    /// Element type of a pointer or slice type
    pub fn elem(&self, id: TypeId) -> Option<TypeId> {
        self.get(id).and_then(|d| d.elem)
    }

    /// Named type by name
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.borrow().get(name).copied()
    }

    /// Number of interned types, builtins included
    pub fn len(&self) -> usize {
        self.types.borrow().len()
    }

    /// Always false: builtins are interned on creation
    pub fn is_empty(&self) -> bool {
        self.types.borrow().is_empty()
    }

    // ========================================================================
    // Derived types
    // ========================================================================

    /// Pointer type `*elem`
    pub fn pointer_to(&self, elem: TypeId) -> TypeId {
        if let Some(&id) = self.pointers.borrow().get(&elem) {
            return id;
        }
        let name = format!("*{}", self.name(elem));
        let id = self.push(|id| TypeDescriptor {
            elem: Some(elem),
            ..TypeDescriptor::unnamed(id, name, Kind::Ptr)
        });
        self.pointers.borrow_mut().insert(elem, id);
        id
    }

    /// Slice type `[]elem`
    pub fn slice_of(&self, elem: TypeId) -> TypeId {
        if let Some(&id) = self.slices.borrow().get(&elem) {
            return id;
        }
        let name = format!("[]{}", self.name(elem));
        let id = self.push(|id| TypeDescriptor {
            elem: Some(elem),
            ..TypeDescriptor::unnamed(id, name, Kind::Slice)
        });
        self.slices.borrow_mut().insert(elem, id);
        id
    }

    /// Function type with the given signature
    pub fn func_of(&self, signature: Signature) -> TypeId {
        if let Some(&id) = self.funcs.borrow().get(&signature) {
            return id;
        }
        let name = self.format_signature(None, &signature);
        let sig = signature.clone();
        let id = self.push(|id| TypeDescriptor {
            signature: Some(sig),
            ..TypeDescriptor::unnamed(id, name, Kind::Func)
        });
        self.funcs.borrow_mut().insert(signature, id);
        id
    }

    /// Render `func(params) results`, optionally with the receiver as the
    /// first parameter
    pub fn format_signature(&self, receiver: Option<TypeId>, signature: &Signature) -> String {
        let params: Vec<String> = receiver
            .into_iter()
            .chain(signature.params.iter().copied())
            .map(|p| self.name(p))
            .collect();
        let mut out = format!("func({})", params.join(", "));
        match signature.results.as_slice() {
            [] => {}
            [single] => {
                out.push(' ');
                out.push_str(&self.name(*single));
            }
            many => {
                let names: Vec<String> = many.iter().map(|r| self.name(*r)).collect();
                out.push_str(&format!(" ({})", names.join(", ")));
            }
        }
        out
    }

    /// Method type as seen through `receiver`, receiver first
    pub fn method_type_name(&self, receiver: TypeId, method: &MethodDescriptor) -> String {
        self.format_signature(Some(receiver), &method.signature)
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn claim_name(&self, name: &str) -> Result<(), TypeError> {
        if self.by_name.borrow().contains_key(name) {
            return Err(TypeError::DuplicateType {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Declare a named type over `underlying`, e.g. `MyInt` over `int`.
    ///
    /// The new type shares the underlying layout and fields but starts with
    /// no methods.
    pub fn declare_named(&mut self, name: &str, underlying: TypeId) -> Result<TypeId, TypeError> {
        self.claim_name(name)?;
        let base = self.resolve(underlying)?;
        if base.is_invalid() {
            return Err(TypeError::InvalidUnderlying {
                name: name.to_string(),
            });
        }
        let id = self.push(|id| TypeDescriptor {
            id,
            name: name.to_string(),
            named: true,
            methods: Vec::new(),
            ..(*base).clone()
        });
        self.by_name.get_mut().insert(name.to_string(), id);
        Ok(id)
    }

    /// Declare a struct type, computing field offsets
    pub fn declare_struct(&mut self, def: StructDef) -> Result<TypeId, TypeError> {
        self.claim_name(&def.name)?;

        let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(def.fields.len());
        let mut offset = 0usize;
        let mut max_align = 1usize;
        for (index, field) in def.fields.into_iter().enumerate() {
            let desc = self.resolve(field.ty)?;
            let (name, anonymous) = match field.name {
                Some(name) => (name, false),
                None => (self.embedded_name(&desc)?, true),
            };
            if fields.iter().any(|f| f.name == name) {
                return Err(TypeError::DuplicateField {
                    type_name: def.name.clone(),
                    field: name,
                });
            }

            let align = desc.align.max(1);
            offset = offset.next_multiple_of(align);
            max_align = max_align.max(align);
            fields.push(FieldDescriptor {
                exported: is_exported(&name),
                name,
                index,
                offset,
                ty: field.ty,
                anonymous,
                tag: field.tag,
            });
            offset += desc.size;
        }
        let size = offset.next_multiple_of(max_align);

        let name = def.name;
        let id = self.push(|id| TypeDescriptor {
            named: true,
            size,
            align: max_align,
            fields,
            ..TypeDescriptor::unnamed(id, name.clone(), Kind::Struct)
        });
        self.by_name.get_mut().insert(name, id);
        Ok(id)
    }

    fn embedded_name(&self, desc: &TypeDescriptor) -> Result<String, TypeError> {
        let target = match (desc.kind, desc.elem) {
            (Kind::Ptr, Some(elem)) => self.resolve(elem)?,
            _ => Rc::new(desc.clone()),
        };
        if !target.named || target.kind == Kind::Ptr {
            return Err(TypeError::InvalidEmbed {
                type_name: desc.name.clone(),
            });
        }
        Ok(target.name.clone())
    }

    /// Declare an interface (capability set)
    pub fn declare_interface(
        &mut self,
        name: &str,
        requirements: Vec<MethodDef>,
    ) -> Result<TypeId, TypeError> {
        self.claim_name(name)?;

        let mut methods: Vec<MethodDescriptor> = Vec::with_capacity(requirements.len());
        for req in requirements {
            if methods.iter().any(|m| m.name == req.name) {
                return Err(TypeError::DuplicateMethod {
                    type_name: name.to_string(),
                    method: req.name,
                });
            }
            methods.push(MethodDescriptor {
                exported: is_exported(&req.name),
                name: req.name,
                index: 0,
                receiver: ReceiverMode::Value,
                signature: req.signature,
            });
        }
        sort_methods(&mut methods);

        let id = self.push(|id| TypeDescriptor {
            named: true,
            methods,
            ..TypeDescriptor::unnamed(id, name.to_string(), Kind::Interface)
        });
        self.by_name.get_mut().insert(name.to_string(), id);
        Ok(id)
    }

    /// Declare a method on a named type.
    ///
    /// Clears memoized conformance results since method sets changed.
    pub fn add_method(
        &mut self,
        receiver: TypeId,
        def: MethodDef,
    ) -> Result<MethodDescriptor, TypeError> {
        let desc = self.resolve(receiver)?;
        if !desc.named || matches!(desc.kind, Kind::Ptr | Kind::Interface | Kind::Invalid) {
            return Err(TypeError::InvalidReceiver {
                type_name: desc.name.clone(),
            });
        }
        if desc.method(&def.name).is_some() {
            return Err(TypeError::DuplicateMethod {
                type_name: desc.name.clone(),
                method: def.name,
            });
        }

        let mut updated = (*desc).clone();
        updated.methods.push(MethodDescriptor {
            exported: is_exported(&def.name),
            name: def.name.clone(),
            index: 0,
            receiver: def.receiver,
            signature: def.signature,
        });
        sort_methods(&mut updated.methods);
        let added = updated
            .method(&def.name)
            .cloned()
            .ok_or(TypeError::UnknownType { id: receiver })?;

        self.replace(updated);
        self.conformance.get_mut().clear();
        Ok(added)
    }

    // ========================================================================
    // Field resolution
    // ========================================================================

    fn struct_target(&self, id: TypeId) -> Option<Rc<TypeDescriptor>> {
        let desc = self.get(id)?;
        let desc = match (desc.kind, desc.elem) {
            (Kind::Ptr, Some(elem)) => self.get(elem)?,
            _ => desc,
        };
        (desc.kind == Kind::Struct).then_some(desc)
    }

    /// Field by name, searching promoted fields of embedded structs
    /// breadth first.
    ///
    /// Returns the index path from `ty` to the field. A name found more than
    /// once at the shallowest depth is ambiguous and yields `None`.
    pub fn find_field(&self, ty: TypeId, name: &str) -> Option<(Vec<usize>, FieldDescriptor)> {
        let mut current: Vec<(TypeId, Vec<usize>)> = vec![(ty, Vec::new())];
        let mut visited: FxHashSet<TypeId> = FxHashSet::default();

        while !current.is_empty() {
            let mut found = None;
            let mut count = 0;
            let mut next = Vec::new();

            for (id, path) in current {
                let Some(desc) = self.struct_target(id) else {
                    continue;
                };
                if !visited.insert(desc.id) {
                    continue;
                }
                for field in &desc.fields {
                    let mut field_path = path.clone();
                    field_path.push(field.index);
                    if field.name == name {
                        count += 1;
                        found = Some((field_path, field.clone()));
                    } else if field.anonymous {
                        next.push((field.ty, field_path));
                    }
                }
            }

            match count {
                0 => current = next,
                1 => return found,
                _ => return None,
            }
        }
        None
    }

    /// Field reached by following an index path through embedded structs
    pub fn field_by_index(&self, ty: TypeId, path: &[usize]) -> Option<FieldDescriptor> {
        let mut current = ty;
        let mut field = None;
        for &index in path {
            let desc = self.struct_target(current)?;
            let f = desc.fields.get(index)?.clone();
            current = f.ty;
            field = Some(f);
        }
        field
    }
}

fn sort_methods(methods: &mut [MethodDescriptor]) {
    methods.sort_by(|a, b| a.name.cmp(&b.name));
    for (index, method) in methods.iter_mut().enumerate() {
        method.index = index;
    }
}
