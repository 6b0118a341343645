//! Integration tests for type declaration and conformance

use mirror_types::{
    ConformanceChecker, Kind, MethodDef, ReceiverMode, StructDef, TypeContext, TypeId,
};

fn user_context() -> (TypeContext, TypeId) {
    let mut ctx = TypeContext::new();
    let user = ctx
        .declare_struct(
            StructDef::new("User")
                .tagged("UserName", TypeId::STRING, r#"json:"userName""#)
                .tagged("Age", TypeId::INT, r#"json:"age""#)
                .tagged("Gender", TypeId::STRING, r#"json:"gender""#),
        )
        .unwrap();
    ctx.add_method(user, MethodDef::value("GetName", [], [TypeId::STRING]))
        .unwrap();
    ctx.add_method(user, MethodDef::pointer("GetAge", [], [TypeId::INT]))
        .unwrap();
    ctx.add_method(user, MethodDef::pointer("Add", [TypeId::INT, TypeId::INT], [TypeId::INT]))
        .unwrap();
    ctx.add_method(user, MethodDef::pointer("Color", [], [TypeId::STRING]))
        .unwrap();
    (ctx, user)
}

#[test]
fn test_field_listing() {
    let (ctx, user) = user_context();
    let desc = ctx.get(user).unwrap();

    let rows: Vec<(String, usize, String, bool, String)> = desc
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.offset, ctx.name(f.ty), f.exported, f.tag.to_string()))
        .collect();

    assert_eq!(
        rows,
        vec![
            ("UserName".into(), 0, "string".into(), true, r#"json:"userName""#.into()),
            ("Age".into(), 16, "int".into(), true, r#"json:"age""#.into()),
            ("Gender".into(), 24, "string".into(), true, r#"json:"gender""#.into()),
        ]
    );
}

#[test]
fn test_field_lookup_by_name_and_index() {
    let (ctx, user) = user_context();

    let (path, field) = ctx.find_field(user, "UserName").unwrap();
    assert_eq!(path, vec![0]);
    assert!(!field.anonymous);

    let age = ctx.field_by_index(user, &[1]).unwrap();
    assert_eq!(age.name, "Age");
    assert_eq!(age.tag.get("json"), "age");
    assert!(ctx.field_by_index(user, &[7]).is_none());
}

#[test]
fn test_method_listing_value_vs_pointer() {
    let (ctx, user) = user_context();
    let checker = ConformanceChecker::new(&ctx);

    let value_methods: Vec<String> = checker.method_set(user).into_iter().map(|m| m.name).collect();
    assert_eq!(value_methods, vec!["GetName"]);

    let ptr = ctx.pointer_to(user);
    let ptr_methods = checker.method_set(ptr);
    let names: Vec<&str> = ptr_methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Add", "Color", "GetAge", "GetName"]);
    assert!(ptr_methods.iter().all(|m| m.exported));
    assert_eq!(ptr_methods[0].receiver, ReceiverMode::Pointer);
    assert_eq!(ctx.method_type_name(ptr, &ptr_methods[0]), "func(*User, int, int) int");
}

#[test]
fn test_function_signature_kinds() {
    let ctx = TypeContext::new();
    let sub = ctx.func_of(mirror_types::Signature::new(
        [TypeId::INT, TypeId::INT],
        [TypeId::STRING],
    ));
    let desc = ctx.get(sub).unwrap();
    assert_eq!(desc.kind, Kind::Func);
    assert_eq!(desc.num_in(), 2);
    assert_eq!(desc.num_out(), 1);

    let sig = desc.signature.as_ref().unwrap();
    let in_kinds: Vec<Kind> = sig.params.iter().map(|p| ctx.kind(*p)).collect();
    assert_eq!(in_kinds, vec![Kind::Int, Kind::Int]);
    assert_eq!(ctx.kind(sig.results[0]), Kind::String);
}

#[test]
fn test_people_interface() {
    let (mut ctx, user) = user_context();
    let dog = ctx.declare_struct(StructDef::new("Dog")).unwrap();
    let people = ctx
        .declare_interface("People", vec![MethodDef::required("Color", [], [TypeId::STRING])])
        .unwrap();
    assert_eq!(ctx.kind(people), Kind::Interface);

    let checker = ConformanceChecker::new(&ctx);
    assert!(!checker.implements(user, people));
    assert!(checker.implements(ctx.pointer_to(user), people));
    assert!(!checker.implements(dog, people));
    assert!(!checker.implements(ctx.pointer_to(dog), people));
}
