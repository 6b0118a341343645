use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mirror_reflect::{arg, CallContext, Reflector, Value, ValueHandle};
use mirror_types::{MethodDef, StructDef, TypeId};

fn setup() -> (Reflector, ValueHandle) {
    let mut r = Reflector::new();
    let user = r
        .declare_struct(
            StructDef::new("User")
                .field("UserName", TypeId::STRING)
                .field("Age", TypeId::INT),
        )
        .unwrap();
    r.define_method(
        user,
        MethodDef::pointer("Add", [TypeId::INT, TypeId::INT], [TypeId::INT]),
        |_: &CallContext<'_>, args: &[ValueHandle]| {
            Ok(vec![Value::Int(arg::<i64>(args, 0)? + arg::<i64>(args, 1)?)])
        },
    )
    .unwrap();
    r.define_method(
        user,
        MethodDef::value("GetName", [], [TypeId::STRING]),
        |ctx: &CallContext<'_>, _: &[ValueHandle]| Ok(vec![ctx.field("UserName")?.value()?]),
    )
    .unwrap();
    let ptr = r.new_pointer(user).unwrap();
    (r, ptr)
}

fn bench_call_method(c: &mut Criterion) {
    let (r, ptr) = setup();
    let args = [r.value_of(1i64), r.value_of(2i64)];

    c.bench_function("call_method_add", |b| {
        b.iter(|| r.call_method(black_box(&ptr), "Add", black_box(&args)).unwrap());
    });

    let bound = r.method_by_name(&ptr, "Add").unwrap();
    c.bench_function("call_bound_add", |b| {
        b.iter(|| r.call(black_box(&bound), black_box(&args)).unwrap());
    });

    c.bench_function("call_method_value_receiver", |b| {
        b.iter(|| r.call_method(black_box(&ptr), "GetName", &[]).unwrap());
    });
}

fn bench_field_access(c: &mut Criterion) {
    let (r, ptr) = setup();
    let elem = r.elem(&ptr).unwrap();
    let mut group = c.benchmark_group("fields");

    for name in ["UserName", "Age"] {
        group.bench_with_input(BenchmarkId::new("field_by_name", name), &name, |b, name| {
            b.iter(|| r.field_by_name(black_box(&elem), name).unwrap());
        });
    }
    group.finish();
}

fn bench_implements(c: &mut Criterion) {
    let (mut r, _) = setup();
    let user = r.lookup_type("User").unwrap();
    let adder = r
        .declare_interface(
            "Adder",
            vec![MethodDef::required("Add", [TypeId::INT, TypeId::INT], [TypeId::INT])],
        )
        .unwrap();
    let ptr = r.pointer_to(user);

    c.bench_function("implements_memoized", |b| {
        b.iter(|| r.implements(black_box(ptr), black_box(adder)));
    });
}

criterion_group!(benches, bench_call_method, bench_field_access, bench_implements);
criterion_main!(benches);
