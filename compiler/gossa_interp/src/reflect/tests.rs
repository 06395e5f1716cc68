use gossa_types::Field;
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::Trap;

fn reflector_call(pool: &Pool, heap: &Heap, intr: Intrinsic, args: &[Value]) -> ExecResult<Value> {
    let sched = Scheduler::new();
    Reflector {
        pool,
        heap,
        sched: &sched,
    }
    .call(intr, args)
}

fn reflect_value(ty: Idx, value: Value) -> Value {
    value_of(Boxed { ty, value })
}

#[test]
fn kinds_follow_go_numbering() {
    assert_eq!(Kind::Bool as u8, 1);
    assert_eq!(Kind::Int as u8, 2);
    assert_eq!(Kind::Uintptr as u8, 12);
    assert_eq!(Kind::Complex128 as u8, 16);
    assert_eq!(Kind::Array as u8, 17);
    assert_eq!(Kind::Pointer as u8, 22);
    assert_eq!(Kind::String as u8, 24);
    assert_eq!(Kind::UnsafePointer as u8, 26);
    for (i, k) in KINDS.iter().enumerate() {
        assert_eq!(*k as usize, i);
    }
    assert_eq!(Kind::from_raw(25), Some(Kind::Struct));
    assert_eq!(Kind::from_raw(27), None);
}

#[test]
fn kind_names() {
    assert_eq!(Kind::Pointer.name(), "ptr");
    assert_eq!(Kind::Slice.name(), "slice");
    assert_eq!(Kind::UnsafePointer.name(), "unsafe.Pointer");
    assert_eq!(Kind::Invalid.name(), "invalid");
}

#[test]
fn kind_of_looks_through_names() {
    let mut pool = Pool::new();
    let celsius = pool.named("main", "Celsius", Idx::FLOAT64);
    let ints = pool.slice(Idx::INT);
    let ptr = pool.pointer(ints);
    assert_eq!(Kind::of(&pool, celsius), Kind::Float64);
    assert_eq!(Kind::of(&pool, ints), Kind::Slice);
    assert_eq!(Kind::of(&pool, ptr), Kind::Pointer);
    assert_eq!(Kind::of(&pool, Idx::ANY), Kind::Interface);
}

#[test]
fn type_name_drops_package() {
    let mut pool = Pool::new();
    let celsius = pool.named("main", "Celsius", Idx::FLOAT64);
    let ints = pool.slice(Idx::INT);
    assert_eq!(type_name(&pool, celsius), "Celsius");
    assert_eq!(type_name(&pool, ints), "");
    assert_eq!(type_name(&pool, Idx::INT), "");
}

#[test]
fn struct_fields_by_index() {
    let mut pool = Pool::new();
    let x = pool.intern_name("X");
    let label = pool.intern_name("Label");
    let point = pool.struct_type(&[Field::new(x, Idx::INT), Field::new(label, Idx::STRING)]);
    let named = pool.named("main", "Point", point);
    let heap = Heap::new();

    let t = Value::ReflectType(named);
    let name = reflector_call(&pool, &heap, Intrinsic::TypeFieldName, &[t.clone(), Value::Int(1)]);
    assert_eq!(name.ok(), Some(Value::str("Label")));
    let n = reflector_call(&pool, &heap, Intrinsic::TypeNumField, &[t]);
    assert_eq!(n.ok(), Some(Value::Int(2)));

    let v = reflect_value(named, Value::Struct(vec![Value::Int(3), Value::str("p")]));
    let field = reflector_call(&pool, &heap, Intrinsic::ValueField, &[v, Value::Int(0)]);
    assert_eq!(field.ok(), Some(reflect_value(Idx::INT, Value::Int(3))));
}

#[test]
fn accessor_on_wrong_kind_panics_with_method_name() {
    let pool = Pool::new();
    let heap = Heap::new();
    let v = reflect_value(Idx::STRING, Value::str("x"));
    match reflector_call(&pool, &heap, Intrinsic::ValueInt, &[v]) {
        Err(Trap::Fault(fault)) => assert_eq!(
            fault.to_string(),
            "reflect: call of reflect.Value.Int on string Value"
        ),
        other => panic!("expected a reflect fault, got {other:?}"),
    }
}

#[test]
fn zero_value_is_invalid() {
    let pool = Pool::new();
    let heap = Heap::new();
    let zero = Value::ReflectValue(None);
    let valid = reflector_call(&pool, &heap, Intrinsic::ValueIsValid, &[zero.clone()]);
    assert_eq!(valid.ok(), Some(Value::Bool(false)));
    let kind = reflector_call(&pool, &heap, Intrinsic::ValueKind, &[zero.clone()]);
    assert_eq!(kind.ok(), Some(Value::Uint(0)));
    assert!(matches!(
        reflector_call(&pool, &heap, Intrinsic::ValueInt, &[zero]),
        Err(Trap::Fault(RuntimeFault::Reflect { .. }))
    ));
}

#[test]
fn type_of_nil_interface_is_nil() {
    let pool = Pool::new();
    let heap = Heap::new();
    let t = reflector_call(&pool, &heap, Intrinsic::ReflectTypeOf, &[Value::Interface(None)]);
    assert_eq!(t.ok(), Some(Value::Interface(None)));
}

#[test]
fn elem_of_non_container_type_is_usage_error() {
    let pool = Pool::new();
    let heap = Heap::new();
    let r = reflector_call(&pool, &heap, Intrinsic::TypeElem, &[Value::ReflectType(Idx::INT)]);
    assert!(matches!(r, Err(Trap::Fault(RuntimeFault::ReflectUsage(_)))));
}
