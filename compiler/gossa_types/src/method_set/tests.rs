use gossa_ir::{FuncId, Name};
use pretty_assertions::assert_eq;

use super::*;
use crate::{Field, Method};

fn declare(pool: &mut Pool, ty: Idx, name: &str, func: u32, ptr_recv: bool) -> Name {
    let name = pool.intern_name(name);
    let sig = pool.signature(&[], &[], false);
    pool.add_method(
        ty,
        Method {
            name,
            func: Some(FuncId::new(func)),
            sig,
            ptr_recv,
        },
    );
    name
}

fn names(pool: &Pool, set: &MethodSet) -> Vec<&'static str> {
    set.entries().iter().map(|e| pool.name_str(e.name)).collect()
}

#[test]
fn value_and_pointer_method_sets() {
    let mut pool = Pool::new();
    let t = pool.named("main", "T", Idx::INT);
    declare(&mut pool, t, "Value", 0, false);
    declare(&mut pool, t, "Ptr", 1, true);
    let pt = pool.pointer(t);

    let msets = MethodSets::new();
    assert_eq!(names(&pool, &msets.method_set(&pool, t)), vec!["Value"]);
    assert_eq!(names(&pool, &msets.method_set(&pool, pt)), vec!["Ptr", "Value"]);
}

#[test]
fn promotion_through_embedding() {
    let mut pool = Pool::new();
    let inner = pool.named("main", "Inner", Idx::INT);
    declare(&mut pool, inner, "Hello", 0, false);
    declare(&mut pool, inner, "Mutate", 1, true);

    let inner_name = pool.intern_name("Inner");
    let x = pool.intern_name("x");
    let st = pool.struct_type(&[Field::new(x, Idx::INT), Field::embedded(inner_name, inner)]);
    let outer = pool.named("main", "Outer", st);

    let msets = MethodSets::new();
    let set = msets.method_set(&pool, outer);
    assert_eq!(names(&pool, &set), vec!["Hello"]);
    let hello = &set.entries()[0];
    assert_eq!(hello.path.as_slice(), &[1]);
    assert!(matches!(hello.target, MethodTarget::Concrete { recv, .. } if recv == inner));

    let pouter = pool.pointer(outer);
    assert_eq!(
        names(&pool, &msets.method_set(&pool, pouter)),
        vec!["Hello", "Mutate"]
    );
}

#[test]
fn embedded_pointer_promotes_pointer_methods() {
    let mut pool = Pool::new();
    let inner = pool.named("main", "Inner", Idx::INT);
    declare(&mut pool, inner, "Mutate", 0, true);
    let pinner = pool.pointer(inner);
    let inner_name = pool.intern_name("Inner");
    let st = pool.struct_type(&[Field::embedded(inner_name, pinner)]);
    let outer = pool.named("main", "Outer", st);

    let msets = MethodSets::new();
    let set = msets.method_set(&pool, outer);
    assert_eq!(names(&pool, &set), vec!["Mutate"]);
    assert!(set.entries()[0].indirect);
}

#[test]
fn shallower_method_wins() {
    let mut pool = Pool::new();
    let inner = pool.named("main", "Inner", Idx::INT);
    declare(&mut pool, inner, "M", 0, false);
    let inner_name = pool.intern_name("Inner");
    let st = pool.struct_type(&[Field::embedded(inner_name, inner)]);
    let outer = pool.named("main", "Outer", st);
    declare(&mut pool, outer, "M", 1, false);

    let msets = MethodSets::new();
    let entry = msets.lookup(&pool, outer, pool.intern_name("M")).unwrap();
    assert!(entry.path.is_empty());
    assert!(matches!(
        entry.target,
        MethodTarget::Concrete { func: Some(f), .. } if f == FuncId::new(1)
    ));
}

#[test]
fn same_depth_collision_cancels() {
    let mut pool = Pool::new();
    let a = pool.named("main", "A", Idx::INT);
    let b = pool.named("main", "B", Idx::STRING);
    declare(&mut pool, a, "M", 0, false);
    declare(&mut pool, b, "M", 1, false);
    declare(&mut pool, b, "OnlyB", 2, false);
    let a_name = pool.intern_name("A");
    let b_name = pool.intern_name("B");
    let st = pool.struct_type(&[Field::embedded(a_name, a), Field::embedded(b_name, b)]);
    let outer = pool.named("main", "Outer", st);

    let msets = MethodSets::new();
    assert_eq!(names(&pool, &msets.method_set(&pool, outer)), vec!["OnlyB"]);
}

#[test]
fn recursive_embedding_terminates() {
    let mut pool = Pool::new();
    let node_name = pool.intern_name("Node");
    let node = pool.new_named(pool.intern_name("main"), node_name);
    let pnode = pool.pointer(node);
    let st = pool.struct_type(&[Field::embedded(node_name, pnode)]);
    pool.set_underlying(node, st);
    declare(&mut pool, node, "Walk", 0, false);

    let msets = MethodSets::new();
    let set = msets.method_set(&pool, node);
    assert_eq!(names(&pool, &set), vec!["Walk"]);
    assert!(set.entries()[0].path.is_empty());
}

#[test]
fn embedded_interface_methods_are_promoted() {
    let mut pool = Pool::new();
    let err_name = pool.intern_name("error");
    let st = pool.struct_type(&[Field::embedded(err_name, Idx::ERROR)]);
    let wrapped = pool.named("main", "Wrapped", st);

    let msets = MethodSets::new();
    let set = msets.method_set(&pool, wrapped);
    assert_eq!(names(&pool, &set), vec!["Error"]);
    assert!(matches!(set.entries()[0].target, MethodTarget::Interface { .. }));
    assert!(pool.implements(wrapped, Idx::ERROR, &msets));
}

#[test]
fn results_are_cached() {
    let mut pool = Pool::new();
    let t = pool.named("main", "T", Idx::INT);
    declare(&mut pool, t, "M", 0, false);
    let msets = MethodSets::new();
    let first = msets.method_set(&pool, t);
    let second = msets.method_set(&pool, t);
    assert!(std::rc::Rc::ptr_eq(&first, &second));
    assert_eq!(msets.cached(), 1);
}
