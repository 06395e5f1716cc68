use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::{Field, Idx, Method, Pool, SubstMap, Tag, TypeFlags};

/// `type t[A, B any] struct { a A; b B; next *t[A, B] }`
fn recursive_template(pool: &mut Pool) -> Idx {
    let main = pool.intern_name("main");
    let t_name = pool.intern_name("t");
    let t = pool.new_named(main, t_name);
    let a = pool.new_type_param(pool.intern_name("A"), 0, Idx::ANY);
    let b = pool.new_type_param(pool.intern_name("B"), 1, Idx::ANY);
    pool.set_type_params(t, vec![a, b]);

    let self_ref = pool.instantiate(t, &[a, b]);
    let next = pool.pointer(self_ref);
    let fa = pool.intern_name("a");
    let fb = pool.intern_name("b");
    let fnext = pool.intern_name("next");
    let body = pool.struct_type(&[
        Field::new(fa, a),
        Field::new(fb, b),
        Field::new(fnext, next),
    ]);
    pool.set_underlying(t, body);
    t
}

#[test]
fn instantiation_identity() {
    let mut pool = Pool::new();
    let t = recursive_template(&mut pool);
    let ps = pool.pointer(Idx::STRING);
    let pi = pool.pointer(Idx::INT);

    let x = pool.instantiate(t, &[Idx::STRING, ps]);
    let y = pool.instantiate(t, &[Idx::STRING, ps]);
    let z = pool.instantiate(t, &[Idx::INT, pi]);

    assert!(pool.identical(x, y));
    assert!(!pool.identical(x, z));
    assert_eq!(pool.format_type(x), "main.t[string,*string]");
    assert_eq!(pool.format_type(z), "main.t[int,*int]");
}

#[test]
fn recursive_instance_closes_on_itself() {
    let mut pool = Pool::new();
    let t = recursive_template(&mut pool);
    let ps = pool.pointer(Idx::STRING);
    let x = pool.instantiate(t, &[Idx::STRING, ps]);

    let fields = pool.fields(x);
    assert_eq!(fields[0].ty, Idx::STRING);
    assert_eq!(fields[1].ty, ps);
    assert_eq!(pool.elem(fields[2].ty), x);
    assert!(!pool.flags(pool.underlying(x)).has_type_params());
}

#[test]
fn instances_created_before_underlying_are_completed() {
    let mut pool = Pool::new();
    let main = pool.intern_name("main");
    let name = pool.intern_name("Box");
    let boxed = pool.new_named(main, name);
    let tp = pool.new_type_param(pool.intern_name("T"), 0, Idx::ANY);
    pool.set_type_params(boxed, vec![tp]);

    let early = pool.instantiate(boxed, &[Idx::BOOL]);
    assert_eq!(pool.underlying(early), Idx::INVALID);

    let slice = pool.slice(tp);
    pool.set_underlying(boxed, slice);
    assert_eq!(pool.format_type(pool.underlying(early)), "[]bool");
    assert!(pool.flags(early).contains(TypeFlags::HAS_NIL));
}

#[test]
fn methods_follow_instances() {
    let mut pool = Pool::new();
    let main = pool.intern_name("main");
    let name = pool.intern_name("Box");
    let boxed = pool.new_named(main, name);
    let tp = pool.new_type_param(pool.intern_name("T"), 0, Idx::ANY);
    pool.set_type_params(boxed, vec![tp]);
    let v = pool.intern_name("v");
    let body = pool.struct_type(&[Field::new(v, tp)]);
    pool.set_underlying(boxed, body);

    let before = pool.instantiate(boxed, &[Idx::INT]);
    let get = pool.intern_name("Get");
    let sig = pool.signature(&[], &[tp], false);
    pool.add_method(
        boxed,
        Method {
            name: get,
            func: Some(gossa_ir::FuncId::new(7)),
            sig,
            ptr_recv: false,
        },
    );
    let after = pool.instantiate(boxed, &[Idx::STRING]);

    let m_before = pool.named_info(before).methods[0];
    let m_after = pool.named_info(after).methods[0];
    assert_eq!(pool.format_type(m_before.sig), "func() int");
    assert_eq!(pool.format_type(m_after.sig), "func() string");
    assert_eq!(m_before.func, m_after.func);
}

#[test]
fn substitute_leaves_concrete_types_alone() {
    let mut pool = Pool::new();
    let tp = pool.new_type_param(pool.intern_name("T"), 0, Idx::ANY);
    let map = SubstMap::new(vec![tp], vec![Idx::INT]);
    let s = pool.slice(Idx::STRING);
    let before = pool.len();
    assert_eq!(pool.substitute(s, &map), s);
    assert_eq!(pool.len(), before);

    let generic = pool.map(tp, s);
    let sig = pool.signature(&[generic], &[tp], false);
    let done = pool.substitute(sig, &map);
    assert_eq!(pool.format_type(done), "func(map[int][]string) int");
}

// ── Property tests: nested generic instantiation ───────────────────

/// A type expression over `int`, `string`, pointers, slices and the
/// recursive two-parameter template.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Expr {
    Int,
    Str,
    Ptr(Box<Expr>),
    Slice(Box<Expr>),
    Inst(Box<Expr>, Box<Expr>),
}

fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![Just(Expr::Int), Just(Expr::Str)];
    leaf.prop_recursive(5, 32, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Expr::Ptr(Box::new(e))),
            inner.clone().prop_map(|e| Expr::Slice(Box::new(e))),
            (inner.clone(), inner).prop_map(|(a, b)| Expr::Inst(Box::new(a), Box::new(b))),
        ]
    })
}

fn build(pool: &mut Pool, t: Idx, e: &Expr) -> Idx {
    match e {
        Expr::Int => Idx::INT,
        Expr::Str => Idx::STRING,
        Expr::Ptr(x) => {
            let x = build(pool, t, x);
            pool.pointer(x)
        }
        Expr::Slice(x) => {
            let x = build(pool, t, x);
            pool.slice(x)
        }
        Expr::Inst(a, b) => {
            let a = build(pool, t, a);
            let b = build(pool, t, b);
            pool.instantiate(t, &[a, b])
        }
    }
}

/// Build through a generic detour: instantiate with type parameters first,
/// then substitute the real arguments in.
fn build_via_subst(pool: &mut Pool, t: Idx, a: &Expr, b: &Expr) -> Idx {
    let template_params = pool.named_info(t).type_params.clone();
    let generic = pool.instantiate(t, &template_params);
    let a = build(pool, t, a);
    let b = build(pool, t, b);
    pool.substitute(generic, &SubstMap::new(template_params, vec![a, b]))
}

proptest! {
    #[test]
    fn equal_arguments_give_identical_instances(a in expr_strategy(), b in expr_strategy()) {
        let mut pool = Pool::new();
        let t = recursive_template(&mut pool);
        let first = build(&mut pool, t, &Expr::Inst(Box::new(a.clone()), Box::new(b.clone())));
        let second = build(&mut pool, t, &Expr::Inst(Box::new(a.clone()), Box::new(b.clone())));
        let via_subst = build_via_subst(&mut pool, t, &a, &b);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first, via_subst);
    }

    #[test]
    fn different_arguments_never_identical(a in expr_strategy(), b in expr_strategy()) {
        prop_assume!(a != b);
        let mut pool = Pool::new();
        let t = recursive_template(&mut pool);
        let x = build(&mut pool, t, &a);
        let y = build(&mut pool, t, &b);
        prop_assert_ne!(x, y);
        prop_assert_ne!(pool.format_type(x), pool.format_type(y));
    }

    #[test]
    fn concrete_instances_are_fully_substituted(a in expr_strategy(), b in expr_strategy()) {
        let mut pool = Pool::new();
        let t = recursive_template(&mut pool);
        let inst = build(&mut pool, t, &Expr::Inst(Box::new(a), Box::new(b)));
        let under = pool.underlying(inst);
        prop_assert_eq!(pool.tag(under), Tag::Struct);
        prop_assert!(!pool.flags(inst).has_type_params());
        prop_assert!(!pool.flags(under).has_type_params());
        let next = pool.fields(inst)[2].ty;
        prop_assert_eq!(pool.elem(next), inst);
    }
}
