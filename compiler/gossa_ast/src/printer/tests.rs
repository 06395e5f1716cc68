use gossa_ir::{BinaryOp, StringInterner};
use gossa_types::{Field, Idx, Pool};
use pretty_assertions::assert_eq;

use crate::{AstBuilder, Builtin, Intrinsic, Printer, RangeTarget};

fn setup() -> (Pool, AstBuilder) {
    let interner = StringInterner::shared();
    let pool = Pool::with_interner(interner.clone());
    let b = AstBuilder::new("main", interner);
    (pool, b)
}

#[test]
fn binary_operands_parenthesized_by_precedence() {
    let (pool, mut b) = setup();
    let x = b.local("x", Idx::INT);
    let (x1, x2) = (b.local_ref(x), b.local_ref(x));
    let one = b.int(1);
    let sum = b.arith(BinaryOp::Add, x1, one);
    let prod = b.arith(BinaryOp::Mul, sum, x2);
    let two = b.int(2);
    let flat = b.arith(BinaryOp::Mul, x2, two);
    let flat = b.arith(BinaryOp::Add, one, flat);
    let pkg = b.finish();
    let p = Printer::new(&pkg, &pool);
    assert_eq!(p.expr(prod), "(x + 1) * x");
    assert_eq!(p.expr(flat), "1 + x * 2");
}

#[test]
fn calls_and_simple_statements() {
    let (mut pool, mut b) = setup();
    let ints = pool.slice(Idx::INT);
    let xs = b.local("xs", ints);
    let n = b.local("n", Idx::INT);
    let xs_ref = b.local_ref(xs);
    let len = b.call_builtin(Builtin::Len, vec![xs_ref], Idx::INT);
    let def = b.define1(n, len);
    let msg = b.string("hi");
    let n_ref = b.local_ref(n);
    let println = b.call_intrinsic(Intrinsic::FmtPrintln, vec![msg, n_ref], Idx::EMPTY_TUPLE);
    let print = b.expr_stmt(println);
    let n_ref = b.local_ref(n);
    let inc = b.inc(n_ref);
    let xs_ref = b.local_ref(xs);
    let spread = b.call_spread(xs_ref, vec![], Idx::EMPTY_TUPLE);
    let spread = b.expr_stmt(spread);
    let ret = b.ret(vec![]);
    let brk = b.brk(Some("outer"));
    let pkg = b.finish();
    let p = Printer::new(&pkg, &pool);
    assert_eq!(p.stmt(def), "n := len(xs)");
    assert_eq!(p.stmt(print), r#"fmt.Println("hi", n)"#);
    assert_eq!(p.stmt(inc), "n++");
    assert_eq!(p.stmt(spread), "xs(...)");
    assert_eq!(p.stmt(ret), "return");
    assert_eq!(p.stmt(brk), "break outer");
}

#[test]
fn embedded_field_hops_are_implicit() {
    let (mut pool, mut b) = setup();
    let x_name = pool.intern_name("x");
    let inner = pool.struct_type(&[Field::new(x_name, Idx::INT)]);
    let inner = pool.named("main", "Inner", inner);
    let inner_ptr = pool.pointer(inner);
    let inner_name = pool.intern_name("Inner");
    let outer = pool.struct_type(&[Field::embedded(inner_name, inner_ptr)]);
    let outer = pool.named("main", "Outer", outer);
    let o = b.local("o", outer);
    let o_ref = b.local_ref(o);
    let fx = b.field(o_ref, vec![0, 0], Idx::INT);
    let pkg = b.finish();
    assert_eq!(Printer::new(&pkg, &pool).expr(fx), "o.x");
}

#[test]
fn compound_statements_render_headers() {
    let (mut pool, mut b) = setup();
    let ints = pool.slice(Idx::INT);
    let xs = b.local("xs", ints);
    let i = b.local("i", Idx::INT);
    let v = b.local("v", Idx::INT);
    let xs_ref = b.local_ref(xs);
    let range = b.range(
        Some(RangeTarget::Local(i)),
        Some(RangeTarget::Local(v)),
        xs_ref,
        vec![],
    );
    let i_ref = b.local_ref(i);
    let three = b.int(3);
    let cond = b.cmp(BinaryOp::Lt, i_ref, three);
    let if_ = b.if_(None, cond, vec![], None);
    let sel = b.select(vec![]);
    let pkg = b.finish();
    let p = Printer::new(&pkg, &pool);
    assert_eq!(p.stmt(range), "for i, v := range xs");
    assert_eq!(p.stmt(if_), "if i < 3");
    assert_eq!(p.stmt(sel), "select");
}
