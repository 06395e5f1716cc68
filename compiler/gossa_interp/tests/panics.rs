//! Panics, deferred calls, `recover` and runtime faults.

mod common;

use common::Fixture;
use gossa_ast::{Builtin, Intrinsic, StmtId};
use gossa_interp::Fatal;
use gossa_types::Idx;
use pretty_assertions::assert_eq;

/// `panic(msg)` as a statement.
fn panic_stmt(fx: &mut Fixture, msg: &str) -> StmtId {
    let msg = fx.b.string(msg);
    let msg = fx.b.convert(msg, Idx::ANY);
    let call = fx.b.call_builtin(Builtin::Panic, vec![msg], Idx::EMPTY_TUPLE);
    fx.b.expr_stmt(call)
}

#[test]
fn uncaught_panic_keeps_earlier_output() {
    let mut fx = Fixture::new();
    let text = fx.b.string("before");
    let p = fx.println(vec![text]);
    let boom = panic_stmt(&mut fx, "boom");
    fx.main(vec![p, boom]);
    let out = fx.run();
    assert_eq!(out.exit_code, 2);
    assert_eq!(out.output, "before\n");
    assert_eq!(out.failure().as_deref(), Some("panic: boom"));
}

#[test]
fn deferred_calls_run_last_in_first_out() {
    let mut fx = Fixture::new();
    let mut body = Vec::new();
    for label in ["first", "second"] {
        let text = fx.b.string(label);
        let p = fx.println(vec![text]);
        body.push(fx.defer_lit(vec![p]));
    }
    let text = fx.b.string("body");
    body.push(fx.println(vec![text]));
    fx.main(body);
    assert_eq!(fx.run().output, "body\nsecond\nfirst\n");
}

#[test]
fn recover_in_deferred_call_stops_the_panic() {
    // func f() { defer func() { fmt.Println("recovered:", recover()) }(); panic("boom") }
    // func main() { f(); fmt.Println("after") }
    let mut fx = Fixture::new();
    let label = fx.b.string("recovered:");
    let rec = fx.b.call_builtin(Builtin::Recover, vec![], Idx::ANY);
    let p = fx.println(vec![label, rec]);
    let d = fx.defer_lit(vec![p]);
    let boom = panic_stmt(&mut fx, "boom");
    let f = fx.b.func("f", fx.void, vec![], vec![], vec![d, boom]);
    let call = fx.b.call_func(f, vec![], Idx::EMPTY_TUPLE);
    let call = fx.b.expr_stmt(call);
    let text = fx.b.string("after");
    let after = fx.println(vec![text]);
    fx.main(vec![call, after]);
    let out = fx.run();
    assert!(out.success(), "{:?}", out.failure());
    assert_eq!(out.output, "recovered: boom\nafter\n");
}

#[test]
fn recover_outside_panic_returns_nil() {
    let mut fx = Fixture::new();
    let rec = fx.b.call_builtin(Builtin::Recover, vec![], Idx::ANY);
    let p = fx.println(vec![rec]);
    fx.main(vec![p]);
    assert_eq!(fx.run().output, "<nil>\n");
}

#[test]
fn panic_in_deferred_call_supersedes_the_first() {
    let mut fx = Fixture::new();
    let second = panic_stmt(&mut fx, "second");
    let d = fx.defer_lit(vec![second]);
    let first = panic_stmt(&mut fx, "first");
    fx.main(vec![d, first]);
    let out = fx.run();
    assert_eq!(out.panics.len(), 2);
    assert_eq!(
        out.failure().as_deref(),
        Some("panic: first\n\tpanic: second")
    );
}

#[test]
fn index_out_of_range_is_a_runtime_error() {
    // s := []int{1, 2, 3}; i := 5; fmt.Println(s[i])
    let mut fx = Fixture::new();
    let ints = fx.pool.slice(Idx::INT);
    let s = fx.b.local("s", ints);
    let elems: Vec<_> = (1..=3).map(|v| fx.b.int(v)).collect();
    let lit = fx.b.composite_values(ints, elems);
    let def_s = fx.b.define1(s, lit);
    let i = fx.b.local("i", Idx::INT);
    let five = fx.b.int(5);
    let def_i = fx.b.define1(i, five);
    let sr = fx.b.local_ref(s);
    let ir = fx.b.local_ref(i);
    let elem = fx.b.index(sr, ir, Idx::INT);
    let p = fx.println(vec![elem]);
    fx.main(vec![def_s, def_i, p]);
    let out = fx.run();
    assert_eq!(
        out.failure().as_deref(),
        Some("panic: runtime error: index out of range [5] with length 3")
    );
}

#[test]
fn nil_map_write_panics() {
    let mut fx = Fixture::new();
    let map_ty = fx.pool.map(Idx::STRING, Idx::INT);
    let m = fx.b.local("m", map_ty);
    let def = fx.b.define(vec![Some(m)], vec![]);
    let mr = fx.b.local_ref(m);
    let key = fx.b.string("k");
    let slot = fx.b.index(mr, key, Idx::INT);
    let one = fx.b.int(1);
    let set = fx.b.assign(vec![slot], vec![one]);
    fx.main(vec![def, set]);
    assert_eq!(
        fx.run().failure().as_deref(),
        Some("panic: assignment to entry in nil map")
    );
}

#[test]
fn recovered_fault_is_a_runtime_error_value() {
    // defer func() { fmt.Println(recover()) }(); var p *int; fmt.Println(*p)
    let mut fx = Fixture::new();
    let rec = fx.b.call_builtin(Builtin::Recover, vec![], Idx::ANY);
    let p = fx.println(vec![rec]);
    let d = fx.defer_lit(vec![p]);
    let ptr = fx.pool.pointer(Idx::INT);
    let local = fx.b.local("p", ptr);
    let def = fx.b.define(vec![Some(local)], vec![]);
    let pr = fx.b.local_ref(local);
    let load = fx.b.deref(pr, Idx::INT);
    let show = fx.println(vec![load]);
    fx.main(vec![d, def, show]);
    let out = fx.run();
    assert!(out.success(), "{:?}", out.failure());
    assert_eq!(
        out.output,
        "runtime error: invalid memory address or nil pointer dereference\n"
    );
}

#[test]
fn unbounded_recursion_overflows_the_stack() {
    let mut fx = Fixture::new();
    let f = fx.b.declare_func("f", fx.void);
    let call = fx.b.call_func(f, vec![], Idx::EMPTY_TUPLE);
    let call = fx.b.expr_stmt(call);
    fx.b.set_body(f, vec![call]);
    let start = fx.b.call_func(f, vec![], Idx::EMPTY_TUPLE);
    let start = fx.b.expr_stmt(start);
    fx.main(vec![start]);
    let out = fx.run_with(|b| b.max_depth(64));
    assert_eq!(out.fatal, Some(Fatal::StackOverflow { limit: 64 }));
    assert_eq!(out.exit_code, 2);
}

#[test]
fn panic_with_error_value_reports_its_text() {
    // panic(errors.New("boom"))
    let mut fx = Fixture::new();
    let text = fx.b.string("boom");
    let err = fx
        .b
        .call_intrinsic(Intrinsic::ErrorsNew, vec![text], Idx::ERROR);
    let err = fx.b.convert(err, Idx::ANY);
    let call = fx.b.call_builtin(Builtin::Panic, vec![err], Idx::EMPTY_TUPLE);
    let boom = fx.b.expr_stmt(call);
    fx.main(vec![boom]);
    let out = fx.run();
    assert_eq!(out.exit_code, 2);
    assert_eq!(out.failure().as_deref(), Some("panic: boom"));
}

#[test]
fn recover_in_a_helper_of_the_deferred_call_returns_nil() {
    // func helper() any { return recover() }
    // func f() {
    //     defer func() { fmt.Println("helper:", helper()); fmt.Println("direct:", recover()) }()
    //     panic("boom")
    // }
    // func main() { f(); fmt.Println("after") }
    let mut fx = Fixture::new();
    let helper_sig = fx.pool.signature(&[], &[Idx::ANY], false);
    let rec = fx.b.call_builtin(Builtin::Recover, vec![], Idx::ANY);
    let ret = fx.b.ret(vec![rec]);
    let helper = fx.b.func("helper", helper_sig, vec![], vec![None], vec![ret]);

    let label = fx.b.string("helper:");
    let via_helper = fx.b.call_func(helper, vec![], Idx::ANY);
    let first = fx.println(vec![label, via_helper]);
    let label = fx.b.string("direct:");
    let rec = fx.b.call_builtin(Builtin::Recover, vec![], Idx::ANY);
    let second = fx.println(vec![label, rec]);
    let d = fx.defer_lit(vec![first, second]);
    let boom = panic_stmt(&mut fx, "boom");
    let f = fx.b.func("f", fx.void, vec![], vec![], vec![d, boom]);

    let call = fx.b.call_func(f, vec![], Idx::EMPTY_TUPLE);
    let call = fx.b.expr_stmt(call);
    let text = fx.b.string("after");
    let after = fx.println(vec![text]);
    fx.main(vec![call, after]);
    let out = fx.run();
    assert!(out.success(), "{:?}", out.failure());
    assert_eq!(out.output, "helper: <nil>\ndirect: boom\nafter\n");
}

#[test]
fn deferred_closure_sets_named_result_after_recover() {
    // func f() (n int) { defer func() { recover(); n = 7 }(); panic("x") }
    // func main() { fmt.Println(f()) }
    let mut fx = Fixture::new();
    let sig = fx.pool.signature(&[], &[Idx::INT], false);
    let n = fx.b.local("n", Idx::INT);
    let rec = fx.b.call_builtin(Builtin::Recover, vec![], Idx::ANY);
    let rec = fx.b.expr_stmt(rec);
    let seven = fx.b.int(7);
    let set = fx.b.assign_local(n, seven);
    let d = fx.defer_lit(vec![rec, set]);
    let boom = panic_stmt(&mut fx, "x");
    let f = fx.b.func("f", sig, vec![], vec![Some(n)], vec![d, boom]);
    let result = fx.b.call_func(f, vec![], Idx::INT);
    let p = fx.println(vec![result]);
    fx.main(vec![p]);
    let out = fx.run();
    assert!(out.success(), "{:?}", out.failure());
    assert_eq!(out.output, "7\n");
}
