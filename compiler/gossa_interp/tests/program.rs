//! Sequential programs: control flow, aggregates, methods, formatting.

mod common;

use common::Fixture;
use gossa_ast::{Builtin, CompositeElem, CompositeKey, Intrinsic};
use gossa_ir::BinaryOp;
use gossa_types::{Field, Idx, Method};
use pretty_assertions::assert_eq;

#[test]
fn hello_world() {
    let mut fx = Fixture::new();
    let s = fx.b.string("hello");
    let n = fx.b.int(42);
    let p = fx.println(vec![s, n]);
    fx.main(vec![p]);
    let out = fx.run();
    assert!(out.success(), "{:?}", out.failure());
    assert_eq!(out.output, "hello 42\n");
}

#[test]
fn loop_accumulates_through_phis() {
    // s := 0; for i := 0; i < 5; i++ { s += i }; fmt.Println(s)
    let mut fx = Fixture::new();
    let s = fx.b.local("s", Idx::INT);
    let i = fx.b.local("i", Idx::INT);
    let zero = fx.b.int(0);
    let def_s = fx.b.define1(s, zero);
    let zero = fx.b.int(0);
    let init = fx.b.define1(i, zero);
    let ir = fx.b.local_ref(i);
    let five = fx.b.int(5);
    let cond = fx.b.cmp(BinaryOp::Lt, ir, five);
    let ir = fx.b.local_ref(i);
    let post = fx.b.inc(ir);
    let sr = fx.b.local_ref(s);
    let ir = fx.b.local_ref(i);
    let add = fx.b.op_assign(BinaryOp::Add, sr, ir);
    let loop_ = fx.b.for_(Some(init), Some(cond), Some(post), vec![add]);
    let sr = fx.b.local_ref(s);
    let p = fx.println(vec![sr]);
    fx.main(vec![def_s, loop_, p]);
    assert_eq!(fx.run().output, "10\n");
}

#[test]
fn swap_in_loop_reads_old_values() {
    // a, b := 1, 2; for i := 0; i < 3; i++ { a, b = b, a }; fmt.Println(a, b)
    let mut fx = Fixture::new();
    let a = fx.b.local("a", Idx::INT);
    let b = fx.b.local("b", Idx::INT);
    let i = fx.b.local("i", Idx::INT);
    let one = fx.b.int(1);
    let two = fx.b.int(2);
    let def = fx.b.define(vec![Some(a), Some(b)], vec![one, two]);
    let zero = fx.b.int(0);
    let init = fx.b.define1(i, zero);
    let ir = fx.b.local_ref(i);
    let three = fx.b.int(3);
    let cond = fx.b.cmp(BinaryOp::Lt, ir, three);
    let ir = fx.b.local_ref(i);
    let post = fx.b.inc(ir);
    let (al, bl) = (fx.b.local_ref(a), fx.b.local_ref(b));
    let (ar, br) = (fx.b.local_ref(a), fx.b.local_ref(b));
    let swap = fx.b.assign(vec![al, bl], vec![br, ar]);
    let loop_ = fx.b.for_(Some(init), Some(cond), Some(post), vec![swap]);
    let (ar, br) = (fx.b.local_ref(a), fx.b.local_ref(b));
    let p = fx.println(vec![ar, br]);
    fx.main(vec![def, loop_, p]);
    assert_eq!(fx.run().output, "2 1\n");
}

#[test]
fn maps_print_sorted_by_key() {
    let mut fx = Fixture::new();
    let map_ty = fx.pool.map(Idx::STRING, Idx::INT);
    let m = fx.b.local("m", map_ty);
    let mut elems = Vec::new();
    for (k, v) in [("b", 2), ("a", 1), ("c", 3)] {
        let key = fx.b.string(k);
        let value = fx.b.int(v);
        elems.push(CompositeElem {
            key: Some(CompositeKey::Expr(key)),
            value,
        });
    }
    let lit = fx.b.composite(map_ty, elems);
    let def = fx.b.define1(m, lit);
    let mr = fx.b.local_ref(m);
    let key = fx.b.string("b");
    let slot = fx.b.index(mr, key, Idx::INT);
    let forty = fx.b.int(40);
    let set = fx.b.assign(vec![slot], vec![forty]);
    let mr = fx.b.local_ref(m);
    let len = fx.b.call_builtin(Builtin::Len, vec![mr], Idx::INT);
    let mr = fx.b.local_ref(m);
    let p = fx.println(vec![len, mr]);
    fx.main(vec![def, set, p]);
    assert_eq!(fx.run().output, "3 map[a:1 b:40 c:3]\n");
}

#[test]
fn append_grows_and_keeps_prefix() {
    let mut fx = Fixture::new();
    let ints = fx.pool.slice(Idx::INT);
    let s = fx.b.local("s", ints);
    let nil = fx.b.nil(ints);
    let def = fx.b.define1(s, nil);
    let mut body = vec![def];
    for v in 1..=5 {
        let sr = fx.b.local_ref(s);
        let x = fx.b.int(v);
        let app = fx.b.call_builtin(Builtin::Append, vec![sr, x], ints);
        body.push(fx.b.assign_local(s, app));
    }
    let sr = fx.b.local_ref(s);
    let len = fx.b.call_builtin(Builtin::Len, vec![sr], Idx::INT);
    let sr = fx.b.local_ref(s);
    body.push(fx.println(vec![sr, len]));
    fx.main(body);
    assert_eq!(fx.run().output, "[1 2 3 4 5] 5\n");
}

#[test]
fn printf_verbs_and_struct_forms() {
    let mut fx = Fixture::new();
    let (x, label) = (fx.b.name("X"), fx.b.name("Label"));
    let st = fx
        .pool
        .struct_type(&[Field::new(x, Idx::INT), Field::new(label, Idx::STRING)]);
    let point = fx.pool.named("main", "Point", st);
    let one = fx.b.int(1);
    let a = fx.b.string("a");
    let lit = fx.b.composite_values(point, vec![one, a]);
    let p = fx.b.local("p", point);
    let def = fx.b.define1(p, lit);
    let (p1, p2) = (fx.b.local_ref(p), fx.b.local_ref(p));
    let show = fx.printf("%v %+v\n", vec![p1, p2]);
    let pi = fx.b.float(3.14159);
    let seven = fx.b.int(7);
    let hi = fx.b.string("hi");
    let ff = fx.b.int(255);
    let typed = fx.b.int(1);
    let nums = fx.printf("%5.2f|%-4d|%q|%x|%T\n", vec![pi, seven, hi, ff, typed]);
    fx.main(vec![def, show, nums]);
    assert_eq!(
        fx.run().output,
        "{1 a} {X:1 Label:a}\n 3.14|7   |\"hi\"|ff|int\n"
    );
}

#[test]
fn missing_and_extra_printf_operands() {
    let mut fx = Fixture::new();
    let one = fx.b.int(1);
    let a = fx.printf("%d %d\n", vec![one]);
    let one = fx.b.int(1);
    let two = fx.b.int(2);
    let b = fx.printf("%d\n", vec![one, two]);
    fx.main(vec![a, b]);
    assert_eq!(fx.run().output, "1 %!d(MISSING)\n1\n%!(EXTRA int=2)");
}

#[test]
fn stringer_method_is_used_by_println() {
    // type Celsius float64
    // func (c Celsius) String() string { return fmt.Sprintf("%.1fC", float64(c)) }
    let mut fx = Fixture::new();
    let celsius = fx.pool.named("main", "Celsius", Idx::FLOAT64);
    let sig = fx.pool.signature(&[], &[Idx::STRING], false);
    let c = fx.b.local("c", celsius);
    let format = fx.b.string("%.1fC");
    let cr = fx.b.local_ref(c);
    let f = fx.b.convert(cr, Idx::FLOAT64);
    let text = fx
        .b
        .call_intrinsic(Intrinsic::FmtSprintf, vec![format, f], Idx::STRING);
    let ret = fx.b.ret(vec![text]);
    let method = fx.b.func("String", sig, vec![], vec![None], vec![ret]);
    fx.b.set_recv(method, Some(c), celsius);
    let name = fx.b.name("String");
    fx.pool.add_method(
        celsius,
        Method {
            name,
            func: Some(method),
            sig,
            ptr_recv: false,
        },
    );

    let v = fx.b.float(21.5);
    let v = fx.b.convert(v, celsius);
    let p = fx.println(vec![v]);
    fx.main(vec![p]);
    assert_eq!(fx.run().output, "21.5C\n");
}

#[test]
fn errors_new_and_errorf_wrap() {
    let mut fx = Fixture::new();
    let err = fx.b.local("err", Idx::ERROR);
    let bad = fx.b.string("bad");
    let new = fx
        .b
        .call_intrinsic(Intrinsic::ErrorsNew, vec![bad], Idx::ERROR);
    let def = fx.b.define1(err, new);
    let format = fx.b.string("wrap: %w");
    let er = fx.b.local_ref(err);
    let wrapped = fx
        .b
        .call_intrinsic(Intrinsic::FmtErrorf, vec![format, er], Idx::ERROR);
    let er = fx.b.local_ref(err);
    let p = fx.println(vec![er, wrapped]);
    fx.main(vec![def, p]);
    assert_eq!(fx.run().output, "bad wrap: bad\n");
}

#[test]
fn error_method_called_through_the_interface() {
    // err := errors.New("bad"); fmt.Println(err.Error())
    let mut fx = Fixture::new();
    let err = fx.b.local("err", Idx::ERROR);
    let bad = fx.b.string("bad");
    let new = fx
        .b
        .call_intrinsic(Intrinsic::ErrorsNew, vec![bad], Idx::ERROR);
    let def = fx.b.define1(err, new);
    let er = fx.b.local_ref(err);
    let method = fx.b.method(er, "Error", Idx::ERROR_SIG);
    let text = fx.b.call(method, vec![], Idx::STRING);
    let p = fx.println(vec![text]);
    fx.main(vec![def, p]);
    let out = fx.run();
    assert!(out.success(), "{:?}", out.failure());
    assert_eq!(out.output, "bad\n");
}

#[test]
fn min_and_max_pick_extremes() {
    let mut fx = Fixture::new();
    let operands = |fx: &mut Fixture| -> Vec<_> { [3, 1, 2].map(|v| fx.b.int(v)).to_vec() };
    let args = operands(&mut fx);
    let lo = fx.b.call_builtin(Builtin::Min, args, Idx::INT);
    let args = operands(&mut fx);
    let hi = fx.b.call_builtin(Builtin::Max, args, Idx::INT);
    let p = fx.println(vec![lo, hi]);
    fx.main(vec![p]);
    assert_eq!(fx.run().output, "1 3\n");
}

#[test]
fn boxed_nil_pointer_is_not_a_nil_interface() {
    // var p *int; var x any = p; fmt.Println(x == nil, p == nil)
    let mut fx = Fixture::new();
    let ptr = fx.pool.pointer(Idx::INT);
    let p = fx.b.local("p", ptr);
    let x = fx.b.local("x", Idx::ANY);
    let nil = fx.b.nil(ptr);
    let def_p = fx.b.define1(p, nil);
    let pr = fx.b.local_ref(p);
    let boxed = fx.b.convert(pr, Idx::ANY);
    let def_x = fx.b.define1(x, boxed);
    let xr = fx.b.local_ref(x);
    let nil_any = fx.b.nil(Idx::ANY);
    let x_nil = fx.b.cmp(BinaryOp::Eq, xr, nil_any);
    let pr = fx.b.local_ref(p);
    let nil = fx.b.nil(ptr);
    let p_nil = fx.b.cmp(BinaryOp::Eq, pr, nil);
    let out = fx.println(vec![x_nil, p_nil]);
    fx.main(vec![def_p, def_x, out]);
    assert_eq!(fx.run().output, "false true\n");
}

#[test]
fn generic_function_runs_per_instance() {
    // func Show[T any](x T) string { return fmt.Sprint(x) }
    let mut fx = Fixture::new();
    let t_name = fx.b.name("T");
    let t = fx.pool.new_type_param(t_name, 0, Idx::ANY);
    let sig = fx.pool.signature(&[t], &[Idx::STRING], false);
    let x = fx.b.local("x", t);
    let xr = fx.b.local_ref(x);
    let text = fx
        .b
        .call_intrinsic(Intrinsic::FmtSprint, vec![xr], Idx::STRING);
    let ret = fx.b.ret(vec![text]);
    let show = fx.b.func("Show", sig, vec![Some(x)], vec![None], vec![ret]);
    fx.b.set_type_params(show, vec![t]);

    let int_sig = fx.pool.signature(&[Idx::INT], &[Idx::STRING], false);
    let callee = fx.b.instance(show, vec![Idx::INT], int_sig);
    let three = fx.b.int(3);
    let a = fx.b.call(callee, vec![three], Idx::STRING);
    let str_sig = fx.pool.signature(&[Idx::STRING], &[Idx::STRING], false);
    let callee = fx.b.instance(show, vec![Idx::STRING], str_sig);
    let s = fx.b.string("s");
    let b = fx.b.call(callee, vec![s], Idx::STRING);
    let p = fx.println(vec![a, b]);
    fx.main(vec![p]);
    assert_eq!(fx.run().output, "3 s\n");
}

#[test]
fn builtin_println_uses_runtime_formatting() {
    let mut fx = Fixture::new();
    let x = fx.b.string("x");
    let one = fx.b.int(1);
    let half = fx.b.float(0.5);
    let call = fx
        .b
        .call_builtin(Builtin::Println, vec![x, one, half], Idx::EMPTY_TUPLE);
    let s = fx.b.expr_stmt(call);
    fx.main(vec![s]);
    assert_eq!(fx.run().output, "x 1 +5.000000e-001\n");
}

#[test]
fn os_exit_stops_without_failure_text() {
    let mut fx = Fixture::new();
    let before = fx.b.string("before");
    let p = fx.println(vec![before]);
    let three = fx.b.int(3);
    let exit = fx
        .b
        .call_intrinsic(Intrinsic::OsExit, vec![three], Idx::EMPTY_TUPLE);
    let exit = fx.b.expr_stmt(exit);
    let after = fx.b.string("after");
    let q = fx.println(vec![after]);
    fx.main(vec![p, exit, q]);
    let out = fx.run();
    assert_eq!(out.exit_code, 3);
    assert_eq!(out.failure(), None);
    assert_eq!(out.output, "before\n");
}

#[test]
fn package_initializer_runs_before_main() {
    let mut fx = Fixture::new();
    let g = fx.b.global("answer", Idx::INT);
    let six = fx.b.int(6);
    let seven = fx.b.int(7);
    let product = fx.b.arith(BinaryOp::Mul, six, seven);
    fx.b.var_init(vec![Some(g)], vec![product]);
    let gr = fx.b.global_ref(g);
    let p = fx.println(vec![gr]);
    fx.main(vec![p]);
    assert_eq!(fx.run().output, "42\n");
}

#[test]
fn step_budget_stops_endless_loop() {
    let mut fx = Fixture::new();
    let spin = fx.b.for_(None, None, None, vec![]);
    fx.main(vec![spin]);
    let out = fx.run_with(|b| b.step_budget(500));
    assert_eq!(out.exit_code, 2);
    assert_eq!(
        out.failure().as_deref(),
        Some("fatal error: step budget of 500 instructions exhausted")
    );
}
