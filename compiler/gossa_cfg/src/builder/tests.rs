use gossa_ast::visitor::{Visitor, walk_stmt};
use gossa_ast::{AstBuilder, Builtin, FuncLit, Package, RangeTarget, StmtId};
use gossa_diagnostic::ErrorCode;
use gossa_ir::{BinaryOp, FuncId, StringInterner};
use gossa_types::{ChanDir, Idx, Pool};
use pretty_assertions::assert_eq;

use crate::{Cfg, DefaultOracle, build};

struct Fixture {
    pool: Pool,
    b: AstBuilder,
    sig: Idx,
}

impl Fixture {
    fn new() -> Self {
        let interner = StringInterner::shared();
        let mut pool = Pool::with_interner(interner.clone());
        let sig = pool.signature(&[], &[], false);
        Fixture {
            pool,
            b: AstBuilder::new("main", interner),
            sig,
        }
    }

    fn func(&mut self, name: &str) -> FuncId {
        self.b.declare_func(name, self.sig)
    }

    fn call(&mut self, f: FuncId) -> StmtId {
        let c = self.b.call_func(f, vec![], Idx::EMPTY_TUPLE);
        self.b.expr_stmt(c)
    }

    fn build(self, body: &[StmtId]) -> (Cfg, Package, Pool) {
        let pkg = self.b.finish();
        let cfg = build(&pkg, self.pool.interner(), body, &DefaultOracle);
        (cfg, pkg, self.pool)
    }
}

fn is_live(cfg: &Cfg, stmt: StmtId) -> bool {
    cfg.block_of(stmt).is_some_and(|b| b.live)
}

#[test]
fn code_after_return_is_dead() {
    let mut fx = Fixture::new();
    let live = fx.func("live");
    let dead = fx.func("dead");
    let s1 = fx.call(live);
    let s2 = fx.b.ret(vec![]);
    let s3 = fx.call(dead);
    let (cfg, pkg, pool) = fx.build(&[s1, s2, s3]);

    assert_eq!(
        cfg.format(&pkg, &pool),
        ".0: Body [live] live(); return\n.1: Unreachable [dead] dead()\n"
    );
    assert!(is_live(&cfg, s1));
    assert!(!is_live(&cfg, s3));
    assert!(cfg.diagnostics.is_empty());
}

#[test]
fn panic_ends_reachability() {
    let mut fx = Fixture::new();
    let after = fx.func("after");
    let msg = fx.b.string("boom");
    let p = fx.b.call_builtin(Builtin::Panic, vec![msg], Idx::EMPTY_TUPLE);
    let p = fx.b.expr_stmt(p);
    let s = fx.call(after);
    let (cfg, _, _) = fx.build(&[p, s]);
    assert!(is_live(&cfg, p));
    assert!(!is_live(&cfg, s));
}

#[test]
fn custom_oracle_decides_no_return() {
    let mut fx = Fixture::new();
    let fatal = fx.func("fatal");
    let after = fx.func("after");
    let s1 = fx.call(fatal);
    let s2 = fx.call(after);
    let pkg = fx.b.finish();
    let never = |_: &Package, _: gossa_ast::ExprId| false;
    let cfg = build(&pkg, fx.pool.interner(), &[s1, s2], &never);
    assert!(!is_live(&cfg, s2));
}

#[test]
fn if_else_layout_and_dot() {
    let mut fx = Fixture::new();
    let (a, bf, d) = (fx.func("a"), fx.func("b"), fx.func("d"));
    let c = fx.b.local("c", Idx::BOOL);
    let cond = fx.b.local_ref(c);
    let then = fx.call(a);
    let els = fx.call(bf);
    let els = fx.b.block(vec![els]);
    let if_ = fx.b.if_(None, cond, vec![then], Some(els));
    let tail = fx.call(d);
    let (cfg, pkg, pool) = fx.build(&[if_, tail]);

    assert_eq!(
        cfg.format(&pkg, &pool),
        ".0: Body [live] c\n\
         .1: IfThen [live] a()\n\
         .2: IfDone [live] d()\n\
         .3: IfElse [live] b()\n"
    );
    assert_eq!(
        cfg.dot(),
        "digraph cfg {\n  \
         n0 [label=\".0: Body\"];\n  \
         n1 [label=\".1: IfThen\"];\n  \
         n2 [label=\".2: IfDone\"];\n  \
         n3 [label=\".3: IfElse\"];\n  \
         n0 -> n1;\n  \
         n0 -> n3;\n  \
         n1 -> n2;\n  \
         n3 -> n2;\n\
         }\n"
    );
}

#[test]
fn three_clause_for_loop() {
    let mut fx = Fixture::new();
    let body = fx.func("body");
    let i = fx.b.local("i", Idx::INT);
    let zero = fx.b.int(0);
    let init = fx.b.define1(i, zero);
    let i_ref = fx.b.local_ref(i);
    let three = fx.b.int(3);
    let cond = fx.b.cmp(BinaryOp::Lt, i_ref, three);
    let i_ref = fx.b.local_ref(i);
    let post = fx.b.inc(i_ref);
    let call = fx.call(body);
    let for_ = fx.b.for_(Some(init), Some(cond), Some(post), vec![call]);
    let (cfg, pkg, pool) = fx.build(&[for_]);

    assert_eq!(
        cfg.format(&pkg, &pool),
        ".0: Body [live] i := 0\n\
         .1: ForBody [live] body()\n\
         .2: ForDone [live]\n\
         .3: ForLoop [live] i < 3\n\
         .4: ForPost [live] i++\n"
    );
}

#[test]
fn infinite_loop_without_break_kills_what_follows() {
    let mut fx = Fixture::new();
    let after = fx.func("after");
    let for_ = fx.b.for_(None, None, None, vec![]);
    let s = fx.call(after);
    let (cfg, _, _) = fx.build(&[for_, s]);
    assert!(!is_live(&cfg, s));
}

#[test]
fn infinite_loop_with_break_keeps_what_follows() {
    let mut fx = Fixture::new();
    let after = fx.func("after");
    let c = fx.b.local("c", Idx::BOOL);
    let cond = fx.b.local_ref(c);
    let brk = fx.b.brk(None);
    let if_ = fx.b.if_(None, cond, vec![brk], None);
    let for_ = fx.b.for_(None, None, None, vec![if_]);
    let s = fx.call(after);
    let (cfg, _, _) = fx.build(&[for_, s]);
    assert!(is_live(&cfg, s));
    assert!(cfg.diagnostics.is_empty());
}

#[test]
fn labeled_break_leaves_nested_loops() {
    let mut fx = Fixture::new();
    let (mid, after) = (fx.func("mid"), fx.func("after"));
    let brk = fx.b.brk(Some("outer"));
    let inner = fx.b.for_(None, None, None, vec![brk]);
    let mid_call = fx.call(mid);
    let outer = fx.b.for_(None, None, None, vec![inner, mid_call]);
    let labeled = fx.b.labeled("outer", outer);
    let after_call = fx.call(after);
    let (cfg, _, _) = fx.build(&[labeled, after_call]);

    assert!(is_live(&cfg, brk));
    assert!(!is_live(&cfg, mid_call));
    assert!(is_live(&cfg, after_call));
    assert!(cfg.diagnostics.is_empty());
}

#[test]
fn labeled_continue_targets_outer_loop() {
    let mut fx = Fixture::new();
    let after = fx.func("after");
    let cont = fx.b.cont(Some("outer"));
    let inner = fx.b.for_(None, None, None, vec![cont]);
    let outer = fx.b.for_(None, None, None, vec![inner]);
    let labeled = fx.b.labeled("outer", outer);
    let after_call = fx.call(after);
    let (cfg, _, _) = fx.build(&[labeled, after_call]);

    let block = cfg.block_of(cont).unwrap();
    // Continue of a condition-less loop without post jumps to its body.
    let outer_body = cfg
        .blocks
        .iter()
        .find(|b| b.stmt == Some(outer) && b.kind == crate::BlockKind::ForBody)
        .unwrap();
    assert_eq!(block.succs.as_slice(), &[outer_body.index]);
    assert!(!is_live(&cfg, after_call));
}

#[test]
fn empty_select_blocks_forever() {
    let mut fx = Fixture::new();
    let after = fx.func("after");
    let sel = fx.b.select(vec![]);
    let s = fx.call(after);
    let (cfg, _, _) = fx.build(&[sel, s]);
    assert!(!is_live(&cfg, s));
}

#[test]
fn select_with_default_continues() {
    let mut fx = Fixture::new();
    let (a, d, after) = (fx.func("a"), fx.func("d"), fx.func("after"));
    let chan = fx.pool.chan(ChanDir::Both, Idx::INT);
    let ch = fx.b.local("ch", chan);
    let v = fx.b.local("v", Idx::INT);
    let ch_ref = fx.b.local_ref(ch);
    let recv = fx.b.recv(ch_ref, Idx::INT);
    let comm = fx.b.define1(v, recv);
    let a_call = fx.call(a);
    let case = fx.b.comm(Some(comm), vec![a_call]);
    let d_call = fx.call(d);
    let default = fx.b.comm(None, vec![d_call]);
    let sel = fx.b.select(vec![case, default]);
    let after_call = fx.call(after);
    let (cfg, _, _) = fx.build(&[sel, after_call]);

    assert!(is_live(&cfg, comm));
    assert!(is_live(&cfg, a_call));
    assert!(is_live(&cfg, d_call));
    assert!(is_live(&cfg, after_call));
}

#[test]
fn fallthrough_targets_next_body_in_source_order() {
    let mut fx = Fixture::new();
    let (a, bf, c) = (fx.func("a"), fx.func("b"), fx.func("c"));
    let x = fx.b.local("x", Idx::INT);
    let tag = fx.b.local_ref(x);
    let one = fx.b.int(1);
    let two = fx.b.int(2);
    let a_call = fx.call(a);
    let ft = fx.b.fallthrough();
    let case1 = fx.b.case(vec![one], vec![a_call, ft]);
    let b_call = fx.call(bf);
    let case2 = fx.b.case(vec![two], vec![b_call]);
    let c_call = fx.call(c);
    let default = fx.b.case(vec![], vec![c_call]);
    let sw = fx.b.switch(None, Some(tag), vec![case1, case2, default]);
    let (cfg, _, _) = fx.build(&[sw]);

    assert!(cfg.diagnostics.is_empty());
    let b_block = cfg.block_of(b_call).unwrap().index;
    assert_eq!(cfg.block_of(ft).unwrap().succs.as_slice(), &[b_block]);
    assert!([a_call, b_call, c_call].iter().all(|&s| is_live(&cfg, s)));
}

#[test]
fn control_flow_diagnostics() {
    let mut fx = Fixture::new();
    let brk = fx.b.brk(None);
    let cont = fx.b.cont(None);
    let goto = fx.b.goto("missing");
    let loop_ = fx.b.for_(None, None, None, vec![]);
    let first = fx.b.labeled("L", loop_);
    let empty = fx.b.empty();
    let dup = fx.b.labeled("L", empty);
    let cont_l = fx.b.cont(Some("L"));
    let t = fx.b.bool(true);
    let case = fx.b.case(vec![t], vec![cont_l]);
    let sw1 = fx.b.switch(None, None, vec![case]);
    let ft = fx.b.fallthrough();
    let default = fx.b.case(vec![], vec![ft]);
    let sw2 = fx.b.switch(None, None, vec![default]);
    let (cfg, _, _) = fx.build(&[brk, cont, goto, first, dup, sw1, sw2]);

    let codes: Vec<ErrorCode> = cfg.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![
            ErrorCode::E1003,
            ErrorCode::E1004,
            ErrorCode::E1001,
            ErrorCode::E1002,
            ErrorCode::E1006,
            ErrorCode::E1005,
        ]
    );
    assert_eq!(cfg.diagnostics[2].message, "label missing not defined");
    assert_eq!(
        cfg.diagnostics[5].message,
        "fallthrough statement out of place: cannot fallthrough final case in switch"
    );
}

#[test]
fn goto_forward_label() {
    let mut fx = Fixture::new();
    let (skipped, target) = (fx.func("skipped"), fx.func("target"));
    let goto = fx.b.goto("end");
    let skipped_call = fx.call(skipped);
    let target_call = fx.call(target);
    let labeled = fx.b.labeled("end", target_call);
    let (cfg, _, _) = fx.build(&[goto, skipped_call, labeled]);

    assert!(cfg.diagnostics.is_empty());
    assert!(!is_live(&cfg, skipped_call));
    assert!(is_live(&cfg, target_call));
    assert_eq!(cfg.block_of(target_call).unwrap().stmt, Some(labeled));
}

/// Simple statements outside function literals.
#[derive(Default)]
struct SimpleStmts(Vec<StmtId>);

impl<'ast> Visitor<'ast> for SimpleStmts {
    fn visit_stmt(&mut self, pkg: &'ast Package, id: StmtId) {
        if pkg.stmt(id).kind.is_simple() {
            self.0.push(id);
        }
        walk_stmt(self, pkg, id);
    }

    fn visit_func_lit(&mut self, _: &'ast Package, _: &'ast FuncLit) {}
}

#[test]
fn blocks_partition_every_simple_statement() {
    let mut fx = Fixture::new();
    let work = fx.func("work");
    let ints = fx.pool.slice(Idx::INT);
    let chan = fx.pool.chan(ChanDir::Both, Idx::INT);
    let xs = fx.b.local("xs", ints);
    let ch = fx.b.local("ch", chan);
    let any = fx.b.local("v", Idx::ANY);
    let i = fx.b.local("i", Idx::INT);
    let k = fx.b.local("k", Idx::INT);
    let r = fx.b.local("r", Idx::INT);

    let zero = fx.b.int(0);
    let init = fx.b.define1(i, zero);
    let i_ref = fx.b.local_ref(i);
    let ten = fx.b.int(10);
    let cond = fx.b.cmp(BinaryOp::Lt, i_ref, ten);
    let i_ref = fx.b.local_ref(i);
    let post = fx.b.inc(i_ref);
    let i_ref = fx.b.local_ref(i);
    let five = fx.b.int(5);
    let is_five = fx.b.cmp(BinaryOp::Eq, i_ref, five);
    let cont = fx.b.cont(Some("loop"));
    let w1 = fx.call(work);
    let inner_else = fx.b.block(vec![w1]);
    let i_ref = fx.b.local_ref(i);
    let six = fx.b.int(6);
    let is_six = fx.b.cmp(BinaryOp::Eq, i_ref, six);
    let brk = fx.b.brk(None);
    let else_if = fx.b.if_(None, is_six, vec![brk], Some(inner_else));
    let if_ = fx.b.if_(None, is_five, vec![cont], Some(else_if));
    let for_ = fx.b.for_(Some(init), Some(cond), Some(post), vec![if_]);
    let looped = fx.b.labeled("loop", for_);

    let xs_ref = fx.b.local_ref(xs);
    let w2 = fx.call(work);
    let range = fx.b.range(Some(RangeTarget::Local(k)), None, xs_ref, vec![w2]);

    let k_ref = fx.b.local_ref(k);
    let one = fx.b.int(1);
    let w3 = fx.call(work);
    let ft = fx.b.fallthrough();
    let default = fx.b.case(vec![], vec![w3, ft]);
    let w4 = fx.call(work);
    let case = fx.b.case(vec![one], vec![w4]);
    let sw = fx.b.switch(None, Some(k_ref), vec![default, case]);

    let v_ref = fx.b.local_ref(any);
    let w5 = fx.call(work);
    let tcase = fx.b.type_case(vec![Some(Idx::INT), None], None, vec![w5]);
    let w6 = fx.call(work);
    let tdefault = fx.b.type_case(vec![], None, vec![w6]);
    let ts = fx.b.type_switch(None, v_ref, vec![tcase, tdefault]);

    let ch_ref = fx.b.local_ref(ch);
    let two = fx.b.int(2);
    let send = fx.b.send(ch_ref, two);
    let w7 = fx.call(work);
    let send_case = fx.b.comm(Some(send), vec![w7]);
    let ch_ref = fx.b.local_ref(ch);
    let recv = fx.b.recv(ch_ref, Idx::INT);
    let recv_def = fx.b.define1(r, recv);
    let recv_case = fx.b.comm(Some(recv_def), vec![]);
    let sel = fx.b.select(vec![send_case, recv_case]);

    let goto = fx.b.goto("done");
    let dead = fx.call(work);
    let ret = fx.b.ret(vec![]);
    let done = fx.b.labeled("done", ret);

    let body = [looped, range, sw, ts, sel, goto, dead, done];
    let pkg = fx.b.finish();
    let cfg = build(&pkg, fx.pool.interner(), &body, &DefaultOracle);
    assert!(cfg.diagnostics.is_empty(), "{:?}", cfg.diagnostics);

    let mut expected = SimpleStmts::default();
    for &s in &body {
        expected.visit_stmt(&pkg, s);
    }
    let mut expected = expected.0;
    let mut got: Vec<StmtId> = cfg.statements().collect();
    assert_eq!(got.len(), expected.len());
    got.sort();
    expected.sort();
    assert_eq!(got, expected);

    assert!(!is_live(&cfg, dead));
    assert!(is_live(&cfg, ret));
}
