//! Goroutines, channels, `select` and the sync primitives.

mod common;

use common::Fixture;
use gossa_ast::{Builtin, ExprId, Intrinsic, RangeTarget, StmtId};
use gossa_interp::Fatal;
use gossa_ir::{BinaryOp, LocalId};
use gossa_types::{ChanDir, Idx};
use pretty_assertions::assert_eq;

/// `name := make(chan int, size)`
fn make_chan(fx: &mut Fixture, name: &str, size: i64) -> (LocalId, StmtId) {
    let ty = fx.pool.chan(ChanDir::Both, Idx::INT);
    let local = fx.b.local(name, ty);
    let size = fx.b.int(size);
    let make = fx.b.call_builtin(Builtin::Make, vec![size], ty);
    let def = fx.b.define1(local, make);
    (local, def)
}

/// `target.Method(extra...)` for a sync intrinsic taking `&target` first.
fn sync_call(
    fx: &mut Fixture,
    i: Intrinsic,
    target: LocalId,
    ptr: Idx,
    extra: Vec<ExprId>,
) -> StmtId {
    let r = fx.b.local_ref(target);
    let addr = fx.b.addr_of(r, ptr);
    let mut args = vec![addr];
    args.extend(extra);
    let call = fx.b.call_intrinsic(i, args, Idx::EMPTY_TUPLE);
    fx.b.expr_stmt(call)
}

#[test]
fn unbuffered_send_meets_receive() {
    let mut fx = Fixture::new();
    let (ch, def) = make_chan(&mut fx, "ch", 0);
    let cr = fx.b.local_ref(ch);
    let v = fx.b.int(42);
    let send = fx.b.send(cr, v);
    let go = fx.go_lit(vec![send]);
    let cr = fx.b.local_ref(ch);
    let got = fx.b.recv(cr, Idx::INT);
    let p = fx.println(vec![got]);
    fx.main(vec![def, go, p]);
    let out = fx.run();
    assert!(out.success(), "{:?}", out.failure());
    assert_eq!(out.output, "42\n");
}

#[test]
fn range_over_closed_channel_drains_buffer() {
    let mut fx = Fixture::new();
    let (ch, def) = make_chan(&mut fx, "ch", 3);
    let mut body = vec![def];
    for v in [1, 2, 3] {
        let cr = fx.b.local_ref(ch);
        let v = fx.b.int(v);
        body.push(fx.b.send(cr, v));
    }
    let cr = fx.b.local_ref(ch);
    let close = fx.b.call_builtin(Builtin::Close, vec![cr], Idx::EMPTY_TUPLE);
    body.push(fx.b.expr_stmt(close));
    let v = fx.b.local("v", Idx::INT);
    let vr = fx.b.local_ref(v);
    let p = fx.print(vec![vr]);
    let cr = fx.b.local_ref(ch);
    body.push(fx.b.range(Some(RangeTarget::Local(v)), None, cr, vec![p]));
    fx.main(body);
    assert_eq!(fx.run().output, "123");
}

#[test]
fn receive_with_no_sender_deadlocks() {
    let mut fx = Fixture::new();
    let (ch, def) = make_chan(&mut fx, "ch", 0);
    let cr = fx.b.local_ref(ch);
    let got = fx.b.recv(cr, Idx::INT);
    let s = fx.b.expr_stmt(got);
    fx.main(vec![def, s]);
    let out = fx.run();
    assert_eq!(out.exit_code, 2);
    assert_eq!(out.fatal, Some(Fatal::Deadlock));
    assert_eq!(
        out.failure().as_deref(),
        Some("fatal error: all goroutines are asleep - deadlock!")
    );
}

#[test]
fn empty_select_deadlocks() {
    let mut fx = Fixture::new();
    let sel = fx.b.select(vec![]);
    fx.main(vec![sel]);
    assert_eq!(fx.run().fatal, Some(Fatal::Deadlock));
}

#[test]
fn select_takes_default_when_nothing_is_ready() {
    let mut fx = Fixture::new();
    let (ch, def) = make_chan(&mut fx, "ch", 0);
    let cr = fx.b.local_ref(ch);
    let got = fx.b.recv(cr, Idx::INT);
    let recv = fx.b.expr_stmt(got);
    let text = fx.b.string("received");
    let p = fx.println(vec![text]);
    let case = fx.b.comm(Some(recv), vec![p]);
    let text = fx.b.string("none");
    let p = fx.println(vec![text]);
    let default = fx.b.comm(None, vec![p]);
    let sel = fx.b.select(vec![case, default]);
    fx.main(vec![def, sel]);
    assert_eq!(fx.run().output, "none\n");
}

#[test]
fn send_on_closed_channel_panics() {
    let mut fx = Fixture::new();
    let (ch, def) = make_chan(&mut fx, "ch", 1);
    let cr = fx.b.local_ref(ch);
    let close = fx.b.call_builtin(Builtin::Close, vec![cr], Idx::EMPTY_TUPLE);
    let close = fx.b.expr_stmt(close);
    let cr = fx.b.local_ref(ch);
    let one = fx.b.int(1);
    let send = fx.b.send(cr, one);
    fx.main(vec![def, close, send]);
    let out = fx.run();
    assert_eq!(out.exit_code, 2);
    assert_eq!(out.failure().as_deref(), Some("panic: send on closed channel"));
}

/// Two buffered channels with ten values each; `select` ten times and
/// print which channel each value came from.
fn select_trace() -> Fixture {
    let mut fx = Fixture::new();
    let (a, def_a) = make_chan(&mut fx, "a", 10);
    let (b, def_b) = make_chan(&mut fx, "b", 10);
    let mut body = vec![def_a, def_b];
    for _ in 0..10 {
        for ch in [a, b] {
            let cr = fx.b.local_ref(ch);
            let v = fx.b.int(0);
            body.push(fx.b.send(cr, v));
        }
    }
    let mut clauses = Vec::new();
    for (ch, label) in [(a, "a"), (b, "b")] {
        let cr = fx.b.local_ref(ch);
        let got = fx.b.recv(cr, Idx::INT);
        let recv = fx.b.expr_stmt(got);
        let text = fx.b.string(label);
        let p = fx.print(vec![text]);
        clauses.push(fx.b.comm(Some(recv), vec![p]));
    }
    let sel = fx.b.select(clauses);
    let i = fx.b.local("i", Idx::INT);
    let zero = fx.b.int(0);
    let init = fx.b.define1(i, zero);
    let ir = fx.b.local_ref(i);
    let ten = fx.b.int(10);
    let cond = fx.b.cmp(BinaryOp::Lt, ir, ten);
    let ir = fx.b.local_ref(i);
    let post = fx.b.inc(ir);
    body.push(fx.b.for_(Some(init), Some(cond), Some(post), vec![sel]));
    fx.main(body);
    fx
}

#[test]
fn select_choices_repeat_for_a_seed() {
    let first = select_trace().run_with(|b| b.seed(7)).output;
    let second = select_trace().run_with(|b| b.seed(7)).output;
    assert_eq!(first.len(), 10);
    assert!(first.chars().all(|c| c == 'a' || c == 'b'), "{first}");
    assert_eq!(first, second);
}

#[test]
fn mutex_and_wait_group_coordinate_workers() {
    // var mu sync.Mutex; var wg sync.WaitGroup; n := 0
    // for i := 0; i < 3; i++ {
    //     wg.Add(1)
    //     go func() { mu.Lock(); n++; mu.Unlock(); wg.Done() }()
    // }
    // wg.Wait(); fmt.Println(n)
    let mut fx = Fixture::new();
    let empty = fx.pool.struct_type(&[]);
    let mutex = fx.pool.named("sync", "Mutex", empty);
    let wait_group = fx.pool.named("sync", "WaitGroup", empty);
    let mutex_ptr = fx.pool.pointer(mutex);
    let wg_ptr = fx.pool.pointer(wait_group);
    let mu = fx.b.local("mu", mutex);
    let wg = fx.b.local("wg", wait_group);
    let n = fx.b.local("n", Idx::INT);
    let def_mu = fx.b.define(vec![Some(mu)], vec![]);
    let def_wg = fx.b.define(vec![Some(wg)], vec![]);
    let zero = fx.b.int(0);
    let def_n = fx.b.define1(n, zero);

    let lock = sync_call(&mut fx, Intrinsic::MutexLock, mu, mutex_ptr, vec![]);
    let nr = fx.b.local_ref(n);
    let inc = fx.b.inc(nr);
    let unlock = sync_call(&mut fx, Intrinsic::MutexUnlock, mu, mutex_ptr, vec![]);
    let done = sync_call(&mut fx, Intrinsic::WaitGroupDone, wg, wg_ptr, vec![]);
    let go = fx.go_lit(vec![lock, inc, unlock, done]);
    let one = fx.b.int(1);
    let add = sync_call(&mut fx, Intrinsic::WaitGroupAdd, wg, wg_ptr, vec![one]);

    let i = fx.b.local("i", Idx::INT);
    let zero = fx.b.int(0);
    let init = fx.b.define1(i, zero);
    let ir = fx.b.local_ref(i);
    let three = fx.b.int(3);
    let cond = fx.b.cmp(BinaryOp::Lt, ir, three);
    let ir = fx.b.local_ref(i);
    let post = fx.b.inc(ir);
    let loop_ = fx.b.for_(Some(init), Some(cond), Some(post), vec![add, go]);
    let wait = sync_call(&mut fx, Intrinsic::WaitGroupWait, wg, wg_ptr, vec![]);
    let nr = fx.b.local_ref(n);
    let p = fx.println(vec![nr]);
    fx.main(vec![def_mu, def_wg, def_n, loop_, wait, p]);
    let out = fx.run();
    assert!(out.success(), "{:?}", out.failure());
    assert_eq!(out.output, "3\n");
}

#[test]
fn unlock_of_unlocked_mutex_is_fatal() {
    let mut fx = Fixture::new();
    let empty = fx.pool.struct_type(&[]);
    let mutex = fx.pool.named("sync", "Mutex", empty);
    let mutex_ptr = fx.pool.pointer(mutex);
    let mu = fx.b.local("mu", mutex);
    let def = fx.b.define(vec![Some(mu)], vec![]);
    let r = fx.b.local_ref(mu);
    let addr = fx.b.addr_of(r, mutex_ptr);
    let call = fx
        .b
        .call_intrinsic(Intrinsic::MutexUnlock, vec![addr], Idx::EMPTY_TUPLE);
    let unlock = fx.b.expr_stmt(call);
    fx.main(vec![def, unlock]);
    let out = fx.run();
    assert_eq!(out.fatal, Some(Fatal::UnlockOfUnlocked));
}
