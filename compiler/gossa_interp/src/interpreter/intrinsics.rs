//! Library functions implemented natively, and the channel instructions.
//!
//! Anything that can block follows one protocol: try to complete now;
//! otherwise register a wait under a fresh ticket and park. The blocked
//! instruction runs again when the goroutine is woken and completes from
//! the [`Wake`] it finds.

use gossa_ast::Intrinsic;
use gossa_ssa::{SelectDir, SelectState, VarId};
use gossa_types::{Idx, Tag};
use rand::Rng;
use smallvec::SmallVec;

use super::call::Native;
use super::exec::top;
use super::{Execution, Flow};
use crate::errors::{internal, ExecResult, RuntimeFault, Trap};
use crate::reflect::Reflector;
use crate::sched::{Goroutine, Wake};
use crate::value::{zero, ChanId, Pointer, Value};

fn arg(args: &[Value], i: usize) -> ExecResult<&Value> {
    args.get(i)
        .ok_or_else(|| internal(format!("intrinsic call without argument {i}")))
}

fn pointer_arg(args: &[Value], i: usize) -> ExecResult<Pointer> {
    match arg(args, i)? {
        Value::Pointer(p) => Ok(p.clone()),
        _ => Err(RuntimeFault::NilDeref.into()),
    }
}

fn bytes_arg(args: &[Value], i: usize) -> ExecResult<&[u8]> {
    arg(args, i)?
        .as_bytes()
        .ok_or_else(|| internal(format!("intrinsic argument {i} is not a string")))
}

/// A `select` case that can proceed now.
enum Ready {
    Send(usize, ChanId, Value),
    Recv(usize, ChanId),
}

impl<'p> Execution<'p> {
    pub(super) fn intrinsic(
        &mut self,
        g: &mut Goroutine,
        i: Intrinsic,
        args: &[Value],
        ty: Idx,
    ) -> ExecResult<Native> {
        let ready = |v: Value| Ok(Native::Ready(v));
        match i {
            Intrinsic::FmtPrint | Intrinsic::FmtPrintln => {
                let operands = self.heap.elems_of(arg(args, 0)?)?;
                let text = self.sprint(&operands, i == Intrinsic::FmtPrintln)?;
                self.print.write(&text);
                ready(self.print_result(ty, text.len()))
            }
            Intrinsic::FmtPrintf => {
                let operands = self.heap.elems_of(arg(args, 1)?)?;
                let text = self.sprintf(bytes_arg(args, 0)?, &operands, false)?;
                self.print.write(&text);
                ready(self.print_result(ty, text.len()))
            }
            Intrinsic::FmtSprint | Intrinsic::FmtSprintln => {
                let operands = self.heap.elems_of(arg(args, 0)?)?;
                let text = self.sprint(&operands, i == Intrinsic::FmtSprintln)?;
                ready(Value::str(&text))
            }
            Intrinsic::FmtSprintf | Intrinsic::FmtErrorf => {
                let operands = self.heap.elems_of(arg(args, 1)?)?;
                let wrap = i == Intrinsic::FmtErrorf;
                let text = self.sprintf(bytes_arg(args, 0)?, &operands, wrap)?;
                if wrap {
                    ready(self.new_error(text.as_bytes()))
                } else {
                    ready(Value::str(&text))
                }
            }
            Intrinsic::ErrorsNew => {
                let text = bytes_arg(args, 0)?.to_vec();
                ready(self.new_error(&text))
            }
            Intrinsic::OsExit => {
                let code = arg(args, 0)?
                    .as_i64()
                    .ok_or_else(|| internal("os.Exit without an integer code"))?;
                Err(Trap::Exit(code as i32))
            }
            Intrinsic::RuntimeGosched => Ok(Native::Yield(Value::Void)),
            Intrinsic::MutexLock => {
                let m = pointer_arg(args, 0)?;
                if matches!(g.wake.take(), Some(Wake::Released)) || self.sched.try_lock(&m) {
                    return ready(Value::Void);
                }
                let (gid, ticket) = self.begin_wait(g);
                self.sched.wait_lock(&m, gid, ticket);
                Ok(Native::Park)
            }
            Intrinsic::MutexUnlock => {
                self.sched.unlock(&pointer_arg(args, 0)?)?;
                ready(Value::Void)
            }
            Intrinsic::WaitGroupAdd | Intrinsic::WaitGroupDone => {
                let delta = match i {
                    Intrinsic::WaitGroupAdd => arg(args, 1)?
                        .as_i64()
                        .ok_or_else(|| internal("WaitGroup.Add without an integer delta"))?,
                    _ => -1,
                };
                self.sched.wait_group_add(&pointer_arg(args, 0)?, delta)?;
                ready(Value::Void)
            }
            Intrinsic::WaitGroupWait => {
                let wg = pointer_arg(args, 0)?;
                if matches!(g.wake.take(), Some(Wake::Released)) || self.sched.wait_group_done(&wg) {
                    return ready(Value::Void);
                }
                let (gid, ticket) = self.begin_wait(g);
                self.sched.wait_group_wait(&wg, gid, ticket);
                Ok(Native::Park)
            }
            _ => {
                let reflector = Reflector {
                    pool: self.pool,
                    heap: &self.heap,
                    sched: &self.sched,
                };
                reflector.call(i, args).map(Native::Ready)
            }
        }
    }

    /// `(n int, err error)` when the call's results are used.
    fn print_result(&self, ty: Idx, n: usize) -> Value {
        let pool = self.pool;
        if pool.tag(ty) == Tag::Tuple && pool.tuple_elems(ty).len() == 2 {
            Value::Tuple(vec![Value::Int(n as i64), Value::Interface(None)])
        } else {
            Value::Void
        }
    }

    /// An `error` whose dynamic type is `*errors.errorString`.
    fn new_error(&mut self, text: &[u8]) -> Value {
        let cell = self.heap.alloc(Value::Struct(vec![Value::bytes(text)]));
        Value::boxed(self.program.error_string, Value::Pointer(cell))
    }

    pub(super) fn exec_send(&mut self, g: &mut Goroutine, ch: VarId, value: VarId) -> ExecResult<Flow> {
        match g.wake.take() {
            Some(Wake::Sent) => return self.advance(g, None),
            Some(Wake::SendClosed) => return Err(RuntimeFault::SendOnClosed.into()),
            _ => {}
        }
        let fr = top(g)?;
        let (c, v) = (fr.get(ch), fr.get(value));
        let Value::Chan(id) = c else {
            // A nil channel blocks forever.
            self.begin_wait(g);
            return Ok(Flow::Park);
        };
        match self.sched.try_send(id, v)? {
            None => self.advance(g, None),
            Some(v) => {
                let (gid, ticket) = self.begin_wait(g);
                self.sched.wait_send(id, gid, ticket, None, v);
                Ok(Flow::Park)
            }
        }
    }

    pub(super) fn exec_recv(
        &mut self,
        g: &mut Goroutine,
        dst: VarId,
        ch: VarId,
        comma_ok: bool,
    ) -> ExecResult<Flow> {
        let result = |v: Value, ok: bool| {
            if comma_ok {
                Value::Tuple(vec![v, Value::Bool(ok)])
            } else {
                v
            }
        };
        if let Some(Wake::Received { value, ok }) = g.wake.take() {
            return self.advance(g, Some((dst, result(value, ok))));
        }
        let Value::Chan(id) = top(g)?.get(ch) else {
            self.begin_wait(g);
            return Ok(Flow::Park);
        };
        if let Some((v, ok)) = self.sched.try_recv(id) {
            return self.advance(g, Some((dst, result(v, ok))));
        }
        let (gid, ticket) = self.begin_wait(g);
        self.sched.wait_recv(id, gid, ticket, None);
        Ok(Flow::Park)
    }

    /// `select`: one ready case chosen uniformly at random; otherwise the
    /// default case, or a wait on every case at once.
    pub(super) fn exec_select(
        &mut self,
        g: &mut Goroutine,
        dst: VarId,
        ty: Idx,
        states: &[SelectState],
        blocking: bool,
    ) -> ExecResult<Flow> {
        let pool = self.pool;
        // (index, recvOk, one slot per receive case)
        let recv_types: Vec<Idx> = pool.tuple_elems(ty).into_iter().skip(2).collect();
        let recv_slot = |case: usize| {
            states[..case]
                .iter()
                .filter(|s| s.dir == SelectDir::Recv)
                .count()
        };
        let finish = |index: i64, ok: bool, received: Option<(usize, Value)>| {
            let mut elems = vec![Value::Int(index), Value::Bool(ok)];
            elems.extend(recv_types.iter().map(|&t| zero(pool, t)));
            if let Some((slot, v)) = received {
                if let Some(e) = elems.get_mut(2 + slot) {
                    *e = v;
                }
            }
            Value::Tuple(elems)
        };

        if let Some(Wake::Selected { index, value, ok }) = g.wake.take() {
            let received = value.map(|v| (recv_slot(index), v));
            let tuple = finish(index as i64, ok, received);
            return self.advance(g, Some((dst, tuple)));
        }

        let fr = top(g)?;
        let cases: Vec<(Option<ChanId>, Option<Value>)> = states
            .iter()
            .map(|s| {
                let ch = match fr.get(s.ch) {
                    Value::Chan(id) => Some(id),
                    _ => None,
                };
                (ch, s.value.map(|v| fr.get(v)))
            })
            .collect();

        let mut ready: SmallVec<[Ready; 4]> = SmallVec::new();
        for (i, (s, (ch, v))) in states.iter().zip(&cases).enumerate() {
            let Some(ch) = *ch else { continue };
            match s.dir {
                SelectDir::Send if self.sched.send_ready(ch) => {
                    ready.push(Ready::Send(i, ch, v.clone().unwrap_or(Value::Void)));
                }
                SelectDir::Recv if self.sched.recv_ready(ch) => ready.push(Ready::Recv(i, ch)),
                _ => {}
            }
        }

        if !ready.is_empty() {
            let pick = self.rng.gen_range(0..ready.len());
            let tuple = match ready.swap_remove(pick) {
                Ready::Send(i, ch, v) => {
                    if self.sched.try_send(ch, v)?.is_some() {
                        return Err(internal("select send case was ready but blocked"));
                    }
                    finish(i as i64, false, None)
                }
                Ready::Recv(i, ch) => {
                    let (v, ok) = self
                        .sched
                        .try_recv(ch)
                        .ok_or_else(|| internal("select receive case was ready but blocked"))?;
                    finish(i as i64, ok, Some((recv_slot(i), v)))
                }
            };
            return self.advance(g, Some((dst, tuple)));
        }

        if !blocking {
            return self.advance(g, Some((dst, finish(-1, false, None))));
        }

        let (gid, ticket) = self.begin_wait(g);
        for (i, (s, (ch, v))) in states.iter().zip(cases).enumerate() {
            let Some(ch) = ch else { continue };
            match s.dir {
                SelectDir::Send => {
                    self.sched
                        .wait_send(ch, gid, ticket, Some(i), v.unwrap_or(Value::Void));
                }
                SelectDir::Recv => self.sched.wait_recv(ch, gid, ticket, Some(i)),
            }
        }
        Ok(Flow::Park)
    }

    /// Complete the current instruction, storing its result if any.
    fn advance(&self, g: &mut Goroutine, result: Option<(VarId, Value)>) -> ExecResult<Flow> {
        let fr = top(g)?;
        if let Some((dst, v)) = result {
            fr.set(dst, v);
        }
        fr.pc += 1;
        Ok(Flow::Continue)
    }
}
