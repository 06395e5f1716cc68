//! Panics, deferred calls and `recover`.
//!
//! A panic marks the top frame `Unwinding`. Each step of an unwinding frame
//! runs one deferred call (with `recover` enabled) or, once none are left,
//! pops the frame and marks its caller. When a deferred call returns after
//! recovering, its frame turns `Recovered`: the remaining deferred calls run
//! and the function returns through its recover block.

use gossa_ast::Builtin;
use gossa_types::{Idx, Tag};
use tracing::debug;

use super::call::Native;
use super::exec::{pack, top};
use super::frame::{Deferred, FrameMode, ReturnTo};
use super::{Execution, Flow, PanicRecord};
use crate::errors::{ExecResult, RuntimeFault};
use crate::format::runtime_float;
use crate::ops::value_kind;
use crate::sched::{Goroutine, PanicState};
use crate::value::{zero, Callable, Value};

/// Address printed for panic values that are not pointers.
const OPAQUE_ADDRESS: u64 = 0x00c0_0001_2000;

impl<'p> Execution<'p> {
    /// The value a fault panics with.
    pub(super) fn fault_value(&self, fault: RuntimeFault) -> Value {
        match fault {
            RuntimeFault::Panic(Value::Interface(None)) => Value::boxed(
                Idx::RUNTIME_ERROR,
                Value::str("panic called with nil argument"),
            ),
            RuntimeFault::Panic(v) => v,
            f => Value::boxed(Idx::RUNTIME_ERROR, Value::str(&f.to_string())),
        }
    }

    pub(super) fn start_panic(&mut self, g: &mut Goroutine, value: Value) {
        if let Some(old) = g.panic.take() {
            let message = self.panic_message(&old.value);
            g.aborted.push(PanicRecord {
                message,
                recovered: old.recovered,
            });
        }
        debug!(goroutine = %g.id, depth = g.frames.len(), "panic");
        g.panic = Some(PanicState {
            value,
            recovered: false,
        });
        if let Some(fr) = g.frames.last_mut() {
            fr.mode = FrameMode::Unwinding;
        }
    }

    pub(super) fn unwind_step(&mut self, g: &mut Goroutine) -> ExecResult<Flow> {
        if let Some(d) = top(g)?.defers.pop() {
            return self.invoke_deferred(g, d, true);
        }
        let Some(frame) = g.frames.pop() else {
            return Ok(Flow::Uncaught);
        };
        if frame.ret == ReturnTo::Sync || g.frames.is_empty() {
            return Ok(Flow::Uncaught);
        }
        top(g)?.mode = FrameMode::Unwinding;
        Ok(Flow::Continue)
    }

    /// Run deferred call `d` of the top frame.
    fn invoke_deferred(&mut self, g: &mut Goroutine, d: Deferred, can_recover: bool) -> ExecResult<Flow> {
        match &d.callee {
            Callable::Code { .. } => {
                self.push_call(g, d.callee, d.args, ReturnTo::Deferred, can_recover)?;
                Ok(Flow::Continue)
            }
            // `defer recover()` is not called by a deferred function.
            Callable::Builtin(Builtin::Recover) => self.deferred_returned(g),
            native => match self.call_native(g, native, &d.args, &d.types, Idx::EMPTY_TUPLE)? {
                Native::Ready(_) | Native::Yield(_) => self.deferred_returned(g),
                Native::Park => {
                    top(g)?.defers.push(d);
                    Ok(Flow::Park)
                }
            },
        }
    }

    /// `RunDefers` in a normally returning frame: one deferred call per step.
    pub(super) fn run_defers(&mut self, g: &mut Goroutine) -> ExecResult<Flow> {
        let fr = top(g)?;
        match fr.defers.pop() {
            Some(d) => self.invoke_deferred(g, d, false),
            None => {
                fr.pc += 1;
                Ok(Flow::Continue)
            }
        }
    }

    /// A deferred call of the top frame finished.
    pub(super) fn deferred_returned(&mut self, g: &mut Goroutine) -> ExecResult<Flow> {
        let recovered = g.panic.as_ref().is_some_and(|p| p.recovered);
        let unwinding = top(g)?.mode == FrameMode::Unwinding;
        if recovered && unwinding {
            top(g)?.mode = FrameMode::Recovered;
            g.panic = None;
            g.aborted.clear();
            debug!(goroutine = %g.id, "recovered");
        }
        Ok(Flow::Continue)
    }

    pub(super) fn recovered_step(&mut self, g: &mut Goroutine) -> ExecResult<Flow> {
        if let Some(d) = top(g)?.defers.pop() {
            return self.invoke_deferred(g, d, false);
        }
        let fr = top(g)?;
        fr.mode = FrameMode::Normal;
        let f = self.program.func(fr.func);
        if let Some(block) = f.recover {
            fr.block = block;
            fr.pc = 0;
            return Ok(Flow::Continue);
        }
        let pool = self.pool;
        let results = pool.results(f.sig).into_iter().map(|t| zero(pool, t)).collect();
        self.return_from(g, pack(results))
    }

    /// The panics that ended `g`, oldest first.
    pub(super) fn panic_chain(&mut self, g: &mut Goroutine) -> Vec<PanicRecord> {
        let mut chain = std::mem::take(&mut g.aborted);
        if let Some(p) = g.panic.take() {
            chain.push(PanicRecord {
                message: self.panic_message(&p.value),
                recovered: p.recovered,
            });
        }
        chain
    }

    /// How the runtime prints a panic value.
    pub(super) fn panic_message(&mut self, v: &Value) -> String {
        let Value::Interface(Some(b)) = v else {
            return "nil".to_owned();
        };
        let pool = self.pool;
        for name in [self.names.error, self.names.string] {
            let is_method = self
                .msets
                .lookup(pool, b.ty, name)
                .is_some_and(|m| m.sig == Idx::ERROR_SIG);
            if !is_method {
                continue;
            }
            let text = self
                .resolve_invoke(v, name)
                .and_then(|c| self.call_sync(c, Vec::new()));
            if let Ok(Ok(Value::Str(s))) = text {
                return String::from_utf8_lossy(&s).into_owned();
            }
        }
        let plain = match &b.value {
            Value::Bool(x) => Some(x.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Uint(u) => Some(u.to_string()),
            Value::Float(f) => Some(runtime_float(*f)),
            Value::Complex(re, im) => Some(format!("({}{}i)", runtime_float(*re), runtime_float(*im))),
            Value::Str(s) => Some(String::from_utf8_lossy(s).into_owned()),
            _ => None,
        };
        let tag = value_kind(pool, b.ty);
        match plain {
            Some(text) if !pool.is_named(b.ty) => text,
            Some(text) if tag == Tag::String => format!("{}(\"{text}\")", pool.format_type(b.ty)),
            Some(text) => format!("{}({text})", pool.format_type(b.ty)),
            None => {
                let addr = match &b.value {
                    Value::Pointer(p) => p.address(),
                    _ => OPAQUE_ADDRESS,
                };
                format!("({}) {addr:#x}", pool.format_type(b.ty))
            }
        }
    }
}
