//! Calls, `go`, `defer` and interface method dispatch.

use gossa_ir::Name;
use gossa_ssa::{Callee, Function, MethodImpl, VarId};
use gossa_types::{Idx, Tag};
use tracing::{debug, trace};

use super::exec::top;
use super::frame::{Deferred, Frame, ReturnTo};
use super::{Execution, Flow};
use crate::errors::{internal, ExecResult, Fatal, RuntimeFault, Trap};
use crate::sched::Goroutine;
use crate::value::{Callable, NativeMethod, Pointer, Value};

/// Result of a natively implemented call.
pub(super) enum Native {
    Ready(Value),
    /// Done, but the goroutine should let others run.
    Yield(Value),
    /// Blocked. The call runs again once the goroutine is woken and
    /// consumes the wake.
    Park,
}

/// A receiver on its way to the declared receiver form.
enum Place {
    /// A value of the given type.
    Value(Idx, Value),
    /// A location holding a value of the given type.
    Addr(Idx, Pointer),
}

impl<'p> Execution<'p> {
    /// Push a frame for `callee`, which must be function code.
    pub(super) fn push_call(
        &mut self,
        g: &mut Goroutine,
        callee: Callable,
        args: Vec<Value>,
        ret: ReturnTo,
        can_recover: bool,
    ) -> ExecResult<()> {
        let Callable::Code { func, free, recv } = callee else {
            return Err(internal("native callee pushed as a frame"));
        };
        let f = self.program.func(func);
        if !f.has_body() {
            return Err(RuntimeFault::Unsupported(format!("call of external function {}", f.name)).into());
        }
        if g.frames.len() >= self.config.max_depth {
            return Err(Fatal::StackOverflow {
                limit: self.config.max_depth,
            }
            .into());
        }
        let mut frame = Frame::new(f, ret, can_recover);
        for (&p, v) in f.params.iter().zip(recv.into_iter().chain(args)) {
            frame.set(p, v);
        }
        for (&fv, v) in f.free_vars.iter().zip(free) {
            frame.set(fv, v);
        }
        if self.config.trace {
            trace!(goroutine = %g.id, func = %f.name, depth = g.frames.len() + 1, "call");
        }
        g.frames.push(frame);
        Ok(())
    }

    fn callee(&mut self, fr: &Frame, callee: &Callee) -> ExecResult<Callable> {
        Ok(match callee {
            Callee::Static(func) => Callable::func(*func),
            Callee::Value(v) => match fr.get(*v) {
                Value::Func(c) => (*c).clone(),
                _ => return Err(RuntimeFault::NilDeref.into()),
            },
            Callee::Invoke { recv, method } => return self.resolve_invoke(&fr.get(*recv), *method),
            Callee::Builtin(b) => Callable::Builtin(*b),
            Callee::Intrinsic(i) => Callable::Intrinsic(*i),
        })
    }

    fn operands(fr: &Frame, f: &Function, args: &[VarId]) -> (Vec<Value>, Vec<Idx>) {
        args.iter().map(|&a| (fr.get(a), f.var_type(a))).unzip()
    }

    fn target(&mut self, g: &mut Goroutine, callee: &Callee) -> ExecResult<Callable> {
        let fr = top(g)?;
        self.callee(fr, callee)
    }

    pub(super) fn exec_call(
        &mut self,
        g: &mut Goroutine,
        f: &'p Function,
        dst: VarId,
        ty: Idx,
        callee: &Callee,
        args: &[VarId],
    ) -> ExecResult<Flow> {
        let target = self.target(g, callee)?;
        let (values, types) = Self::operands(top(g)?, f, args);
        if let Callable::Code { .. } = target {
            self.push_call(g, target, values, ReturnTo::Value(dst), false)?;
            return Ok(Flow::Continue);
        }
        let (v, flow) = match self.call_native(g, &target, &values, &types, ty)? {
            Native::Ready(v) => (v, Flow::Continue),
            Native::Yield(v) => (v, Flow::Yield),
            Native::Park => return Ok(Flow::Park),
        };
        let fr = top(g)?;
        fr.set(dst, v);
        fr.pc += 1;
        Ok(flow)
    }

    pub(super) fn exec_go(
        &mut self,
        g: &mut Goroutine,
        f: &'p Function,
        callee: &Callee,
        args: &[VarId],
    ) -> ExecResult<Flow> {
        let target = self.target(g, callee)?;
        let (values, types) = Self::operands(top(g)?, f, args);
        if let Callable::Code { .. } = target {
            let mut child = self.new_goroutine();
            self.push_call(&mut child, target, values, ReturnTo::Discard, false)?;
            debug!(parent = %g.id, goroutine = %child.id, "go");
            self.sched.spawn(child);
        } else if let Native::Park = self.call_native(g, &target, &values, &types, Idx::EMPTY_TUPLE)? {
            // A native started with `go` runs in the spawning goroutine and
            // never waits; its registration goes stale.
            g.ticket = 0;
        }
        top(g)?.pc += 1;
        Ok(Flow::Continue)
    }

    pub(super) fn exec_defer(
        &mut self,
        g: &mut Goroutine,
        f: &'p Function,
        callee: &Callee,
        args: &[VarId],
    ) -> ExecResult<Flow> {
        let target = self.target(g, callee)?;
        let fr = top(g)?;
        let (args, types) = Self::operands(fr, f, args);
        fr.defers.push(Deferred {
            callee: target,
            args,
            types,
        });
        fr.pc += 1;
        Ok(Flow::Continue)
    }

    /// Dispatch a natively implemented callee.
    pub(super) fn call_native(
        &mut self,
        g: &mut Goroutine,
        target: &Callable,
        args: &[Value],
        types: &[Idx],
        ty: Idx,
    ) -> ExecResult<Native> {
        match target {
            Callable::Native { method, recv } => self.native_method(*method, recv).map(Native::Ready),
            Callable::Builtin(b) => self.builtin(g, *b, args, types, ty).map(Native::Ready),
            Callable::Intrinsic(i) => self.intrinsic(g, *i, args, ty),
            Callable::Code { .. } => Err(internal("function code dispatched as native")),
        }
    }

    /// Find the implementation of `method` for the dynamic type of the
    /// interface value `recv`, with the receiver adjusted to its declared
    /// form.
    pub(super) fn resolve_invoke(&mut self, recv: &Value, method: Name) -> ExecResult<Callable> {
        let Value::Interface(Some(b)) = recv else {
            return Err(RuntimeFault::NilDeref.into());
        };
        let program = self.program;
        let imp = program.method(b.ty, method).ok_or_else(|| {
            internal(format!(
                "no method {} registered for {}",
                self.pool.name_str(method),
                self.pool.format_type(b.ty)
            ))
        })?;
        match imp {
            MethodImpl::Func {
                func,
                path,
                ptr_recv,
            } => {
                let place = self.walk(b.ty, b.value.clone(), path)?;
                let r = self.receiver(place, *ptr_recv)?;
                Ok(Callable::Code {
                    func: *func,
                    free: Vec::new(),
                    recv: Some(r),
                })
            }
            MethodImpl::Embedded { path } => {
                let place = self.walk(b.ty, b.value.clone(), path)?;
                let inner = self.receiver(place, false)?;
                self.resolve_invoke(&inner, method)
            }
            MethodImpl::Native {
                path,
                recv,
                ptr_recv,
            } => {
                let place = self.walk(b.ty, b.value.clone(), path)?;
                let r = self.receiver(place, *ptr_recv)?;
                let method = if *recv == Idx::RUNTIME_ERROR {
                    NativeMethod::RuntimeErrorError
                } else {
                    NativeMethod::ErrorStringError
                };
                Ok(Callable::Native { method, recv: r })
            }
        }
    }

    /// Follow an embedding path of field indices from a value of type `ty`.
    fn walk(&self, ty: Idx, value: Value, path: &[u32]) -> ExecResult<Place> {
        let pool = self.pool;
        let is_ptr = |t: Idx| pool.under_tag(t) == Tag::Pointer;
        let mut place = Place::Value(ty, value);
        for &i in path {
            place = match place {
                Place::Value(t, Value::Pointer(p)) if is_ptr(t) => {
                    let base = pool.deref(t);
                    Place::Addr(pool.field(base, i as usize).ty, p.project(i))
                }
                Place::Value(t, Value::Struct(mut fields)) if (i as usize) < fields.len() => {
                    Place::Value(pool.field(t, i as usize).ty, fields.swap_remove(i as usize))
                }
                Place::Value(_, Value::Nil) => return Err(RuntimeFault::NilDeref.into()),
                Place::Value(t, v) => {
                    return Err(internal(format!(
                        "embedding step {i} through {v:?} of type {}",
                        pool.format_type(t)
                    )))
                }
                Place::Addr(t, p) if is_ptr(t) => match self.heap.load(&p)? {
                    Value::Pointer(q) => {
                        let base = pool.deref(t);
                        Place::Addr(pool.field(base, i as usize).ty, q.project(i))
                    }
                    _ => return Err(RuntimeFault::NilDeref.into()),
                },
                Place::Addr(t, p) => Place::Addr(pool.field(t, i as usize).ty, p.project(i)),
            };
        }
        Ok(place)
    }

    /// The receiver for a method declared on `T` (`ptr_recv` false) or
    /// `*T`.
    fn receiver(&mut self, place: Place, ptr_recv: bool) -> ExecResult<Value> {
        let pool = self.pool;
        let is_ptr = |t: Idx| pool.under_tag(t) == Tag::Pointer;
        let (t, v) = match place {
            Place::Addr(t, p) if !is_ptr(t) => {
                return Ok(if ptr_recv {
                    Value::Pointer(p)
                } else {
                    self.heap.load(&p)?
                });
            }
            Place::Addr(t, p) => (t, self.heap.load(&p)?),
            Place::Value(t, v) => (t, v),
        };
        match (is_ptr(t), ptr_recv) {
            (true, true) | (false, false) => Ok(v),
            (true, false) => match v {
                Value::Pointer(p) => Ok(self.heap.load(&p)?),
                _ => Err(RuntimeFault::NilDeref.into()),
            },
            (false, true) => Ok(Value::Pointer(self.heap.alloc(v))),
        }
    }

    pub(super) fn native_method(&self, method: NativeMethod, recv: &Value) -> ExecResult<Value> {
        match method {
            NativeMethod::RuntimeErrorError => Ok(recv.clone()),
            NativeMethod::ErrorStringError => match recv {
                Value::Pointer(p) => match self.heap.load(p)? {
                    Value::Struct(mut fields) if !fields.is_empty() => Ok(fields.swap_remove(0)),
                    other => Err(internal(format!("errorString holds {other:?}"))),
                },
                _ => Err(RuntimeFault::NilDeref.into()),
            },
        }
    }

    /// Run `callee` to completion on a goroutine of its own, outside the
    /// scheduler. `Err` carries the value of a panic that escaped it.
    pub(super) fn call_sync(&mut self, callee: Callable, args: Vec<Value>) -> ExecResult<Result<Value, Value>> {
        match callee {
            Callable::Native { method, recv } => match self.native_method(method, &recv) {
                Ok(v) => Ok(Ok(v)),
                Err(Trap::Fault(f)) => Ok(Err(self.fault_value(f))),
                Err(trap) => Err(trap),
            },
            Callable::Code { .. } => {
                let mut g = self.new_goroutine();
                self.push_call(&mut g, callee, args, ReturnTo::Sync, false)?;
                loop {
                    match self.run_goroutine(&mut g)? {
                        Flow::Returned(v) => return Ok(Ok(v)),
                        Flow::Uncaught => {
                            let value = g
                                .panic
                                .take()
                                .map_or(Value::Interface(None), |p| p.value);
                            return Ok(Err(value));
                        }
                        Flow::Yield | Flow::Continue => {}
                        Flow::Park | Flow::Done => {
                            return Err(internal("goroutine blocked inside a method called by fmt"))
                        }
                    }
                }
            }
            Callable::Builtin(_) | Callable::Intrinsic(_) => {
                Err(internal("builtin called as a method"))
            }
        }
    }
}
