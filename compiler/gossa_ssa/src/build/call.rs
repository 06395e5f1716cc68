//! Calls, method resolution, builtins and intrinsics.

use gossa_ast::{Builtin, ExprId, ExprKind, Intrinsic};
use gossa_ir::{ConstValue, Name, Span};
use gossa_types::{Idx, MethodTarget, Tag};

use super::lower::FnLowerer;
use crate::ir::{Callee, FnId, Instr, VarId};

/// How a call expression is evaluated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum CallMode {
    Call,
    Go,
    Defer,
}

/// A lowered call: either already complete (builtins lowered to
/// instructions) or a callee with evaluated arguments.
pub(super) enum CallParts {
    Done(VarId),
    Call {
        callee: Callee,
        args: Vec<VarId>,
        ty: Idx,
    },
}

/// Resolved target of `x.m(...)`.
pub(super) enum MethodCallee {
    /// Statically bound; `recv` is adjusted to the declared receiver form.
    Static { func: FnId, recv: VarId },
    /// Dynamic dispatch on interface value `recv`.
    Invoke { recv: VarId, method: Name },
}

impl<'p> FnLowerer<'_, 'p> {
    /// Lower the call expression `e` in value context.
    pub(super) fn call(&mut self, e: ExprId) -> VarId {
        match self.call_parts(e, CallMode::Call) {
            CallParts::Done(v) => v,
            CallParts::Call { callee, args, ty } => {
                let v = self
                    .b
                    .emit(ty, |dst| Instr::Call { dst, ty, callee, args });
                let pkg = self.pkg();
                if !self.pb.oracle().may_return(pkg, e) {
                    self.b.unreachable();
                    self.b.start_dead_block();
                }
                v
            }
        }
    }

    /// Evaluate the callee and arguments of call expression `e`.
    pub(super) fn call_parts(&mut self, e: ExprId, mode: CallMode) -> CallParts {
        let pkg = self.pkg();
        let node = pkg.expr(e);
        let ExprKind::Call {
            func,
            args,
            ellipsis,
        } = &node.kind
        else {
            let ty = self.value_ty(e);
            let v = self.unsupported(node.span, "go/defer of a non-call", ty);
            return CallParts::Done(v);
        };
        let ty = self.value_ty(e);
        match &pkg.expr(*func).kind {
            ExprKind::Builtin(b) => self.builtin(*b, args, *ellipsis, ty, mode, node.span),
            ExprKind::Intrinsic(i) => self.intrinsic(*i, args, *ellipsis, ty),
            ExprKind::Func(f) => {
                let sig = self.expr_ty(*func);
                let callee = self.pb.fn_for(*f, Vec::new());
                let args = self.call_args(sig, args, *ellipsis);
                CallParts::Call {
                    callee: Callee::Static(callee),
                    args,
                    ty,
                }
            }
            ExprKind::Instance { func: f, targs } => {
                let sig = self.expr_ty(*func);
                let targs = targs.iter().map(|&t| self.pb.ty(t)).collect();
                let callee = self.pb.fn_for(*f, targs);
                let args = self.call_args(sig, args, *ellipsis);
                CallParts::Call {
                    callee: Callee::Static(callee),
                    args,
                    ty,
                }
            }
            ExprKind::Method { recv, method } => {
                let sig = self.expr_ty(*func);
                match self.method_callee(*recv, *method) {
                    Some(MethodCallee::Static { func, recv }) => {
                        let mut all = vec![recv];
                        all.extend(self.call_args(sig, args, *ellipsis));
                        CallParts::Call {
                            callee: Callee::Static(func),
                            args: all,
                            ty,
                        }
                    }
                    Some(MethodCallee::Invoke { recv, method }) => {
                        let args = self.call_args(sig, args, *ellipsis);
                        CallParts::Call {
                            callee: Callee::Invoke { recv, method },
                            args,
                            ty,
                        }
                    }
                    None => {
                        let v = self.unsupported(node.span, "call of an unknown method", ty);
                        CallParts::Done(v)
                    }
                }
            }
            _ => {
                let sig = self.expr_ty(*func);
                let f = self.expr(*func);
                let args = self.call_args(sig, args, *ellipsis);
                CallParts::Call {
                    callee: Callee::Value(f),
                    args,
                    ty,
                }
            }
        }
    }

    /// Arguments converted to the parameter types of `sig`, with variadic
    /// extras packed into a slice.
    fn call_args(&mut self, sig: Idx, args: &[ExprId], ellipsis: bool) -> Vec<VarId> {
        let params = self.pb.pool.params(sig);
        let variadic = self.pb.pool.is_variadic(sig);

        // f(g()) where g returns several values.
        if args.len() == 1 && params.len() != 1 {
            let at = self.expr_ty(args[0]);
            if self.pb.pool.tag(at) == Tag::Tuple {
                let tuple = self.expr(args[0]);
                let elems = self.pb.pool.tuple_elems(at);
                let values: Vec<VarId> = elems
                    .into_iter()
                    .enumerate()
                    .map(|(i, ety)| {
                        self.b.emit(ety, |dst| Instr::Extract {
                            dst,
                            ty: ety,
                            tuple,
                            index: i as u32,
                        })
                    })
                    .collect();
                return self.convert_values(&params, variadic, values);
            }
        }

        let fixed = if variadic && !ellipsis {
            params.len() - 1
        } else {
            params.len()
        };
        let mut out = Vec::with_capacity(params.len());
        for (i, &a) in args.iter().enumerate().take(fixed) {
            out.push(self.expr_as(a, params[i]));
        }
        if variadic && !ellipsis {
            let slice_ty = params[fixed];
            let elem = self.pb.pool.elem(slice_ty);
            let extras: Vec<VarId> = args
                .iter()
                .skip(fixed)
                .map(|&a| self.expr_as(a, elem))
                .collect();
            out.push(self.pack(slice_ty, extras));
        }
        out
    }

    /// Convert already evaluated values to `params`, packing extras.
    fn convert_values(&mut self, params: &[Idx], variadic: bool, values: Vec<VarId>) -> Vec<VarId> {
        let fixed = if variadic {
            params.len() - 1
        } else {
            params.len()
        };
        let mut out = Vec::with_capacity(params.len());
        let mut rest = Vec::new();
        for (i, v) in values.into_iter().enumerate() {
            if i < fixed {
                out.push(self.conv(v, params[i]));
            } else {
                rest.push(v);
            }
        }
        if variadic {
            let slice_ty = params[fixed];
            let elem = self.pb.pool.elem(slice_ty);
            let rest = rest.into_iter().map(|v| self.conv(v, elem)).collect();
            out.push(self.pack(slice_ty, rest));
        }
        out
    }

    /// A slice of type `slice_ty` holding `values`; nil when empty.
    pub(super) fn pack(&mut self, slice_ty: Idx, values: Vec<VarId>) -> VarId {
        if values.is_empty() {
            return self.zero(slice_ty);
        }
        let elem = self.pb.pool.elem(slice_ty);
        let arr = self.pb.pool.array(elem, values.len() as u64);
        let cell = self.alloc(arr);
        let ptr = self.pointer_to(elem);
        for (i, value) in values.into_iter().enumerate() {
            let index = self.b.emit_const(Idx::INT, ConstValue::Int(i as i128));
            let addr = self.b.emit(ptr, |dst| Instr::IndexAddr {
                dst,
                ty: ptr,
                x: cell,
                index,
            });
            self.store(addr, value);
        }
        self.b.emit(slice_ty, |dst| Instr::Slice {
            dst,
            ty: slice_ty,
            x: cell,
            low: None,
            high: None,
            max: None,
        })
    }

    /// Resolve `recv.method`: walk the embedding path, adjust the receiver
    /// to the declared form, or dispatch through an interface.
    pub(super) fn method_callee(&mut self, recv: ExprId, method: Name) -> Option<MethodCallee> {
        let rt = self.expr_ty(recv);
        if self.pb.pool.is_interface(rt) {
            let recv = self.expr(recv);
            return Some(MethodCallee::Invoke { recv, method });
        }

        let mut entry = self.pb.msets.lookup(self.pb.pool, rt, method);
        let mut by_addr = false;
        if entry.is_none() && self.pb.pool.tag(rt) != Tag::Pointer {
            let ptr = self.pointer_to(rt);
            entry = self.pb.msets.lookup(self.pb.pool, ptr, method);
            by_addr = true;
        }
        let entry = entry?;

        let (mut v, mut vt) = if by_addr {
            let p = self.addr(recv);
            (p, self.b.var_type(p))
        } else {
            (self.expr(recv), rt)
        };
        for &f in &entry.path {
            if self.pb.pool.under_tag(vt) == Tag::Pointer {
                let st = self.pb.pool.deref(vt);
                let fty = self.pb.pool.field(st, f as usize).ty;
                let ptr = self.pointer_to(fty);
                let addr = self.b.emit(ptr, |dst| Instr::FieldAddr {
                    dst,
                    ty: ptr,
                    x: v,
                    field: f,
                });
                if self.pb.pool.under_tag(fty) == Tag::Pointer {
                    v = self.load(addr, fty);
                    vt = fty;
                } else {
                    v = addr;
                    vt = ptr;
                }
            } else {
                let fty = self.pb.pool.field(vt, f as usize).ty;
                v = self.b.emit(fty, |dst| Instr::Field {
                    dst,
                    ty: fty,
                    x: v,
                    field: f,
                });
                vt = fty;
            }
        }

        match entry.target {
            MethodTarget::Concrete {
                func: Some(decl),
                recv: base,
                ptr_recv,
            } => {
                let recv = self.adjust_receiver(v, vt, ptr_recv);
                let func = self.pb.method_fn(decl, base);
                Some(MethodCallee::Static { func, recv })
            }
            MethodTarget::Concrete { func: None, .. } => {
                // Runtime-provided `Error` methods dispatch through the
                // method registry.
                let boxed = self.conv(v, Idx::ERROR);
                Some(MethodCallee::Invoke {
                    recv: boxed,
                    method,
                })
            }
            MethodTarget::Interface { .. } => {
                let iface = if self.pb.pool.under_tag(vt) == Tag::Pointer
                    && self.pb.pool.is_interface(self.pb.pool.deref(vt))
                {
                    let t = self.pb.pool.deref(vt);
                    self.load(v, t)
                } else {
                    v
                };
                Some(MethodCallee::Invoke {
                    recv: iface,
                    method,
                })
            }
        }
    }

    fn adjust_receiver(&mut self, v: VarId, vt: Idx, ptr_recv: bool) -> VarId {
        let is_ptr = self.pb.pool.under_tag(vt) == Tag::Pointer;
        match (ptr_recv, is_ptr) {
            (true, true) | (false, false) => v,
            (false, true) => {
                let t = self.pb.pool.deref(vt);
                self.load(v, t)
            }
            (true, false) => {
                let cell = self.alloc(vt);
                self.store(cell, v);
                cell
            }
        }
    }

    // Builtins

    fn builtin(
        &mut self,
        b: Builtin,
        args: &[ExprId],
        ellipsis: bool,
        ty: Idx,
        mode: CallMode,
        span: Span,
    ) -> CallParts {
        let call = |args: Vec<VarId>, ty: Idx| CallParts::Call {
            callee: Callee::Builtin(b),
            args,
            ty,
        };
        match b {
            Builtin::Make => {
                let v = self.make(args, ty, span);
                CallParts::Done(v)
            }
            Builtin::New => {
                let elem = self.pb.pool.deref(ty);
                CallParts::Done(self.alloc(elem))
            }
            Builtin::Panic => {
                let v = match args.first() {
                    Some(&a) => self.expr_as(a, Idx::ANY),
                    None => self.zero(Idx::ANY),
                };
                if mode != CallMode::Call {
                    return call(vec![v], Idx::EMPTY_TUPLE);
                }
                self.b.panic(v);
                self.b.start_dead_block();
                CallParts::Done(self.zero(Idx::EMPTY_TUPLE))
            }
            Builtin::Append => {
                let s = match args.first() {
                    Some(&a) => self.expr_as(a, ty),
                    None => self.zero(ty),
                };
                let extra = if ellipsis {
                    match args.get(1) {
                        Some(&a) => self.expr(a),
                        None => self.zero(ty),
                    }
                } else {
                    let elem = self.pb.pool.elem(ty);
                    let values = args.get(1..).unwrap_or_default().iter().map(|&a| self.expr_as(a, elem)).collect();
                    self.pack(ty, values)
                };
                call(vec![s, extra], ty)
            }
            Builtin::Delete => {
                let (Some(&m), Some(&k)) = (args.first(), args.get(1)) else {
                    let v = self.unsupported(span, "delete with missing arguments", ty);
                    return CallParts::Done(v);
                };
                let mt = self.expr_ty(m);
                let key_ty = self.pb.pool.key(mt);
                let map = self.expr(m);
                let key = self.expr_as(k, key_ty);
                call(vec![map, key], ty)
            }
            Builtin::Min | Builtin::Max => {
                let values = args.iter().map(|&a| self.expr_as(a, ty)).collect();
                call(values, ty)
            }
            Builtin::Complex => {
                let part = if ty == Idx::COMPLEX64 {
                    Idx::FLOAT32
                } else {
                    Idx::FLOAT64
                };
                let values = args.iter().map(|&a| self.expr_as(a, part)).collect();
                call(values, ty)
            }
            Builtin::Len
            | Builtin::Cap
            | Builtin::Copy
            | Builtin::Close
            | Builtin::Recover
            | Builtin::Print
            | Builtin::Println
            | Builtin::Clear
            | Builtin::Real
            | Builtin::Imag => {
                let values = args.iter().map(|&a| self.expr(a)).collect();
                call(values, ty)
            }
        }
    }

    /// `make(T, args...)`.
    fn make(&mut self, args: &[ExprId], ty: Idx, span: Span) -> VarId {
        let sizes: Vec<VarId> = args.iter().map(|&a| self.expr_as(a, Idx::INT)).collect();
        match self.pb.pool.under_tag(ty) {
            Tag::Slice => {
                let len = match sizes.first() {
                    Some(&l) => l,
                    None => self.zero(Idx::INT),
                };
                let cap = sizes.get(1).copied().unwrap_or(len);
                self.b.emit(ty, |dst| Instr::MakeSlice { dst, ty, len, cap })
            }
            Tag::Map => self.b.emit(ty, |dst| Instr::MakeMap { dst, ty }),
            Tag::Chan => {
                let size = match sizes.first() {
                    Some(&s) => s,
                    None => self.zero(Idx::INT),
                };
                self.b.emit(ty, |dst| Instr::MakeChan { dst, ty, size })
            }
            _ => self.unsupported(span, "make of this type", ty),
        }
    }

    // Intrinsics

    fn intrinsic(&mut self, i: Intrinsic, args: &[ExprId], ellipsis: bool, ty: Idx) -> CallParts {
        let values = match i {
            Intrinsic::FmtPrint
            | Intrinsic::FmtPrintln
            | Intrinsic::FmtSprint
            | Intrinsic::FmtSprintln => vec![self.format_operands(args, ellipsis)],
            Intrinsic::FmtPrintf | Intrinsic::FmtSprintf | Intrinsic::FmtErrorf => {
                let format = match args.first() {
                    Some(&f) => self.expr_as(f, Idx::STRING),
                    None => self.zero(Idx::STRING),
                };
                let rest = args.get(1..).unwrap_or_default();
                vec![format, self.format_operands(rest, ellipsis)]
            }
            Intrinsic::ErrorsNew => args.iter().map(|&a| self.expr_as(a, Idx::STRING)).collect(),
            Intrinsic::OsExit | Intrinsic::WaitGroupAdd => {
                let mut values: Vec<VarId> = Vec::with_capacity(args.len());
                for (n, &a) in args.iter().enumerate() {
                    let last = n + 1 == args.len();
                    values.push(if last {
                        self.expr_as(a, Idx::INT)
                    } else {
                        self.expr(a)
                    });
                }
                values
            }
            Intrinsic::ReflectTypeOf | Intrinsic::ReflectValueOf => {
                args.iter().map(|&a| self.expr_as(a, Idx::ANY)).collect()
            }
            _ => args.iter().map(|&a| self.expr(a)).collect(),
        };
        CallParts::Call {
            callee: Callee::Intrinsic(i),
            args: values,
            ty,
        }
    }

    /// Operands of a `fmt` print function as one `[]any`.
    fn format_operands(&mut self, args: &[ExprId], ellipsis: bool) -> VarId {
        let slice_ty = self.pb.pool.slice(Idx::ANY);
        if ellipsis {
            if let Some(&last) = args.last() {
                return self.expr_as(last, slice_ty);
            }
        }
        // fmt.Println(f()) with a multi-value f.
        if let [only] = args {
            let at = self.expr_ty(*only);
            if self.pb.pool.tag(at) == Tag::Tuple {
                let tuple = self.expr(*only);
                let elems = self.pb.pool.tuple_elems(at);
                let values = elems
                    .into_iter()
                    .enumerate()
                    .map(|(i, ety)| {
                        let v = self.b.emit(ety, |dst| Instr::Extract {
                            dst,
                            ty: ety,
                            tuple,
                            index: i as u32,
                        });
                        self.conv(v, Idx::ANY)
                    })
                    .collect();
                return self.pack(slice_ty, values);
            }
        }
        let values = args.iter().map(|&a| self.expr_as(a, Idx::ANY)).collect();
        self.pack(slice_ty, values)
    }
}
