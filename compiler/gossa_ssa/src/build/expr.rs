//! Expression lowering.

use gossa_ast::{CompositeKey, ExprId, ExprKind};
use gossa_diagnostic::malformed;
use gossa_ir::{ensure_sufficient_stack, BinaryOp, ConstValue, GlobalId, LocalId, Name};
use gossa_types::{Idx, Tag};

use super::call::MethodCallee;
use super::lower::FnLowerer;
use crate::ir::{BoundTarget, Instr, VarId};

/// An assignable location.
#[derive(Copy, Clone, Debug)]
pub(super) enum LValue {
    Blank,
    Local(LocalId),
    /// Pointer to a value of type `ty`.
    Addr { addr: VarId, ty: Idx },
    MapEntry { map: VarId, key: VarId, ty: Idx },
}

impl<'p> FnLowerer<'_, 'p> {
    /// Type of `e` as seen from the body being lowered.
    pub(super) fn expr_ty(&mut self, e: ExprId) -> Idx {
        let t = self.pkg().expr(e).ty;
        self.pb.ty(t)
    }

    /// Type of the value `e` produces: untyped constants take their
    /// default type.
    pub(super) fn value_ty(&mut self, e: ExprId) -> Idx {
        let t = self.expr_ty(e);
        self.pb.pool.default_type(t)
    }

    /// Lower `e` and convert the result to `target` the way assignment
    /// does. `Idx::NONE` keeps the expression's own type.
    pub(super) fn expr_as(&mut self, e: ExprId, target: Idx) -> VarId {
        if target.is_none() {
            return self.expr(e);
        }
        if let ExprKind::Const(c) = &self.pkg().expr(e).kind {
            if !self.pb.pool.is_interface(target) {
                if matches!(c, ConstValue::Nil) {
                    return self.zero(target);
                }
                let value = self.const_for(c, target);
                return self.b.emit_const(target, value);
            }
        }
        let v = self.expr(e);
        self.conv(v, target)
    }

    /// Convert `v` to `to` for assignment: box into interfaces, change
    /// interface types, retype between identical underlying types.
    pub(super) fn conv(&mut self, v: VarId, to: Idx) -> VarId {
        let from = self.b.var_type(v);
        if to.is_none() || from == to {
            return v;
        }
        if from == Idx::UNTYPED_NIL {
            return self.zero(to);
        }
        if self.pb.pool.is_interface(to) {
            if self.pb.pool.is_interface(from) {
                return self.b.emit(to, |dst| Instr::Convert { dst, ty: to, x: v });
            }
            self.pb.need_methods(from);
            return self.b.emit(to, |dst| Instr::MakeInterface { dst, ty: to, x: v });
        }
        self.b.emit(to, |dst| Instr::Convert { dst, ty: to, x: v })
    }

    /// A constant represented the way values of `ty` are.
    fn const_for(&self, c: &ConstValue, ty: Idx) -> ConstValue {
        let Some(kind) = self.pb.pool.basic_kind(ty) else {
            return c.clone();
        };
        match *c {
            ConstValue::Int(i) if kind.is_float() => ConstValue::Float(i as f64),
            ConstValue::Int(i) if kind.is_complex() => ConstValue::Complex(i as f64, 0.0),
            ConstValue::Float(f) if kind.is_complex() => ConstValue::Complex(f, 0.0),
            ConstValue::Float(f) if kind.is_integer() => ConstValue::Int(f as i128),
            _ => c.clone(),
        }
    }

    /// Lower `e` to a value of its own (defaulted) type.
    pub(super) fn expr(&mut self, e: ExprId) -> VarId {
        ensure_sufficient_stack(|| self.expr_inner(e))
    }

    fn expr_inner(&mut self, e: ExprId) -> VarId {
        let pkg = self.pkg();
        let node = pkg.expr(e);
        let ty = self.value_ty(e);
        match &node.kind {
            ExprKind::Const(c) => {
                let value = self.const_for(c, ty);
                self.b.emit_const(ty, value)
            }
            ExprKind::Local(l) => self.read_local(*l),
            ExprKind::Global(g) => {
                let addr = self.global_addr(*g);
                self.load(addr, ty)
            }
            ExprKind::Func(f) => {
                let func = self.pb.fn_for(*f, Vec::new());
                self.b.emit(ty, |dst| Instr::FuncValue { dst, ty, func })
            }
            ExprKind::Instance { func, targs } => {
                let targs = targs.iter().map(|&t| self.pb.ty(t)).collect();
                let func = self.pb.fn_for(*func, targs);
                self.b.emit(ty, |dst| Instr::FuncValue { dst, ty, func })
            }
            ExprKind::Builtin(b) => {
                let what = format!("builtin {b} used as a value");
                self.unsupported(node.span, &what, ty)
            }
            ExprKind::Intrinsic(i) => {
                let what = format!("{i} used as a value");
                self.unsupported(node.span, &what, ty)
            }
            ExprKind::Blank => {
                self.pb.report(malformed(node.span, "`_` used as a value"));
                self.zero(ty)
            }
            ExprKind::FuncLit(lit) => self.func_lit(lit, node.span),
            ExprKind::Composite { .. } => self.composite(e),
            ExprKind::Field { x, path } => self.field_value(*x, path),
            ExprKind::Method { recv, method } => self.method_value(*recv, *method, ty, e),
            ExprKind::Index { x, index, comma_ok } => self.index(*x, *index, *comma_ok, ty),
            ExprKind::Slice { x, low, high, max } => {
                let xt = self.expr_ty(*x);
                let base = if self.pb.pool.under_tag(xt) == Tag::Array {
                    self.addr(*x)
                } else {
                    self.expr(*x)
                };
                let low = low.map(|v| self.expr(v));
                let high = high.map(|v| self.expr(v));
                let max = max.map(|v| self.expr(v));
                self.b.emit(ty, |dst| Instr::Slice {
                    dst,
                    ty,
                    x: base,
                    low,
                    high,
                    max,
                })
            }
            ExprKind::TypeAssert {
                x,
                ty: asserted,
                comma_ok,
            } => {
                let v = self.expr(*x);
                let asserted = self.pb.ty(*asserted);
                self.b.emit(ty, |dst| Instr::TypeAssert {
                    dst,
                    ty,
                    x: v,
                    asserted,
                    comma_ok: *comma_ok,
                })
            }
            ExprKind::Call { .. } => self.call(e),
            ExprKind::Deref(x) => {
                let addr = self.expr(*x);
                self.load(addr, ty)
            }
            ExprKind::AddrOf(x) => {
                if matches!(pkg.expr(*x).kind, ExprKind::Composite { .. }) {
                    self.composite_addr(*x)
                } else {
                    self.addr(*x)
                }
            }
            ExprKind::Unary { op, x } => {
                let v = self.expr_as(*x, ty);
                let op = *op;
                self.b.emit(ty, |dst| Instr::UnOp { dst, ty, op, x: v })
            }
            ExprKind::Binary { op, x, y } => self.binary(*op, *x, *y, ty),
            ExprKind::Recv { ch, comma_ok } => {
                let ch = self.expr(*ch);
                self.b.emit(ty, |dst| Instr::Recv {
                    dst,
                    ty,
                    ch,
                    comma_ok: *comma_ok,
                })
            }
            ExprKind::Convert(x) => self.conversion(*x, ty),
        }
    }

    pub(super) fn global_addr(&mut self, g: GlobalId) -> VarId {
        let t = self.pkg().global(g).ty;
        let ptr = self.pointer_to(t);
        self.b.emit(ptr, |dst| Instr::Global {
            dst,
            ty: ptr,
            global: g,
        })
    }

    fn conversion(&mut self, x: ExprId, ty: Idx) -> VarId {
        let pool = &*self.pb.pool;
        if let ExprKind::Const(c) = &self.pkg().expr(x).kind {
            // Integer constants converted to strings become runes at run time.
            let to_string = pool.under_tag(ty) == Tag::String && !matches!(c, ConstValue::Str(_));
            if !to_string && !pool.is_interface(ty) {
                return self.expr_as(x, ty);
            }
        }
        let v = self.expr(x);
        if self.pb.pool.is_interface(ty) {
            return self.conv(v, ty);
        }
        if self.b.var_type(v) == ty {
            return v;
        }
        self.b.emit(ty, |dst| Instr::Convert { dst, ty, x: v })
    }

    // Operators

    fn binary(&mut self, op: BinaryOp, x: ExprId, y: ExprId, ty: Idx) -> VarId {
        if op.is_short_circuit() {
            return self.short_circuit(op, x, y, ty);
        }
        if op.is_comparison() {
            let operand = self.comparison_operand_ty(x, y);
            let xv = self.expr_as(x, operand);
            let yv = self.expr_as(y, operand);
            return self.b.emit(ty, |dst| Instr::BinOp {
                dst,
                ty,
                op,
                x: xv,
                y: yv,
            });
        }
        let xv = self.expr_as(x, ty);
        let yv = if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
            let yt = self.value_ty(y);
            let yt = if self.pb.pool.basic_kind(yt).is_some_and(Tag::is_integer) {
                yt
            } else {
                Idx::UINT
            };
            self.expr_as(y, yt)
        } else {
            self.expr_as(y, ty)
        };
        self.b.emit(ty, |dst| Instr::BinOp {
            dst,
            ty,
            op,
            x: xv,
            y: yv,
        })
    }

    /// Common operand type of a comparison: untyped sides take the typed
    /// side's type, concrete sides are boxed to the interface side.
    fn comparison_operand_ty(&mut self, x: ExprId, y: ExprId) -> Idx {
        let tx = self.expr_ty(x);
        let ty = self.expr_ty(y);
        let pool = &*self.pb.pool;
        let ux = pool.tag(tx).is_untyped();
        let uy = pool.tag(ty).is_untyped();
        match (ux, uy) {
            (true, false) => ty,
            (false, true) => tx,
            (true, true) => {
                if tx == Idx::UNTYPED_NIL {
                    pool.default_type(ty)
                } else {
                    pool.default_type(tx)
                }
            }
            (false, false) => {
                if pool.is_interface(ty) && !pool.is_interface(tx) {
                    ty
                } else {
                    tx
                }
            }
        }
    }

    /// `x && y`, `x || y`: `y` is only evaluated when it decides the result.
    fn short_circuit(&mut self, op: BinaryOp, x: ExprId, y: ExprId, ty: Idx) -> VarId {
        let xv = self.expr_as(x, ty);
        let rhs = self.b.new_block("cond.rhs");
        let done = self.b.new_block("cond.done");
        if op == BinaryOp::LogAnd {
            self.b.branch(xv, rhs, done);
        } else {
            self.b.branch(xv, done, rhs);
        }
        self.b.position_at(rhs);
        let yv = self.expr_as(y, ty);
        let rhs_end = self.b.current_block();
        self.b.jump(done);
        self.b.position_at(done);
        let edges = self
            .b
            .preds(done)
            .iter()
            .map(|&p| if p == rhs_end { yv } else { xv })
            .collect();
        self.b.add_phi(done, ty, edges)
    }

    // Selection and indexing

    /// Value of `x.f` along `path`.
    fn field_value(&mut self, x: ExprId, path: &[u32]) -> VarId {
        let xt = self.expr_ty(x);
        let through_pointer = self.path_has_pointer(xt, path);
        if through_pointer {
            let addr = self.field_addr(x, path);
            let ty = self.pb.pool.elem(self.b.var_type(addr));
            return self.load(addr, ty);
        }
        let mut v = self.expr(x);
        let mut cur = xt;
        for &f in path {
            let field = self.pb.pool.field(cur, f as usize);
            let fty = field.ty;
            v = self.b.emit(fty, |dst| Instr::Field {
                dst,
                ty: fty,
                x: v,
                field: f,
            });
            cur = fty;
        }
        v
    }

    /// Whether selecting `path` from a `ty` goes through a pointer.
    fn path_has_pointer(&self, ty: Idx, path: &[u32]) -> bool {
        let pool = &*self.pb.pool;
        let mut cur = ty;
        for &f in path {
            if pool.under_tag(cur) == Tag::Pointer {
                return true;
            }
            cur = pool.field(cur, f as usize).ty;
        }
        false
    }

    /// Address of `x.f` along `path`; pointers along the way are loaded.
    pub(super) fn field_addr(&mut self, x: ExprId, path: &[u32]) -> VarId {
        let xt = self.expr_ty(x);
        let (mut base, mut cur) = if self.pb.pool.under_tag(xt) == Tag::Pointer {
            let p = self.expr(x);
            (p, self.pb.pool.deref(xt))
        } else {
            (self.addr(x), xt)
        };
        for (i, &f) in path.iter().enumerate() {
            let fty = self.pb.pool.field(cur, f as usize).ty;
            let ptr = self.pointer_to(fty);
            base = self.b.emit(ptr, |dst| Instr::FieldAddr {
                dst,
                ty: ptr,
                x: base,
                field: f,
            });
            cur = fty;
            if i + 1 < path.len() && self.pb.pool.under_tag(cur) == Tag::Pointer {
                base = self.load(base, cur);
                cur = self.pb.pool.deref(cur);
            }
        }
        base
    }

    fn index(&mut self, x: ExprId, index: ExprId, comma_ok: bool, ty: Idx) -> VarId {
        let xt = self.expr_ty(x);
        match self.pb.pool.under_tag(xt) {
            Tag::Map => {
                let key_ty = self.pb.pool.key(xt);
                let map = self.expr(x);
                let key = self.expr_as(index, key_ty);
                self.b.emit(ty, |dst| Instr::Lookup {
                    dst,
                    ty,
                    map,
                    key,
                    comma_ok,
                })
            }
            Tag::Slice | Tag::Pointer => {
                let addr = self.index_addr(x, index);
                self.load(addr, ty)
            }
            _ => {
                // Arrays by value and strings.
                let v = self.expr(x);
                let i = self.expr(index);
                self.b.emit(ty, |dst| Instr::Index { dst, ty, x: v, index: i })
            }
        }
    }

    /// `&x[i]` for slices, arrays and pointers to arrays.
    fn index_addr(&mut self, x: ExprId, index: ExprId) -> VarId {
        let xt = self.expr_ty(x);
        let base = if self.pb.pool.under_tag(xt) == Tag::Array {
            self.addr(x)
        } else {
            self.expr(x)
        };
        let i = self.expr(index);
        let elem = match self.pb.pool.under_tag(xt) {
            Tag::Pointer => {
                let arr = self.pb.pool.deref(xt);
                self.pb.pool.elem(arr)
            }
            _ => self.pb.pool.elem(xt),
        };
        let ptr = self.pointer_to(elem);
        self.b.emit(ptr, |dst| Instr::IndexAddr {
            dst,
            ty: ptr,
            x: base,
            index: i,
        })
    }

    fn method_value(&mut self, recv: ExprId, method: Name, ty: Idx, e: ExprId) -> VarId {
        let span = self.pkg().expr(e).span;
        match self.method_callee(recv, method) {
            Some(MethodCallee::Static { func, recv }) => self.b.emit(ty, |dst| Instr::MakeBound {
                dst,
                ty,
                recv,
                target: BoundTarget::Static(func),
            }),
            Some(MethodCallee::Invoke { recv, method }) => {
                self.b.emit(ty, |dst| Instr::MakeBound {
                    dst,
                    ty,
                    recv,
                    target: BoundTarget::Invoke(method),
                })
            }
            None => self.unsupported(span, "method value without a method", ty),
        }
    }

    // Addresses

    /// Address of an addressable expression. Non-addressable operands are
    /// copied into a fresh cell.
    pub(super) fn addr(&mut self, e: ExprId) -> VarId {
        let pkg = self.pkg();
        match &pkg.expr(e).kind {
            ExprKind::Local(l) => self.local_addr(*l),
            ExprKind::Global(g) => self.global_addr(*g),
            ExprKind::Deref(x) => self.expr(*x),
            ExprKind::Field { x, path } => self.field_addr(*x, path),
            ExprKind::Index { x, index, .. } if !self.is_map(*x) => self.index_addr(*x, *index),
            ExprKind::Composite { .. } => self.composite_addr(e),
            _ => {
                let v = self.expr(e);
                let ty = self.b.var_type(v);
                let cell = self.alloc(ty);
                self.store(cell, v);
                cell
            }
        }
    }

    fn is_map(&mut self, x: ExprId) -> bool {
        let t = self.expr_ty(x);
        self.pb.pool.under_tag(t) == Tag::Map
    }

    pub(super) fn lvalue(&mut self, e: ExprId) -> LValue {
        let pkg = self.pkg();
        match &pkg.expr(e).kind {
            ExprKind::Blank => LValue::Blank,
            ExprKind::Local(l) => LValue::Local(*l),
            ExprKind::Index { x, index, .. } if self.is_map(*x) => {
                let xt = self.expr_ty(*x);
                let key_ty = self.pb.pool.key(xt);
                let ty = self.pb.pool.elem(xt);
                let map = self.expr(*x);
                let key = self.expr_as(*index, key_ty);
                LValue::MapEntry { map, key, ty }
            }
            _ => {
                let ty = self.expr_ty(e);
                let addr = self.addr(e);
                LValue::Addr { addr, ty }
            }
        }
    }

    /// Type values stored through `lv` must have (`Idx::NONE` for `_`).
    pub(super) fn lvalue_ty(&mut self, lv: LValue) -> Idx {
        match lv {
            LValue::Blank => Idx::NONE,
            LValue::Local(l) => self.local_ty(l),
            LValue::Addr { ty, .. } | LValue::MapEntry { ty, .. } => ty,
        }
    }

    pub(super) fn store_lvalue(&mut self, lv: LValue, value: VarId) {
        match lv {
            LValue::Blank => {}
            LValue::Local(l) => self.assign_local(l, value),
            LValue::Addr { addr, .. } => self.store(addr, value),
            LValue::MapEntry { map, key, .. } => self.b.push(Instr::MapUpdate { map, key, value }),
        }
    }

    pub(super) fn load_lvalue(&mut self, lv: LValue) -> VarId {
        match lv {
            LValue::Blank => self.zero(Idx::INVALID),
            LValue::Local(l) => self.read_local(l),
            LValue::Addr { addr, ty } => self.load(addr, ty),
            LValue::MapEntry { map, key, ty } => self.b.emit(ty, |dst| Instr::Lookup {
                dst,
                ty,
                map,
                key,
                comma_ok: false,
            }),
        }
    }

    // Composite literals

    fn composite(&mut self, e: ExprId) -> VarId {
        let ty = self.expr_ty(e);
        match self.pb.pool.under_tag(ty) {
            Tag::Struct | Tag::Array => {
                let addr = self.composite_addr(e);
                self.load(addr, ty)
            }
            // Elided `&T{...}` inside another literal.
            Tag::Pointer => self.composite_addr(e),
            Tag::Slice => self.slice_literal(e, ty),
            Tag::Map => self.map_literal(e, ty),
            _ => {
                let span = self.pkg().expr(e).span;
                self.unsupported(span, "composite literal of this type", ty)
            }
        }
    }

    /// A fresh cell holding the struct or array literal `e`.
    pub(super) fn composite_addr(&mut self, e: ExprId) -> VarId {
        let pkg = self.pkg();
        let mut ty = self.expr_ty(e);
        if self.pb.pool.under_tag(ty) == Tag::Pointer {
            ty = self.pb.pool.deref(ty);
        }
        let ExprKind::Composite { elems } = &pkg.expr(e).kind else {
            return self.addr(e);
        };
        let cell = self.alloc(ty);
        match self.pb.pool.under_tag(ty) {
            Tag::Struct => {
                for (i, elem) in elems.iter().enumerate() {
                    let f = match elem.key {
                        Some(CompositeKey::Field(f)) => f,
                        _ => i as u32,
                    };
                    let fty = self.pb.pool.field(ty, f as usize).ty;
                    let ptr = self.pointer_to(fty);
                    let v = self.expr_as(elem.value, fty);
                    let addr = self.b.emit(ptr, |dst| Instr::FieldAddr {
                        dst,
                        ty: ptr,
                        x: cell,
                        field: f,
                    });
                    self.store(addr, v);
                }
            }
            Tag::Array => {
                let elem_ty = self.pb.pool.elem(ty);
                self.fill_elements(cell, elem_ty, elems);
            }
            _ => {
                let span = pkg.expr(e).span;
                self.unsupported(span, "composite literal of this type", Idx::EMPTY_TUPLE);
            }
        }
        cell
    }

    /// Store the elements of an array or slice literal through `base`
    /// (a pointer to an array).
    fn fill_elements(&mut self, base: VarId, elem_ty: Idx, elems: &[gossa_ast::CompositeElem]) {
        let ptr = self.pointer_to(elem_ty);
        let mut next: u64 = 0;
        for elem in elems {
            let i = match elem.key {
                Some(CompositeKey::Index(i)) => i,
                _ => next,
            };
            next = i + 1;
            let v = self.expr_as(elem.value, elem_ty);
            let index = self.b.emit_const(Idx::INT, ConstValue::Int(i128::from(i)));
            let addr = self.b.emit(ptr, |dst| Instr::IndexAddr {
                dst,
                ty: ptr,
                x: base,
                index,
            });
            self.store(addr, v);
        }
    }

    fn slice_literal(&mut self, e: ExprId, ty: Idx) -> VarId {
        let pkg = self.pkg();
        let ExprKind::Composite { elems } = &pkg.expr(e).kind else {
            return self.zero(ty);
        };
        let len = literal_len(elems);
        let elem_ty = self.pb.pool.elem(ty);
        let arr = self.pb.pool.array(elem_ty, len);
        let cell = self.alloc(arr);
        self.fill_elements(cell, elem_ty, elems);
        self.b.emit(ty, |dst| Instr::Slice {
            dst,
            ty,
            x: cell,
            low: None,
            high: None,
            max: None,
        })
    }

    fn map_literal(&mut self, e: ExprId, ty: Idx) -> VarId {
        let pkg = self.pkg();
        let map = self.b.emit(ty, |dst| Instr::MakeMap { dst, ty });
        let ExprKind::Composite { elems } = &pkg.expr(e).kind else {
            return map;
        };
        let key_ty = self.pb.pool.key(ty);
        let elem_ty = self.pb.pool.elem(ty);
        for elem in elems {
            let Some(CompositeKey::Expr(k)) = elem.key else {
                self.pb.report(malformed(pkg.expr(elem.value).span, "map literal element without key"));
                continue;
            };
            let key = self.expr_as(k, key_ty);
            let value = self.expr_as(elem.value, elem_ty);
            self.b.push(Instr::MapUpdate { map, key, value });
        }
        map
    }

    /// `++`/`--` and op-assign right operand: the constant one in `ty`.
    pub(super) fn one(&mut self, ty: Idx) -> VarId {
        let value = self.const_for(&ConstValue::Int(1), ty);
        self.b.emit_const(ty, value)
    }
}

/// Length of an array or slice literal: one past the highest index.
fn literal_len(elems: &[gossa_ast::CompositeElem]) -> u64 {
    let mut next: u64 = 0;
    let mut len: u64 = 0;
    for elem in elems {
        let i = match elem.key {
            Some(CompositeKey::Index(i)) => i,
            _ => next,
        };
        next = i + 1;
        len = len.max(next);
    }
    len
}
