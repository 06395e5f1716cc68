//! Simple statements and assignment.

use gossa_ast::{ExprId, StmtId, StmtKind};
use gossa_diagnostic::malformed;
use gossa_ir::{ensure_sufficient_stack, BinaryOp, LocalId};
use gossa_types::{Idx, Tag};

use super::call::{CallMode, CallParts};
use super::lower::FnLowerer;
use crate::ir::{Instr, VarId};

impl<'p> FnLowerer<'_, 'p> {
    pub(super) fn stmts(&mut self, body: &'p [StmtId]) {
        for &s in body {
            self.stmt(s);
        }
    }

    pub(super) fn stmt(&mut self, s: StmtId) {
        ensure_sufficient_stack(|| self.stmt_inner(s));
    }

    fn stmt_inner(&mut self, s: StmtId) {
        let pkg = self.pkg();
        let node = pkg.stmt(s);
        self.b.set_span(node.span);
        match &node.kind {
            StmtKind::Empty => {}
            StmtKind::Expr(e) => {
                self.expr(*e);
            }
            StmtKind::Define { lhs, rhs } => self.define(lhs, rhs),
            StmtKind::Assign { lhs, rhs } => self.assign(lhs, rhs),
            StmtKind::OpAssign { op, lhs, rhs } => {
                let lv = self.lvalue(*lhs);
                let ty = self.lvalue_ty(lv);
                let old = self.load_lvalue(lv);
                let y = if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
                    self.shift_count(*rhs)
                } else {
                    self.expr_as(*rhs, ty)
                };
                let v = self.binop(*op, old, y, ty);
                self.store_lvalue(lv, v);
            }
            StmtKind::IncDec { x, inc } => {
                let lv = self.lvalue(*x);
                let ty = self.lvalue_ty(lv);
                let old = self.load_lvalue(lv);
                let one = self.one(ty);
                let op = if *inc { BinaryOp::Add } else { BinaryOp::Sub };
                let v = self.binop(op, old, one, ty);
                self.store_lvalue(lv, v);
            }
            StmtKind::Send { ch, value } => {
                let ct = self.expr_ty(*ch);
                let elem = self.pb.pool.elem(ct);
                let ch = self.expr(*ch);
                let value = self.expr_as(*value, elem);
                self.b.push(Instr::Send { ch, value });
            }
            StmtKind::Go(e) => {
                if let CallParts::Call { callee, args, .. } = self.call_parts(*e, CallMode::Go) {
                    self.b.push(Instr::Go { callee, args });
                }
            }
            StmtKind::Defer(e) => {
                if let CallParts::Call { callee, args, .. } = self.call_parts(*e, CallMode::Defer)
                {
                    self.b.push(Instr::Defer { callee, args });
                }
            }
            StmtKind::Return(values) => self.return_stmt(values),
            StmtKind::Break(label) => self.break_stmt(*label),
            StmtKind::Continue(label) => self.continue_stmt(*label),
            StmtKind::Goto(label) => {
                let target = self.label_target(*label);
                self.jump_or_dead(Some(target));
            }
            StmtKind::Fallthrough => {
                let target = self.fallthrough;
                self.jump_or_dead(target);
            }
            StmtKind::Block(stmts) => self.stmts(stmts),
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => self.if_stmt(*init, *cond, then, *els),
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => self.for_stmt(*init, *cond, *post, body),
            StmtKind::Range {
                key,
                value,
                x,
                body,
            } => self.range_stmt(*key, *value, *x, body, node.span),
            StmtKind::Switch { init, tag, clauses } => self.switch_stmt(*init, *tag, clauses),
            StmtKind::TypeSwitch { init, x, clauses } => self.type_switch_stmt(*init, *x, clauses),
            StmtKind::Select { clauses } => self.select_stmt(clauses),
            StmtKind::Labeled { label, stmt } => self.labeled_stmt(*label, *stmt),
        }
    }

    /// `a, b := x, y`
    pub(super) fn define(&mut self, lhs: &[Option<LocalId>], rhs: &[ExprId]) {
        if rhs.is_empty() {
            for l in lhs.iter().flatten() {
                self.declare(*l, None);
            }
            return;
        }
        let types: Vec<Idx> = lhs
            .iter()
            .map(|l| match l {
                Some(l) => self.local_ty(*l),
                None => Idx::NONE,
            })
            .collect();
        let values = self.rhs_values(rhs, &types);
        for (l, v) in lhs.iter().zip(values) {
            if let Some(l) = l {
                self.declare(*l, Some(v));
            }
        }
    }

    /// `a, b = x, y`: left operands first, then every right operand, then
    /// the stores in order.
    pub(super) fn assign(&mut self, lhs: &[ExprId], rhs: &[ExprId]) {
        let lvs: Vec<_> = lhs.iter().map(|&e| self.lvalue(e)).collect();
        let types: Vec<Idx> = lvs.iter().map(|&lv| self.lvalue_ty(lv)).collect();
        let values = self.rhs_values(rhs, &types);
        for (lv, v) in lvs.into_iter().zip(values) {
            self.store_lvalue(lv, v);
        }
    }

    /// Right-hand sides converted to `types` (`Idx::NONE` keeps the value's
    /// own type). A single multi-value right-hand side is spread.
    pub(super) fn rhs_values(&mut self, rhs: &[ExprId], types: &[Idx]) -> Vec<VarId> {
        if rhs.len() == types.len() {
            return rhs
                .iter()
                .zip(types)
                .map(|(&e, &t)| self.expr_as(e, t))
                .collect();
        }
        if let [single] = rhs {
            let tuple = self.expr(*single);
            let tt = self.b.var_type(tuple);
            if self.pb.pool.tag(tt) == Tag::Tuple {
                let elems = self.pb.pool.tuple_elems(tt);
                if elems.len() == types.len() {
                    return elems
                        .into_iter()
                        .zip(types)
                        .enumerate()
                        .map(|(i, (ety, &t))| {
                            let v = self.b.emit(ety, |dst| Instr::Extract {
                                dst,
                                ty: ety,
                                tuple,
                                index: i as u32,
                            });
                            self.conv(v, t)
                        })
                        .collect();
                }
            }
        }
        let span = rhs
            .first()
            .map_or(gossa_ir::Span::DUMMY, |&e| self.pkg().expr(e).span);
        self.pb
            .report(malformed(span, "assignment count mismatch"));
        types
            .iter()
            .map(|&t| {
                let t = if t.is_none() { Idx::INVALID } else { t };
                self.zero(t)
            })
            .collect()
    }

    pub(super) fn binop(&mut self, op: BinaryOp, x: VarId, y: VarId, ty: Idx) -> VarId {
        self.b.emit(ty, |dst| Instr::BinOp { dst, ty, op, x, y })
    }

    /// Right operand of a shift: kept in its own integer type.
    fn shift_count(&mut self, e: ExprId) -> VarId {
        let t = self.value_ty(e);
        let t = if self.pb.pool.basic_kind(t).is_some_and(Tag::is_integer) {
            t
        } else {
            Idx::UINT
        };
        self.expr_as(e, t)
    }
}
