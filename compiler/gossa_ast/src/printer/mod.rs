//! One-line rendering of statements and expressions.
//!
//! Used by the CFG utility's block listing and by diagnostics. Compound
//! statements render as their header only (`if x < 3`, `for range xs`).

use gossa_ir::{BinaryOp, ConstValue, ensure_sufficient_stack};
use gossa_types::{Pool, Tag};

use crate::{CompositeKey, ExprId, ExprKind, Package, RangeTarget, StmtId, StmtKind};

/// Renders nodes of one package.
pub struct Printer<'a> {
    pkg: &'a Package,
    pool: &'a Pool,
}

fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::LogOr => 1,
        BinaryOp::LogAnd => 2,
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => 3,
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
        BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Rem
        | BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::And
        | BinaryOp::AndNot => 5,
    }
}

impl<'a> Printer<'a> {
    pub fn new(pkg: &'a Package, pool: &'a Pool) -> Self {
        Printer { pkg, pool }
    }

    pub fn expr(&self, id: ExprId) -> String {
        let mut buf = String::new();
        self.expr_into(id, &mut buf);
        buf
    }

    pub fn stmt(&self, id: StmtId) -> String {
        let mut buf = String::new();
        self.stmt_into(id, &mut buf);
        buf
    }

    fn list_into(&self, ids: &[ExprId], buf: &mut String) {
        for (i, &e) in ids.iter().enumerate() {
            if i > 0 {
                buf.push_str(", ");
            }
            self.expr_into(e, buf);
        }
    }

    fn operand_into(&self, id: ExprId, parent: u8, buf: &mut String) {
        if let ExprKind::Binary { op, .. } = self.pkg.expr(id).kind {
            if precedence(op) < parent {
                buf.push('(');
                self.expr_into(id, buf);
                buf.push(')');
                return;
            }
        }
        self.expr_into(id, buf);
    }

    pub fn expr_into(&self, id: ExprId, buf: &mut String) {
        ensure_sufficient_stack(|| self.expr_inner(id, buf));
    }

    fn expr_inner(&self, id: ExprId, buf: &mut String) {
        let expr = self.pkg.expr(id);
        let name = |n| self.pool.name_str(n);
        match &expr.kind {
            ExprKind::Const(ConstValue::Nil) => buf.push_str("nil"),
            ExprKind::Const(c) => buf.push_str(&c.to_string()),
            ExprKind::Local(l) => buf.push_str(name(self.pkg.local(*l).name)),
            ExprKind::Global(g) => buf.push_str(name(self.pkg.global(*g).name)),
            ExprKind::Func(f) => buf.push_str(name(self.pkg.func(*f).name)),
            ExprKind::Instance { func, targs } => {
                buf.push_str(name(self.pkg.func(*func).name));
                buf.push('[');
                for (i, &t) in targs.iter().enumerate() {
                    if i > 0 {
                        buf.push(',');
                    }
                    self.pool.format_type_into(t, buf);
                }
                buf.push(']');
            }
            ExprKind::Builtin(b) => buf.push_str(b.name()),
            ExprKind::Intrinsic(i) => buf.push_str(i.name()),
            ExprKind::Blank => buf.push('_'),
            ExprKind::FuncLit(lit) => {
                self.pool.format_type_into(lit.sig, buf);
                buf.push_str(" {...}");
            }
            ExprKind::Composite { elems } => {
                self.pool.format_type_into(expr.ty, buf);
                buf.push('{');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(", ");
                    }
                    match elem.key {
                        Some(CompositeKey::Field(f)) => {
                            let field = self.pool.field(expr.ty, f as usize);
                            buf.push_str(name(field.name));
                            buf.push_str(": ");
                        }
                        Some(CompositeKey::Index(i)) => {
                            buf.push_str(&i.to_string());
                            buf.push_str(": ");
                        }
                        Some(CompositeKey::Expr(k)) => {
                            self.expr_into(k, buf);
                            buf.push_str(": ");
                        }
                        None => {}
                    }
                    self.expr_into(elem.value, buf);
                }
                buf.push('}');
            }
            ExprKind::Field { x, path } => {
                self.operand_into(*x, u8::MAX, buf);
                let mut ty = self.pkg.expr(*x).ty;
                for (n, &i) in path.iter().enumerate() {
                    ty = self.pool.deref(ty);
                    let field = self.pool.field(ty, i as usize);
                    // Embedded hops are implicit in source.
                    if n + 1 == path.len() || !field.embedded {
                        buf.push('.');
                        buf.push_str(name(field.name));
                    }
                    ty = field.ty;
                }
            }
            ExprKind::Method { recv, method } => {
                self.operand_into(*recv, u8::MAX, buf);
                buf.push('.');
                buf.push_str(name(*method));
            }
            ExprKind::Index { x, index, .. } => {
                self.operand_into(*x, u8::MAX, buf);
                buf.push('[');
                self.expr_into(*index, buf);
                buf.push(']');
            }
            ExprKind::Slice { x, low, high, max } => {
                self.operand_into(*x, u8::MAX, buf);
                buf.push('[');
                if let Some(l) = low {
                    self.expr_into(*l, buf);
                }
                buf.push(':');
                if let Some(h) = high {
                    self.expr_into(*h, buf);
                }
                if let Some(m) = max {
                    buf.push(':');
                    self.expr_into(*m, buf);
                }
                buf.push(']');
            }
            ExprKind::TypeAssert { x, ty, .. } => {
                self.operand_into(*x, u8::MAX, buf);
                buf.push_str(".(");
                self.pool.format_type_into(*ty, buf);
                buf.push(')');
            }
            ExprKind::Call { func, args, ellipsis } => {
                self.operand_into(*func, u8::MAX, buf);
                buf.push('(');
                self.list_into(args, buf);
                if *ellipsis {
                    buf.push_str("...");
                }
                buf.push(')');
            }
            ExprKind::Deref(x) => {
                buf.push('*');
                self.operand_into(*x, u8::MAX, buf);
            }
            ExprKind::AddrOf(x) => {
                buf.push('&');
                self.operand_into(*x, u8::MAX, buf);
            }
            ExprKind::Unary { op, x } => {
                buf.push_str(op.as_symbol());
                self.operand_into(*x, u8::MAX, buf);
            }
            ExprKind::Binary { op, x, y } => {
                let prec = precedence(*op);
                self.operand_into(*x, prec, buf);
                buf.push(' ');
                buf.push_str(op.as_symbol());
                buf.push(' ');
                self.operand_into(*y, prec + 1, buf);
            }
            ExprKind::Recv { ch, .. } => {
                buf.push_str("<-");
                self.operand_into(*ch, u8::MAX, buf);
            }
            ExprKind::Convert(x) => {
                let needs_parens = matches!(
                    self.pool.tag(expr.ty),
                    Tag::Pointer | Tag::Chan | Tag::Signature
                );
                if needs_parens {
                    buf.push('(');
                }
                self.pool.format_type_into(expr.ty, buf);
                if needs_parens {
                    buf.push(')');
                }
                buf.push('(');
                self.expr_into(*x, buf);
                buf.push(')');
            }
        }
    }

    fn range_target_into(&self, target: RangeTarget, buf: &mut String) {
        match target {
            RangeTarget::Local(l) => buf.push_str(self.pool.name_str(self.pkg.local(l).name)),
            RangeTarget::Expr(e) => self.expr_into(e, buf),
        }
    }

    pub fn stmt_into(&self, id: StmtId, buf: &mut String) {
        let stmt = self.pkg.stmt(id);
        match &stmt.kind {
            StmtKind::Empty => {}
            StmtKind::Expr(e) => self.expr_into(*e, buf),
            StmtKind::Define { lhs, rhs } => {
                for (i, l) in lhs.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(", ");
                    }
                    match l {
                        Some(l) => buf.push_str(self.pool.name_str(self.pkg.local(*l).name)),
                        None => buf.push('_'),
                    }
                }
                if rhs.is_empty() {
                    if let Some(Some(first)) = lhs.first() {
                        buf.insert_str(0, "var ");
                        buf.push(' ');
                        self.pool.format_type_into(self.pkg.local(*first).ty, buf);
                    }
                } else {
                    buf.push_str(" := ");
                    self.list_into(rhs, buf);
                }
            }
            StmtKind::Assign { lhs, rhs } => {
                self.list_into(lhs, buf);
                buf.push_str(" = ");
                self.list_into(rhs, buf);
            }
            StmtKind::OpAssign { op, lhs, rhs } => {
                self.expr_into(*lhs, buf);
                buf.push(' ');
                buf.push_str(op.as_symbol());
                buf.push_str("= ");
                self.expr_into(*rhs, buf);
            }
            StmtKind::IncDec { x, inc } => {
                self.expr_into(*x, buf);
                buf.push_str(if *inc { "++" } else { "--" });
            }
            StmtKind::Send { ch, value } => {
                self.expr_into(*ch, buf);
                buf.push_str(" <- ");
                self.expr_into(*value, buf);
            }
            StmtKind::Go(call) => {
                buf.push_str("go ");
                self.expr_into(*call, buf);
            }
            StmtKind::Defer(call) => {
                buf.push_str("defer ");
                self.expr_into(*call, buf);
            }
            StmtKind::Return(values) => {
                buf.push_str("return");
                if !values.is_empty() {
                    buf.push(' ');
                    self.list_into(values, buf);
                }
            }
            StmtKind::Break(label) | StmtKind::Continue(label) => {
                buf.push_str(if matches!(stmt.kind, StmtKind::Break(_)) {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = label {
                    buf.push(' ');
                    buf.push_str(self.pool.name_str(*label));
                }
            }
            StmtKind::Goto(label) => {
                buf.push_str("goto ");
                buf.push_str(self.pool.name_str(*label));
            }
            StmtKind::Fallthrough => buf.push_str("fallthrough"),
            StmtKind::Block(_) => buf.push_str("{...}"),
            StmtKind::If { cond, .. } => {
                buf.push_str("if ");
                self.expr_into(*cond, buf);
            }
            StmtKind::For { cond, .. } => {
                buf.push_str("for");
                if let Some(c) = cond {
                    buf.push(' ');
                    self.expr_into(*c, buf);
                }
            }
            StmtKind::Range { key, value, x, .. } => {
                buf.push_str("for ");
                if let Some(k) = key {
                    self.range_target_into(*k, buf);
                    if let Some(v) = value {
                        buf.push_str(", ");
                        self.range_target_into(*v, buf);
                    }
                    buf.push_str(" := ");
                }
                buf.push_str("range ");
                self.expr_into(*x, buf);
            }
            StmtKind::Switch { tag, .. } => {
                buf.push_str("switch");
                if let Some(t) = tag {
                    buf.push(' ');
                    self.expr_into(*t, buf);
                }
            }
            StmtKind::TypeSwitch { x, .. } => {
                buf.push_str("switch ");
                self.expr_into(*x, buf);
                buf.push_str(".(type)");
            }
            StmtKind::Select { .. } => buf.push_str("select"),
            StmtKind::Labeled { label, .. } => {
                buf.push_str(self.pool.name_str(*label));
                buf.push(':');
            }
        }
    }
}

#[cfg(test)]
mod tests;
