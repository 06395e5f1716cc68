//! Syntax tree visitor.
//!
//! Default `visit_*` methods call the matching `walk_*` function, which
//! visits children. Override a `visit_*` method to act on a node and call
//! the `walk_*` function to keep descending.
//!
//! ```text
//! struct Captures { inside: FxHashSet<LocalId>, used: Vec<LocalId> }
//!
//! impl<'ast> Visitor<'ast> for Captures {
//!     fn visit_local_def(&mut self, local: LocalId) {
//!         self.inside.insert(local);
//!     }
//!     fn visit_expr(&mut self, pkg: &'ast Package, id: ExprId) {
//!         if let ExprKind::Local(l) = pkg.expr(id).kind {
//!             self.used.push(l);
//!         }
//!         walk_expr(self, pkg, id);
//!     }
//! }
//! ```

use gossa_ir::{LocalId, ensure_sufficient_stack};

use crate::{
    CompositeKey, ExprId, ExprKind, FuncDecl, FuncLit, Package, RangeTarget, StmtId, StmtKind,
};

pub trait Visitor<'ast> {
    /// A statement.
    fn visit_stmt(&mut self, pkg: &'ast Package, id: StmtId) {
        walk_stmt(self, pkg, id);
    }

    /// An expression.
    fn visit_expr(&mut self, pkg: &'ast Package, id: ExprId) {
        walk_expr(self, pkg, id);
    }

    /// A function literal. Override to stop at function boundaries.
    fn visit_func_lit(&mut self, pkg: &'ast Package, lit: &'ast FuncLit) {
        walk_func_lit(self, pkg, lit);
    }

    /// A local coming into scope: parameters, named results, `:=` targets,
    /// range variables, type switch clause variables.
    fn visit_local_def(&mut self, local: LocalId) {
        let _ = local;
    }
}

pub fn walk_body<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    pkg: &'ast Package,
    body: &'ast [StmtId],
) {
    for &s in body {
        visitor.visit_stmt(pkg, s);
    }
}

pub fn walk_func_decl<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    pkg: &'ast Package,
    decl: &'ast FuncDecl,
) {
    if let Some(local) = decl.recv.and_then(|r| r.local) {
        visitor.visit_local_def(local);
    }
    for local in decl.params.iter().chain(&decl.results).flatten() {
        visitor.visit_local_def(*local);
    }
    if let Some(body) = &decl.body {
        walk_body(visitor, pkg, body);
    }
}

pub fn walk_func_lit<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    pkg: &'ast Package,
    lit: &'ast FuncLit,
) {
    for local in lit.params.iter().chain(&lit.results).flatten() {
        visitor.visit_local_def(*local);
    }
    walk_body(visitor, pkg, &lit.body);
}

fn walk_opt_expr<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    pkg: &'ast Package,
    e: Option<ExprId>,
) {
    if let Some(e) = e {
        visitor.visit_expr(pkg, e);
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    pkg: &'ast Package,
    id: ExprId,
) {
    ensure_sufficient_stack(|| match &pkg.expr(id).kind {
        ExprKind::Const(_)
        | ExprKind::Local(_)
        | ExprKind::Global(_)
        | ExprKind::Func(_)
        | ExprKind::Instance { .. }
        | ExprKind::Builtin(_)
        | ExprKind::Intrinsic(_)
        | ExprKind::Blank => {}
        ExprKind::FuncLit(lit) => visitor.visit_func_lit(pkg, lit),
        ExprKind::Composite { elems } => {
            for elem in elems {
                if let Some(CompositeKey::Expr(k)) = elem.key {
                    visitor.visit_expr(pkg, k);
                }
                visitor.visit_expr(pkg, elem.value);
            }
        }
        ExprKind::Field { x, .. }
        | ExprKind::Method { recv: x, .. }
        | ExprKind::TypeAssert { x, .. }
        | ExprKind::Deref(x)
        | ExprKind::AddrOf(x)
        | ExprKind::Unary { x, .. }
        | ExprKind::Recv { ch: x, .. }
        | ExprKind::Convert(x) => visitor.visit_expr(pkg, *x),
        ExprKind::Index { x, index, .. } => {
            visitor.visit_expr(pkg, *x);
            visitor.visit_expr(pkg, *index);
        }
        ExprKind::Slice { x, low, high, max } => {
            visitor.visit_expr(pkg, *x);
            walk_opt_expr(visitor, pkg, *low);
            walk_opt_expr(visitor, pkg, *high);
            walk_opt_expr(visitor, pkg, *max);
        }
        ExprKind::Call { func, args, .. } => {
            visitor.visit_expr(pkg, *func);
            for &a in args {
                visitor.visit_expr(pkg, a);
            }
        }
        ExprKind::Binary { x, y, .. } => {
            visitor.visit_expr(pkg, *x);
            visitor.visit_expr(pkg, *y);
        }
    });
}

fn walk_range_target<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    pkg: &'ast Package,
    target: Option<RangeTarget>,
) {
    match target {
        Some(RangeTarget::Local(l)) => visitor.visit_local_def(l),
        Some(RangeTarget::Expr(e)) => visitor.visit_expr(pkg, e),
        None => {}
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    pkg: &'ast Package,
    id: StmtId,
) {
    ensure_sufficient_stack(|| match &pkg.stmt(id).kind {
        StmtKind::Empty
        | StmtKind::Break(_)
        | StmtKind::Continue(_)
        | StmtKind::Goto(_)
        | StmtKind::Fallthrough => {}
        StmtKind::Expr(e) | StmtKind::Go(e) | StmtKind::Defer(e) => visitor.visit_expr(pkg, *e),
        StmtKind::Define { lhs, rhs } => {
            for &e in rhs {
                visitor.visit_expr(pkg, e);
            }
            for l in lhs.iter().flatten() {
                visitor.visit_local_def(*l);
            }
        }
        StmtKind::Assign { lhs, rhs } => {
            for &e in lhs.iter().chain(rhs) {
                visitor.visit_expr(pkg, e);
            }
        }
        StmtKind::OpAssign { lhs, rhs, .. } => {
            visitor.visit_expr(pkg, *lhs);
            visitor.visit_expr(pkg, *rhs);
        }
        StmtKind::IncDec { x, .. } => visitor.visit_expr(pkg, *x),
        StmtKind::Send { ch, value } => {
            visitor.visit_expr(pkg, *ch);
            visitor.visit_expr(pkg, *value);
        }
        StmtKind::Return(values) => {
            for &e in values {
                visitor.visit_expr(pkg, e);
            }
        }
        StmtKind::Block(body) => walk_body(visitor, pkg, body),
        StmtKind::If {
            init,
            cond,
            then,
            els,
        } => {
            if let Some(s) = init {
                visitor.visit_stmt(pkg, *s);
            }
            visitor.visit_expr(pkg, *cond);
            walk_body(visitor, pkg, then);
            if let Some(s) = els {
                visitor.visit_stmt(pkg, *s);
            }
        }
        StmtKind::For {
            init,
            cond,
            post,
            body,
        } => {
            if let Some(s) = init {
                visitor.visit_stmt(pkg, *s);
            }
            walk_opt_expr(visitor, pkg, *cond);
            if let Some(s) = post {
                visitor.visit_stmt(pkg, *s);
            }
            walk_body(visitor, pkg, body);
        }
        StmtKind::Range {
            key,
            value,
            x,
            body,
        } => {
            visitor.visit_expr(pkg, *x);
            walk_range_target(visitor, pkg, *key);
            walk_range_target(visitor, pkg, *value);
            walk_body(visitor, pkg, body);
        }
        StmtKind::Switch { init, tag, clauses } => {
            if let Some(s) = init {
                visitor.visit_stmt(pkg, *s);
            }
            walk_opt_expr(visitor, pkg, *tag);
            for clause in clauses {
                for &e in &clause.exprs {
                    visitor.visit_expr(pkg, e);
                }
                walk_body(visitor, pkg, &clause.body);
            }
        }
        StmtKind::TypeSwitch { init, x, clauses } => {
            if let Some(s) = init {
                visitor.visit_stmt(pkg, *s);
            }
            visitor.visit_expr(pkg, *x);
            for clause in clauses {
                if let Some(l) = clause.local {
                    visitor.visit_local_def(l);
                }
                walk_body(visitor, pkg, &clause.body);
            }
        }
        StmtKind::Select { clauses } => {
            for clause in clauses {
                if let Some(s) = clause.comm {
                    visitor.visit_stmt(pkg, s);
                }
                walk_body(visitor, pkg, &clause.body);
            }
        }
        StmtKind::Labeled { stmt, .. } => visitor.visit_stmt(pkg, *stmt),
    });
}

#[cfg(test)]
mod tests {
    use gossa_ir::{BinaryOp, StringInterner};
    use gossa_types::Idx;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::AstBuilder;

    #[derive(Default)]
    struct Collect {
        defs: Vec<LocalId>,
        uses: Vec<LocalId>,
        lits: usize,
    }

    impl<'ast> Visitor<'ast> for Collect {
        fn visit_expr(&mut self, pkg: &'ast Package, id: ExprId) {
            if let ExprKind::Local(l) = pkg.expr(id).kind {
                self.uses.push(l);
            }
            walk_expr(self, pkg, id);
        }

        fn visit_func_lit(&mut self, pkg: &'ast Package, lit: &'ast FuncLit) {
            self.lits += 1;
            walk_func_lit(self, pkg, lit);
        }

        fn visit_local_def(&mut self, local: LocalId) {
            self.defs.push(local);
        }
    }

    #[test]
    fn walks_into_function_literals() {
        let mut b = AstBuilder::new("main", StringInterner::shared());
        let x = b.local("x", Idx::INT);
        let y = b.local("y", Idx::INT);
        let one = b.int(1);
        let def_x = b.define1(x, one);
        let xr = b.local_ref(x);
        let two = b.int(2);
        let sum = b.arith(BinaryOp::Add, xr, two);
        let def_y = b.define1(y, sum);
        let lit = b.func_lit(Idx::INVALID, vec![], vec![], vec![def_y]);
        let call = b.call(lit, vec![], Idx::EMPTY_TUPLE);
        let call_stmt = b.expr_stmt(call);
        let body = [def_x, call_stmt];
        let pkg = b.finish();

        let mut c = Collect::default();
        walk_body(&mut c, &pkg, &body);
        assert_eq!(c.defs, vec![x, y]);
        assert_eq!(c.uses, vec![x]);
        assert_eq!(c.lits, 1);
    }

    #[test]
    fn range_targets_are_definitions_or_uses() {
        let mut b = AstBuilder::new("main", StringInterner::shared());
        let k = b.local("k", Idx::INT);
        let v = b.local("v", Idx::INT);
        let xs = b.local("xs", Idx::INVALID);
        let xs_ref = b.local_ref(xs);
        let v_ref = b.local_ref(v);
        let s = b.range(
            Some(RangeTarget::Local(k)),
            Some(RangeTarget::Expr(v_ref)),
            xs_ref,
            vec![],
        );
        let pkg = b.finish();

        let mut c = Collect::default();
        c.visit_stmt(&pkg, s);
        assert_eq!(c.defs, vec![k]);
        assert_eq!(c.uses, vec![xs, v]);
    }
}
