//! Which locals live in heap cells.
//!
//! A local is kept in a cell (`Alloc` + `Load`/`Store`) instead of an SSA
//! register when
//!
//! - its address is taken, explicitly (`&x`, `x[:]` on an array) or
//!   implicitly (a pointer-receiver method called on it)
//! - a function literal other than its declaring one refers to it
//! - its type is a struct or array, so that element stores can address it
//! - it is a named result of a function containing `defer`, so deferred
//!   closures and recovered panics observe its latest value

use gossa_ast::visitor::{walk_expr, walk_func_decl, walk_func_lit, walk_stmt, Visitor};
use gossa_ast::{ExprId, ExprKind, FuncDecl, FuncLit, Package, StmtId, StmtKind};
use gossa_ir::LocalId;
use gossa_types::{Idx, Tag};
use rustc_hash::{FxHashMap, FxHashSet};

use super::ProgramBuilder;

/// Cell locals of a declaration and every function literal nested in it.
pub(crate) fn cells_of_decl(pb: &mut ProgramBuilder<'_>, decl: &FuncDecl) -> FxHashSet<LocalId> {
    let pkg = pb.pkg;
    let mut finder = CellFinder {
        pb,
        cells: FxHashSet::default(),
        owner: FxHashMap::default(),
        stack: vec![0],
        next_owner: 0,
    };
    if let Some(body) = &decl.body {
        if contains_defer(pkg, body) && decl.has_named_results() {
            finder.cells.extend(decl.results.iter().flatten().copied());
        }
    }
    walk_func_decl(&mut finder, pkg, decl);
    finder.cells
}

/// Cell locals of statements outside any function (package initializers).
pub(crate) fn cells_of_exprs(pb: &mut ProgramBuilder<'_>, exprs: &[ExprId]) -> FxHashSet<LocalId> {
    let pkg = pb.pkg;
    let mut finder = CellFinder {
        pb,
        cells: FxHashSet::default(),
        owner: FxHashMap::default(),
        stack: vec![0],
        next_owner: 0,
    };
    for &e in exprs {
        finder.visit_expr(pkg, e);
    }
    finder.cells
}

struct CellFinder<'a, 'p> {
    pb: &'a mut ProgramBuilder<'p>,
    cells: FxHashSet<LocalId>,
    /// Declaring function of each local seen so far.
    owner: FxHashMap<LocalId, u32>,
    stack: Vec<u32>,
    next_owner: u32,
}

impl CellFinder<'_, '_> {
    fn current(&self) -> u32 {
        self.stack.last().copied().unwrap_or(0)
    }

    fn expr_ty(&mut self, e: ExprId) -> Idx {
        let t = self.pb.pkg.expr(e).ty;
        self.pb.ty(t)
    }

    /// Mark the local an addressable expression is rooted in.
    fn mark_root(&mut self, pkg: &Package, e: ExprId) {
        match pkg.expr(e).kind {
            ExprKind::Local(l) => {
                self.cells.insert(l);
            }
            ExprKind::Field { x, .. } => {
                let t = self.expr_ty(x);
                if self.pb.pool.under_tag(t) != Tag::Pointer {
                    self.mark_root(pkg, x);
                }
            }
            ExprKind::Index { x, .. } => {
                let t = self.expr_ty(x);
                if self.pb.pool.under_tag(t) == Tag::Array {
                    self.mark_root(pkg, x);
                }
            }
            _ => {}
        }
    }

    /// Calling `method` on `recv` takes `recv`'s address.
    fn takes_address(&mut self, recv: ExprId, method: gossa_ir::Name) -> bool {
        let t = self.expr_ty(recv);
        let pool = &*self.pb.pool;
        if pool.tag(t) == Tag::Pointer || pool.is_interface(t) {
            return false;
        }
        self.pb.msets.lookup(pool, t, method).is_none()
    }
}

impl<'ast> Visitor<'ast> for CellFinder<'_, '_> {
    fn visit_local_def(&mut self, local: LocalId) {
        self.owner.insert(local, self.current());
        let t = self.pb.pkg.local(local).ty;
        let t = self.pb.ty(t);
        if matches!(self.pb.pool.under_tag(t), Tag::Struct | Tag::Array) {
            self.cells.insert(local);
        }
    }

    fn visit_func_lit(&mut self, pkg: &'ast Package, lit: &'ast FuncLit) {
        self.next_owner += 1;
        self.stack.push(self.next_owner);
        if contains_defer(pkg, &lit.body) {
            self.cells.extend(lit.results.iter().flatten().copied());
        }
        walk_func_lit(self, pkg, lit);
        self.stack.pop();
    }

    fn visit_expr(&mut self, pkg: &'ast Package, id: ExprId) {
        match &pkg.expr(id).kind {
            ExprKind::Local(l) => {
                if self.owner.get(l).is_some_and(|&o| o != self.current()) {
                    self.cells.insert(*l);
                }
            }
            ExprKind::AddrOf(x) => self.mark_root(pkg, *x),
            ExprKind::Slice { x, .. } => {
                let t = self.expr_ty(*x);
                if self.pb.pool.under_tag(t) == Tag::Array {
                    self.mark_root(pkg, *x);
                }
            }
            ExprKind::Method { recv, method } => {
                if self.takes_address(*recv, *method) {
                    self.mark_root(pkg, *recv);
                }
            }
            _ => {}
        }
        walk_expr(self, pkg, id);
    }
}

/// `body` contains a `defer` statement outside nested function literals.
pub(crate) fn contains_defer(pkg: &Package, body: &[StmtId]) -> bool {
    struct Finder(bool);
    impl<'ast> Visitor<'ast> for Finder {
        fn visit_stmt(&mut self, pkg: &'ast Package, id: StmtId) {
            if matches!(pkg.stmt(id).kind, StmtKind::Defer(_)) {
                self.0 = true;
            } else if !self.0 {
                walk_stmt(self, pkg, id);
            }
        }
        fn visit_func_lit(&mut self, _: &'ast Package, _: &'ast FuncLit) {}
    }
    let mut finder = Finder(false);
    for &s in body {
        finder.visit_stmt(pkg, s);
    }
    finder.0
}

/// Locals declared by one function body, not counting nested literals.
pub(crate) fn own_locals(
    pkg: &Package,
    declared: impl IntoIterator<Item = LocalId>,
    body: &[StmtId],
) -> FxHashSet<LocalId> {
    struct Collector(FxHashSet<LocalId>);
    impl<'ast> Visitor<'ast> for Collector {
        fn visit_local_def(&mut self, local: LocalId) {
            self.0.insert(local);
        }
        fn visit_func_lit(&mut self, _: &'ast Package, _: &'ast FuncLit) {}
    }
    let mut c = Collector(declared.into_iter().collect());
    for &s in body {
        c.visit_stmt(pkg, s);
    }
    c.0
}
