//! Per-function lowering state and the function-level entry points.

use std::rc::Rc;

use gossa_ast::{ExprId, FuncDecl, FuncLit, Package, StmtId};
use gossa_diagnostic::unsupported;
use gossa_ir::{ConstValue, LocalId, Name, Span};
use gossa_types::Idx;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use super::escape::{cells_of_decl, cells_of_exprs, contains_defer, own_locals};
use super::func::{FuncBuilder, VarKey};
use super::ProgramBuilder;
use crate::ir::{BlockId, FnId, Instr, VarId};

/// Jump targets of an enclosing breakable statement.
#[derive(Copy, Clone, Debug)]
pub(super) struct Targets {
    pub brk: BlockId,
    /// `None` for switch and select.
    pub cont: Option<BlockId>,
}

/// Blocks associated with a label.
#[derive(Copy, Clone, Debug, Default)]
pub(super) struct LabelBlocks {
    pub goto: Option<BlockId>,
    pub brk: Option<BlockId>,
    pub cont: Option<BlockId>,
}

/// Lowers one function body.
pub(crate) struct FnLowerer<'a, 'p> {
    pub(super) pb: &'a mut ProgramBuilder<'p>,
    pub(super) b: FuncBuilder,
    pub(super) id: FnId,
    /// Locals declared by this function (not by nested literals).
    own: FxHashSet<LocalId>,
    /// Locals whose declaration has been lowered.
    declared: FxHashSet<LocalId>,
    /// Heap-cell locals of the whole declaration.
    cells: Rc<FxHashSet<LocalId>>,
    /// Captured locals in binding order, with the free variable holding
    /// each one's cell.
    free: Vec<(LocalId, VarId)>,
    params: Vec<VarId>,
    result_types: Vec<Idx>,
    named_results: Vec<Option<LocalId>>,
    /// Result slots written before deferred calls run; set when the body
    /// contains `defer`.
    result_cells: Vec<VarId>,
    pub(super) has_defer: bool,
    pub(super) targets: Vec<Targets>,
    pub(super) fallthrough: Option<BlockId>,
    pub(super) labels: FxHashMap<Name, LabelBlocks>,
    /// Label of the statement about to be lowered, claimed by loops,
    /// switches and selects.
    pub(super) pending_label: Option<Name>,
}

impl<'a, 'p> FnLowerer<'a, 'p> {
    fn new(
        pb: &'a mut ProgramBuilder<'p>,
        id: FnId,
        span: Span,
        cells: Rc<FxHashSet<LocalId>>,
        own: FxHashSet<LocalId>,
    ) -> Self {
        FnLowerer {
            pb,
            b: FuncBuilder::new(span),
            id,
            own,
            declared: FxHashSet::default(),
            cells,
            free: Vec::new(),
            params: Vec::new(),
            result_types: Vec::new(),
            named_results: Vec::new(),
            result_cells: Vec::new(),
            has_defer: false,
            targets: Vec::new(),
            fallthrough: None,
            labels: FxHashMap::default(),
            pending_label: None,
        }
    }

    /// Build the body of declaration `d` into function `id`.
    pub(crate) fn lower_decl(pb: &'a mut ProgramBuilder<'p>, id: FnId, d: &'p FuncDecl) {
        let Some(body) = &d.body else {
            return;
        };
        pb.check_branches(body);
        let cells = Rc::new(cells_of_decl(pb, d));
        let recv_local = d.recv.and_then(|r| r.local);
        let declared = recv_local
            .into_iter()
            .chain(d.params.iter().chain(&d.results).flatten().copied());
        let own = own_locals(pb.pkg, declared, body);

        let mut lw = FnLowerer::new(pb, id, d.span, cells, own);
        let recv = d.recv.map(|r| (r.local, lw.pb.ty(r.ty)));
        lw.lower_body(recv, &d.params, &d.results, body);
    }

    /// Build the synthetic package initializer: global initializers in
    /// order, then the user `init` functions.
    pub(crate) fn lower_package_init(pb: &'a mut ProgramBuilder<'p>, id: FnId, user_inits: &[FnId]) {
        let pkg = pb.pkg;
        let exprs: Vec<ExprId> = pkg.var_inits.iter().flat_map(|v| v.rhs.iter().copied()).collect();
        let cells = Rc::new(cells_of_exprs(pb, &exprs));
        let mut lw = FnLowerer::new(pb, id, Span::DUMMY, cells, FxHashSet::default());

        for init in &pkg.var_inits {
            let targets: Vec<Option<(VarId, Idx)>> = init
                .lhs
                .iter()
                .map(|g| {
                    g.map(|g| {
                        let ty = pkg.global(g).ty;
                        let ptr = lw.pb.pool.pointer(ty);
                        let addr = lw.b.emit(ptr, |dst| Instr::Global {
                            dst,
                            ty: ptr,
                            global: g,
                        });
                        (addr, ty)
                    })
                })
                .collect();
            let types: Vec<Idx> = targets.iter().map(|t| t.map_or(Idx::NONE, |(_, ty)| ty)).collect();
            let values = lw.rhs_values(&init.rhs, &types);
            for (target, value) in targets.into_iter().zip(values) {
                if let Some((addr, _)) = target {
                    lw.b.push(Instr::Store { addr, value });
                }
            }
        }
        for &f in user_inits {
            lw.b.emit(Idx::EMPTY_TUPLE, |dst| Instr::Call {
                dst,
                ty: Idx::EMPTY_TUPLE,
                callee: crate::ir::Callee::Static(f),
                args: Vec::new(),
            });
        }
        lw.b.ret(Vec::new());
        lw.finish();
    }

    /// Build a function literal nested in this function and produce its
    /// value: a plain function value, or a closure over captured cells.
    pub(super) fn func_lit(&mut self, lit: &'p FuncLit, span: Span) -> VarId {
        self.pb.check_branches(&lit.body);
        let pkg = self.pkg();
        let sig = self.pb.ty(lit.sig);
        let id = self.pb.closure_fn(self.id, sig, span);
        let declared = lit.params.iter().chain(&lit.results).flatten().copied();
        let own = own_locals(pkg, declared, &lit.body);
        let free = {
            let inner = FnLowerer::new(&mut *self.pb, id, span, Rc::clone(&self.cells), own);
            inner.lower_body(None, &lit.params, &lit.results, &lit.body)
        };
        if free.is_empty() {
            return self.b.emit(sig, |dst| Instr::FuncValue { dst, ty: sig, func: id });
        }
        let bindings = free.into_iter().map(|l| self.local_addr(l)).collect();
        self.b.emit(sig, |dst| Instr::MakeClosure {
            dst,
            ty: sig,
            func: id,
            bindings,
        })
    }

    /// Lower a complete body: receiver, parameters, results, statements.
    /// Returns the captured locals in binding order.
    fn lower_body(
        mut self,
        recv: Option<(Option<LocalId>, Idx)>,
        params: &[Option<LocalId>],
        results: &[Option<LocalId>],
        body: &'p [StmtId],
    ) -> Vec<LocalId> {
        let pkg = self.pkg();
        let sig = self.pb.function(self.id).sig;
        self.has_defer = contains_defer(pkg, body);

        if let Some((local, ty)) = recv {
            self.bind_param(local, ty);
        }
        let param_types = self.pb.pool.params(sig);
        for (i, &ty) in param_types.iter().enumerate() {
            self.bind_param(params.get(i).copied().flatten(), ty);
        }

        self.result_types = self.pb.pool.results(sig);
        self.named_results = results.to_vec();
        for l in results.iter().flatten() {
            self.define_local(*l, None);
        }
        if self.has_defer {
            let types = self.result_types.clone();
            for (i, ty) in types.into_iter().enumerate() {
                let cell = match self.named_results.get(i).copied().flatten() {
                    Some(l) => self.local_addr(l),
                    None => self.alloc(ty),
                };
                self.result_cells.push(cell);
            }
        }

        self.stmts(body);
        self.implicit_return();
        self.finish()
    }

    fn bind_param(&mut self, local: Option<LocalId>, ty: Idx) {
        let v = self.b.fresh_var(ty);
        self.params.push(v);
        if let Some(l) = local {
            self.define_local(l, Some(v));
        }
    }

    /// Falling off the end of the body.
    fn implicit_return(&mut self) {
        if self.b.is_terminated() {
            return;
        }
        let named = self.named_results.iter().any(Option::is_some);
        if self.result_types.is_empty() || named {
            let values = self.current_results();
            self.emit_return(values);
        } else {
            self.b.unreachable();
        }
    }

    /// Current values of the named results (zero for blank ones).
    fn current_results(&mut self) -> Vec<VarId> {
        let slots: Vec<(Option<LocalId>, Idx)> = self
            .named_results
            .iter()
            .copied()
            .zip(self.result_types.iter().copied())
            .collect();
        slots
            .into_iter()
            .map(|(l, ty)| match l {
                Some(l) => self.read_local(l),
                None => self.zero(ty),
            })
            .collect()
    }

    /// `return values...`
    pub(super) fn return_stmt(&mut self, values: &'p [ExprId]) {
        let values = if values.is_empty() {
            self.current_results()
        } else {
            let types = self.result_types.clone();
            self.rhs_values(values, &types)
        };
        self.emit_return(values);
        self.b.start_dead_block();
    }

    /// Return `values` (already converted to the result types), running
    /// deferred calls first when the body has any.
    pub(super) fn emit_return(&mut self, values: Vec<VarId>) {
        if !self.has_defer {
            self.b.ret(values);
            return;
        }
        let cells = self.result_cells.clone();
        for (&addr, value) in cells.iter().zip(values) {
            self.b.push(Instr::Store { addr, value });
        }
        self.b.push(Instr::RunDefers);
        let loaded = self.load_results();
        self.b.ret(loaded);
    }

    fn load_results(&mut self) -> Vec<VarId> {
        let cells = self.result_cells.clone();
        let types = self.result_types.clone();
        cells
            .into_iter()
            .zip(types)
            .map(|(addr, ty)| self.load(addr, ty))
            .collect()
    }

    fn finish(mut self) -> Vec<LocalId> {
        let mut roots = Vec::new();
        let recover = if self.has_defer {
            let block = self.b.new_block("recover");
            self.b.position_at(block);
            let values = self.load_results();
            self.b.ret(values);
            roots.push(block);
            Some(block)
        } else {
            None
        };
        let body = self.b.finish(&roots);
        let f = self.pb.function_mut(self.id);
        f.params = self.params;
        f.free_vars = self.free.iter().map(|&(_, v)| v).collect();
        f.blocks = body.blocks;
        f.var_types = body.var_types;
        f.recover = recover;
        self.free.into_iter().map(|(l, _)| l).collect()
    }

    // Shared helpers

    #[inline]
    pub(super) fn pkg(&self) -> &'p Package {
        self.pb.pkg
    }

    pub(super) fn pointer_to(&mut self, ty: Idx) -> Idx {
        self.pb.pool.pointer(ty)
    }

    pub(super) fn zero(&mut self, ty: Idx) -> VarId {
        self.b.emit_const(ty, ConstValue::Nil)
    }

    pub(super) fn alloc(&mut self, elem: Idx) -> VarId {
        let ptr = self.pointer_to(elem);
        self.b.emit(ptr, |dst| Instr::Alloc { dst, ty: ptr, elem })
    }

    pub(super) fn load(&mut self, addr: VarId, ty: Idx) -> VarId {
        self.b.emit(ty, |dst| Instr::Load { dst, ty, addr })
    }

    pub(super) fn store(&mut self, addr: VarId, value: VarId) {
        self.b.push(Instr::Store { addr, value });
    }

    /// Report an unsupported construct and make it panic when reached.
    /// Returns a placeholder of type `ty` in a fresh dead block.
    pub(super) fn unsupported(&mut self, span: Span, what: &str, ty: Idx) -> VarId {
        self.pb.report(unsupported(span, what));
        let msg = self
            .b
            .emit_const(Idx::STRING, ConstValue::string(format!("unsupported: {what}")));
        let boxed = self.b.emit(Idx::ANY, |dst| Instr::MakeInterface {
            dst,
            ty: Idx::ANY,
            x: msg,
        });
        self.b.panic(boxed);
        self.b.start_dead_block();
        self.zero(ty)
    }

    // Locals

    fn is_cell(&self, l: LocalId) -> bool {
        self.cells.contains(&l)
    }

    pub(super) fn local_ty(&mut self, l: LocalId) -> Idx {
        let t = self.pkg().local(l).ty;
        self.pb.ty(t)
    }

    /// Bring `l` into scope with `value` (zero when `None`). A cell local
    /// gets a fresh cell on every definition.
    pub(super) fn define_local(&mut self, l: LocalId, value: Option<VarId>) {
        self.declared.insert(l);
        let ty = self.local_ty(l);
        if self.is_cell(l) {
            let addr = self.alloc(ty);
            if let Some(v) = value {
                self.store(addr, v);
            }
            self.b.write_var(VarKey::Local(l), addr);
        } else {
            let v = match value {
                Some(v) => v,
                None => self.zero(ty),
            };
            self.b.write_var(VarKey::Local(l), v);
        }
    }

    /// `l := value`: a redeclaration in the same scope assigns.
    pub(super) fn declare(&mut self, l: LocalId, value: Option<VarId>) {
        if !self.declared.contains(&l) {
            self.define_local(l, value);
            return;
        }
        let v = match value {
            Some(v) => v,
            None => {
                let ty = self.local_ty(l);
                self.zero(ty)
            }
        };
        self.assign_local(l, v);
    }

    pub(super) fn read_local(&mut self, l: LocalId) -> VarId {
        let ty = self.local_ty(l);
        if self.own.contains(&l) && !self.is_cell(l) {
            return self.b.read_var(VarKey::Local(l), ty);
        }
        let addr = self.local_addr(l);
        self.load(addr, ty)
    }

    pub(super) fn assign_local(&mut self, l: LocalId, value: VarId) {
        if self.own.contains(&l) && !self.is_cell(l) {
            self.b.write_var(VarKey::Local(l), value);
            return;
        }
        let addr = self.local_addr(l);
        self.store(addr, value);
    }

    /// Address of a cell local (own or captured).
    pub(super) fn local_addr(&mut self, l: LocalId) -> VarId {
        let ty = self.local_ty(l);
        let ptr = self.pointer_to(ty);
        if !self.own.contains(&l) {
            if let Some(&(_, v)) = self.free.iter().find(|(f, _)| *f == l) {
                return v;
            }
            let v = self.b.fresh_var(ptr);
            self.free.push((l, v));
            return v;
        }
        if self.is_cell(l) {
            return self.b.read_var(VarKey::Local(l), ptr);
        }
        // Escape analysis missed an address use; fall back to a copy.
        warn!(local = l.raw(), "address of register local, copying into a cell");
        let v = self.b.read_var(VarKey::Local(l), ty);
        let addr = self.alloc(ty);
        self.store(addr, v);
        addr
    }

    /// Per-iteration copy of the cell locals in `locals`: each gets a fresh
    /// cell holding its current value.
    pub(super) fn renew_cells(&mut self, locals: &[LocalId]) {
        for &l in locals {
            if self.own.contains(&l) && self.is_cell(l) {
                let v = self.read_local(l);
                self.define_local(l, Some(v));
            }
        }
    }

    // Labels

    pub(super) fn label_blocks(&mut self, label: Name) -> &mut LabelBlocks {
        self.labels.entry(label).or_default()
    }

    /// The block a `goto label` jumps to, created on first use.
    pub(super) fn label_target(&mut self, label: Name) -> BlockId {
        if let Some(b) = self.labels.get(&label).and_then(|l| l.goto) {
            return b;
        }
        let block = self.b.new_block("label");
        self.label_blocks(label).goto = Some(block);
        block
    }
}
