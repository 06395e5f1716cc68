//! Construction helpers.
//!
//! Front ends and tests build a [`Package`] through [`AstBuilder`]. Every
//! node gets a distinct one-byte span in allocation order, so diagnostics
//! sort deterministically even without source text.

use gossa_ir::{
    BinaryOp, ConstValue, FuncId, GlobalId, LocalId, Name, SharedInterner, Span, UnaryOp,
};
use gossa_types::Idx;

use crate::{
    Builtin, CaseClause, CommClause, CompositeElem, Expr, ExprId, ExprKind, FuncDecl, FuncLit,
    GlobalDecl, Intrinsic, LocalDecl, Package, RangeTarget, Receiver, Stmt, StmtId, StmtKind,
    TypeClause, VarInit,
};

/// Incremental [`Package`] builder.
pub struct AstBuilder {
    pkg: Package,
    interner: SharedInterner,
    pos: u32,
}

impl AstBuilder {
    pub fn new(package: &str, interner: SharedInterner) -> Self {
        let name = interner.intern(package);
        AstBuilder {
            pkg: Package {
                name,
                ..Package::default()
            },
            interner,
            pos: 0,
        }
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// The package built so far.
    pub fn package(&self) -> &Package {
        &self.pkg
    }

    pub fn finish(self) -> Package {
        self.pkg
    }

    fn next_span(&mut self) -> Span {
        let span = Span::new(self.pos, self.pos + 1);
        self.pos += 1;
        span
    }

    // Declarations

    pub fn local(&mut self, name: &str, ty: Idx) -> LocalId {
        let id = LocalId::new(self.pkg.locals.len() as u32);
        let span = self.next_span();
        let name = self.name(name);
        self.pkg.locals.push(LocalDecl { name, ty, span });
        id
    }

    pub fn global(&mut self, name: &str, ty: Idx) -> GlobalId {
        let id = GlobalId::new(self.pkg.globals.len() as u32);
        let span = self.next_span();
        let name = self.name(name);
        self.pkg.globals.push(GlobalDecl { name, ty, span });
        id
    }

    /// Declare a function without parameters or body; fill them in later
    /// with [`set_params`](Self::set_params) / [`set_body`](Self::set_body)
    /// so bodies can refer to the function recursively.
    pub fn declare_func(&mut self, name: &str, sig: Idx) -> FuncId {
        let id = FuncId::new(self.pkg.funcs.len() as u32);
        let span = self.next_span();
        let name = self.name(name);
        self.pkg.funcs.push(FuncDecl {
            id,
            name,
            recv: None,
            type_params: Vec::new(),
            sig,
            params: Vec::new(),
            results: Vec::new(),
            body: None,
            span,
        });
        if self.interner.lookup(name) == "main" {
            self.pkg.main = Some(id);
        }
        id
    }

    pub fn set_params(
        &mut self,
        func: FuncId,
        params: Vec<Option<LocalId>>,
        results: Vec<Option<LocalId>>,
    ) {
        let decl = &mut self.pkg.funcs[func.index()];
        decl.params = params;
        decl.results = results;
    }

    pub fn set_body(&mut self, func: FuncId, body: Vec<StmtId>) {
        self.pkg.funcs[func.index()].body = Some(body);
    }

    pub fn set_recv(&mut self, func: FuncId, local: Option<LocalId>, ty: Idx) {
        self.pkg.funcs[func.index()].recv = Some(Receiver { local, ty });
        // Methods never act as the program entry point.
        if self.pkg.main == Some(func) {
            self.pkg.main = None;
        }
    }

    pub fn set_type_params(&mut self, func: FuncId, params: Vec<Idx>) {
        self.pkg.funcs[func.index()].type_params = params;
    }

    /// Declare a complete function in one step.
    pub fn func(
        &mut self,
        name: &str,
        sig: Idx,
        params: Vec<Option<LocalId>>,
        results: Vec<Option<LocalId>>,
        body: Vec<StmtId>,
    ) -> FuncId {
        let id = self.declare_func(name, sig);
        self.set_params(id, params, results);
        self.set_body(id, body);
        id
    }

    pub fn var_init(&mut self, lhs: Vec<Option<GlobalId>>, rhs: Vec<ExprId>) {
        self.pkg.var_inits.push(VarInit { lhs, rhs });
    }

    pub fn add_init(&mut self, func: FuncId) {
        self.pkg.inits.push(func);
    }

    // Expressions

    pub fn expr(&mut self, kind: ExprKind, ty: Idx) -> ExprId {
        let id = ExprId::new(self.pkg.exprs.len() as u32);
        let span = self.next_span();
        self.pkg.exprs.push(Expr::new(kind, ty, span));
        id
    }

    pub fn ty_of(&self, e: ExprId) -> Idx {
        self.pkg.expr(e).ty
    }

    pub fn constant(&mut self, value: ConstValue, ty: Idx) -> ExprId {
        self.expr(ExprKind::Const(value), ty)
    }

    pub fn int(&mut self, v: i64) -> ExprId {
        self.constant(ConstValue::Int(i128::from(v)), Idx::INT)
    }

    pub fn typed_int(&mut self, v: i64, ty: Idx) -> ExprId {
        self.constant(ConstValue::Int(i128::from(v)), ty)
    }

    pub fn float(&mut self, v: f64) -> ExprId {
        self.constant(ConstValue::Float(v), Idx::FLOAT64)
    }

    pub fn string(&mut self, s: &str) -> ExprId {
        self.constant(ConstValue::string(s), Idx::STRING)
    }

    pub fn bool(&mut self, b: bool) -> ExprId {
        self.constant(ConstValue::Bool(b), Idx::BOOL)
    }

    /// Typed `nil` of a pointer, slice, map, chan, func or interface type.
    pub fn nil(&mut self, ty: Idx) -> ExprId {
        self.constant(ConstValue::Nil, ty)
    }

    pub fn local_ref(&mut self, local: LocalId) -> ExprId {
        let ty = self.pkg.local(local).ty;
        self.expr(ExprKind::Local(local), ty)
    }

    pub fn global_ref(&mut self, global: GlobalId) -> ExprId {
        let ty = self.pkg.global(global).ty;
        self.expr(ExprKind::Global(global), ty)
    }

    pub fn func_ref(&mut self, func: FuncId) -> ExprId {
        let ty = self.pkg.func(func).sig;
        self.expr(ExprKind::Func(func), ty)
    }

    /// `f[targs]` with the instantiated signature.
    pub fn instance(&mut self, func: FuncId, targs: Vec<Idx>, sig: Idx) -> ExprId {
        self.expr(ExprKind::Instance { func, targs }, sig)
    }

    pub fn builtin(&mut self, b: Builtin) -> ExprId {
        self.expr(ExprKind::Builtin(b), Idx::INVALID)
    }

    pub fn intrinsic(&mut self, i: Intrinsic) -> ExprId {
        self.expr(ExprKind::Intrinsic(i), Idx::INVALID)
    }

    pub fn blank(&mut self) -> ExprId {
        self.expr(ExprKind::Blank, Idx::INVALID)
    }

    pub fn call(&mut self, func: ExprId, args: Vec<ExprId>, ty: Idx) -> ExprId {
        self.expr(
            ExprKind::Call {
                func,
                args,
                ellipsis: false,
            },
            ty,
        )
    }

    /// `f(args...)`
    pub fn call_spread(&mut self, func: ExprId, args: Vec<ExprId>, ty: Idx) -> ExprId {
        self.expr(
            ExprKind::Call {
                func,
                args,
                ellipsis: true,
            },
            ty,
        )
    }

    /// Call of a builtin.
    pub fn call_builtin(&mut self, b: Builtin, args: Vec<ExprId>, ty: Idx) -> ExprId {
        let f = self.builtin(b);
        self.call(f, args, ty)
    }

    /// Call of an intrinsic.
    pub fn call_intrinsic(&mut self, i: Intrinsic, args: Vec<ExprId>, ty: Idx) -> ExprId {
        let f = self.intrinsic(i);
        self.call(f, args, ty)
    }

    /// Call of a declared function by id; `ty` is the result type.
    pub fn call_func(&mut self, func: FuncId, args: Vec<ExprId>, ty: Idx) -> ExprId {
        let f = self.func_ref(func);
        self.call(f, args, ty)
    }

    pub fn binary(&mut self, op: BinaryOp, x: ExprId, y: ExprId, ty: Idx) -> ExprId {
        self.expr(ExprKind::Binary { op, x, y }, ty)
    }

    /// Comparison or logical operator; the result is `bool`.
    pub fn cmp(&mut self, op: BinaryOp, x: ExprId, y: ExprId) -> ExprId {
        self.binary(op, x, y, Idx::BOOL)
    }

    /// Operator whose result has the left operand's type.
    pub fn arith(&mut self, op: BinaryOp, x: ExprId, y: ExprId) -> ExprId {
        let ty = self.ty_of(x);
        self.binary(op, x, y, ty)
    }

    pub fn unary(&mut self, op: UnaryOp, x: ExprId) -> ExprId {
        let ty = self.ty_of(x);
        self.expr(ExprKind::Unary { op, x }, ty)
    }

    pub fn field(&mut self, x: ExprId, path: Vec<u32>, ty: Idx) -> ExprId {
        self.expr(ExprKind::Field { x, path }, ty)
    }

    pub fn method(&mut self, recv: ExprId, method: &str, sig: Idx) -> ExprId {
        let method = self.name(method);
        self.expr(ExprKind::Method { recv, method }, sig)
    }

    pub fn index(&mut self, x: ExprId, index: ExprId, ty: Idx) -> ExprId {
        self.expr(
            ExprKind::Index {
                x,
                index,
                comma_ok: false,
            },
            ty,
        )
    }

    /// `v, ok := m[k]`; `ty` is the `(V, bool)` tuple.
    pub fn index_ok(&mut self, x: ExprId, index: ExprId, ty: Idx) -> ExprId {
        self.expr(
            ExprKind::Index {
                x,
                index,
                comma_ok: true,
            },
            ty,
        )
    }

    pub fn slice(
        &mut self,
        x: ExprId,
        low: Option<ExprId>,
        high: Option<ExprId>,
        max: Option<ExprId>,
        ty: Idx,
    ) -> ExprId {
        self.expr(ExprKind::Slice { x, low, high, max }, ty)
    }

    pub fn type_assert(&mut self, x: ExprId, ty: Idx) -> ExprId {
        self.expr(
            ExprKind::TypeAssert {
                x,
                ty,
                comma_ok: false,
            },
            ty,
        )
    }

    /// `v, ok := x.(T)`; `tuple` is the `(T, bool)` tuple.
    pub fn type_assert_ok(&mut self, x: ExprId, ty: Idx, tuple: Idx) -> ExprId {
        self.expr(
            ExprKind::TypeAssert {
                x,
                ty,
                comma_ok: true,
            },
            tuple,
        )
    }

    pub fn deref(&mut self, x: ExprId, ty: Idx) -> ExprId {
        self.expr(ExprKind::Deref(x), ty)
    }

    pub fn addr_of(&mut self, x: ExprId, ty: Idx) -> ExprId {
        self.expr(ExprKind::AddrOf(x), ty)
    }

    pub fn recv(&mut self, ch: ExprId, ty: Idx) -> ExprId {
        self.expr(
            ExprKind::Recv {
                ch,
                comma_ok: false,
            },
            ty,
        )
    }

    pub fn recv_ok(&mut self, ch: ExprId, tuple: Idx) -> ExprId {
        self.expr(ExprKind::Recv { ch, comma_ok: true }, tuple)
    }

    pub fn convert(&mut self, x: ExprId, ty: Idx) -> ExprId {
        self.expr(ExprKind::Convert(x), ty)
    }

    pub fn composite(&mut self, ty: Idx, elems: Vec<CompositeElem>) -> ExprId {
        self.expr(ExprKind::Composite { elems }, ty)
    }

    /// Composite literal with positional elements.
    pub fn composite_values(&mut self, ty: Idx, values: Vec<ExprId>) -> ExprId {
        let elems = values
            .into_iter()
            .map(|value| CompositeElem { key: None, value })
            .collect();
        self.composite(ty, elems)
    }

    pub fn func_lit(
        &mut self,
        sig: Idx,
        params: Vec<Option<LocalId>>,
        results: Vec<Option<LocalId>>,
        body: Vec<StmtId>,
    ) -> ExprId {
        self.expr(
            ExprKind::FuncLit(Box::new(FuncLit {
                sig,
                params,
                results,
                body,
            })),
            sig,
        )
    }

    // Statements

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        let id = StmtId::new(self.pkg.stmts.len() as u32);
        let span = self.next_span();
        self.pkg.stmts.push(Stmt::new(kind, span));
        id
    }

    pub fn empty(&mut self) -> StmtId {
        self.stmt(StmtKind::Empty)
    }

    pub fn expr_stmt(&mut self, e: ExprId) -> StmtId {
        self.stmt(StmtKind::Expr(e))
    }

    pub fn define(&mut self, lhs: Vec<Option<LocalId>>, rhs: Vec<ExprId>) -> StmtId {
        self.stmt(StmtKind::Define { lhs, rhs })
    }

    /// `x := e`
    pub fn define1(&mut self, local: LocalId, rhs: ExprId) -> StmtId {
        self.define(vec![Some(local)], vec![rhs])
    }

    pub fn assign(&mut self, lhs: Vec<ExprId>, rhs: Vec<ExprId>) -> StmtId {
        self.stmt(StmtKind::Assign { lhs, rhs })
    }

    /// `x = e` for a local.
    pub fn assign_local(&mut self, local: LocalId, rhs: ExprId) -> StmtId {
        let lhs = self.local_ref(local);
        self.assign(vec![lhs], vec![rhs])
    }

    pub fn op_assign(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> StmtId {
        self.stmt(StmtKind::OpAssign { op, lhs, rhs })
    }

    pub fn inc(&mut self, x: ExprId) -> StmtId {
        self.stmt(StmtKind::IncDec { x, inc: true })
    }

    pub fn dec(&mut self, x: ExprId) -> StmtId {
        self.stmt(StmtKind::IncDec { x, inc: false })
    }

    pub fn send(&mut self, ch: ExprId, value: ExprId) -> StmtId {
        self.stmt(StmtKind::Send { ch, value })
    }

    pub fn go(&mut self, call: ExprId) -> StmtId {
        self.stmt(StmtKind::Go(call))
    }

    pub fn defer(&mut self, call: ExprId) -> StmtId {
        self.stmt(StmtKind::Defer(call))
    }

    pub fn ret(&mut self, values: Vec<ExprId>) -> StmtId {
        self.stmt(StmtKind::Return(values))
    }

    pub fn brk(&mut self, label: Option<&str>) -> StmtId {
        let label = label.map(|l| self.name(l));
        self.stmt(StmtKind::Break(label))
    }

    pub fn cont(&mut self, label: Option<&str>) -> StmtId {
        let label = label.map(|l| self.name(l));
        self.stmt(StmtKind::Continue(label))
    }

    pub fn goto(&mut self, label: &str) -> StmtId {
        let label = self.name(label);
        self.stmt(StmtKind::Goto(label))
    }

    pub fn fallthrough(&mut self) -> StmtId {
        self.stmt(StmtKind::Fallthrough)
    }

    pub fn block(&mut self, stmts: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::Block(stmts))
    }

    pub fn if_(
        &mut self,
        init: Option<StmtId>,
        cond: ExprId,
        then: Vec<StmtId>,
        els: Option<StmtId>,
    ) -> StmtId {
        self.stmt(StmtKind::If {
            init,
            cond,
            then,
            els,
        })
    }

    pub fn for_(
        &mut self,
        init: Option<StmtId>,
        cond: Option<ExprId>,
        post: Option<StmtId>,
        body: Vec<StmtId>,
    ) -> StmtId {
        self.stmt(StmtKind::For {
            init,
            cond,
            post,
            body,
        })
    }

    pub fn range(
        &mut self,
        key: Option<RangeTarget>,
        value: Option<RangeTarget>,
        x: ExprId,
        body: Vec<StmtId>,
    ) -> StmtId {
        self.stmt(StmtKind::Range {
            key,
            value,
            x,
            body,
        })
    }

    pub fn case(&mut self, exprs: Vec<ExprId>, body: Vec<StmtId>) -> CaseClause {
        let span = self.next_span();
        CaseClause { exprs, body, span }
    }

    pub fn switch(
        &mut self,
        init: Option<StmtId>,
        tag: Option<ExprId>,
        clauses: Vec<CaseClause>,
    ) -> StmtId {
        self.stmt(StmtKind::Switch { init, tag, clauses })
    }

    pub fn type_case(
        &mut self,
        types: Vec<Option<Idx>>,
        local: Option<LocalId>,
        body: Vec<StmtId>,
    ) -> TypeClause {
        let span = self.next_span();
        TypeClause {
            types,
            local,
            body,
            span,
        }
    }

    pub fn type_switch(
        &mut self,
        init: Option<StmtId>,
        x: ExprId,
        clauses: Vec<TypeClause>,
    ) -> StmtId {
        self.stmt(StmtKind::TypeSwitch { init, x, clauses })
    }

    pub fn comm(&mut self, comm: Option<StmtId>, body: Vec<StmtId>) -> CommClause {
        let span = self.next_span();
        CommClause { comm, body, span }
    }

    pub fn select(&mut self, clauses: Vec<CommClause>) -> StmtId {
        self.stmt(StmtKind::Select { clauses })
    }

    pub fn labeled(&mut self, label: &str, stmt: StmtId) -> StmtId {
        let label = self.name(label);
        self.stmt(StmtKind::Labeled { label, stmt })
    }
}
