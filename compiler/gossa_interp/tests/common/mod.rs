//! Shared fixture for the end-to-end suites: build a package with
//! `AstBuilder`, lower it, and run it with captured output.

#![allow(dead_code, reason = "each suite uses a different subset")]

use gossa_ast::{AstBuilder, ExprId, Intrinsic, StmtId};
use gossa_interp::{buffer_handler, InterpreterBuilder, Outcome};
use gossa_ir::StringInterner;
use gossa_ssa::{build_program, BuildConfig};
use gossa_types::{Idx, Pool};

pub struct Fixture {
    pub pool: Pool,
    pub b: AstBuilder,
    /// `func()`
    pub void: Idx,
}

impl Fixture {
    pub fn new() -> Self {
        let interner = StringInterner::shared();
        let mut pool = Pool::with_interner(interner.clone());
        let void = pool.signature(&[], &[], false);
        Fixture {
            pool,
            b: AstBuilder::new("main", interner),
            void,
        }
    }

    /// `fmt.Println(args...)`
    pub fn println(&mut self, args: Vec<ExprId>) -> StmtId {
        let call = self
            .b
            .call_intrinsic(Intrinsic::FmtPrintln, args, Idx::EMPTY_TUPLE);
        self.b.expr_stmt(call)
    }

    /// `fmt.Print(args...)`
    pub fn print(&mut self, args: Vec<ExprId>) -> StmtId {
        let call = self
            .b
            .call_intrinsic(Intrinsic::FmtPrint, args, Idx::EMPTY_TUPLE);
        self.b.expr_stmt(call)
    }

    /// `fmt.Printf(format, args...)`
    pub fn printf(&mut self, format: &str, mut args: Vec<ExprId>) -> StmtId {
        let format = self.b.string(format);
        args.insert(0, format);
        let call = self
            .b
            .call_intrinsic(Intrinsic::FmtPrintf, args, Idx::EMPTY_TUPLE);
        self.b.expr_stmt(call)
    }

    /// `go func() { body }()`
    pub fn go_lit(&mut self, body: Vec<StmtId>) -> StmtId {
        let lit = self.b.func_lit(self.void, vec![], vec![], body);
        let call = self.b.call(lit, vec![], Idx::EMPTY_TUPLE);
        self.b.go(call)
    }

    /// `defer func() { body }()`
    pub fn defer_lit(&mut self, body: Vec<StmtId>) -> StmtId {
        let lit = self.b.func_lit(self.void, vec![], vec![], body);
        let call = self.b.call(lit, vec![], Idx::EMPTY_TUPLE);
        self.b.defer(call)
    }

    pub fn main(&mut self, body: Vec<StmtId>) {
        let main = self.b.declare_func("main", self.void);
        self.b.set_body(main, body);
    }

    pub fn run(self) -> Outcome {
        self.run_with(|b| b)
    }

    /// Build and run with captured output and a generous step budget.
    pub fn run_with(
        mut self,
        configure: impl FnOnce(InterpreterBuilder<'_>) -> InterpreterBuilder<'_>,
    ) -> Outcome {
        let pkg = self.b.finish();
        let config = BuildConfig::default().with_sanity_check(true);
        let out = build_program(&pkg, &mut self.pool, &config);
        assert!(!out.has_errors(), "{:?}", out.diagnostics);
        let builder = InterpreterBuilder::new(&out.program, &self.pool)
            .print_handler(buffer_handler())
            .step_budget(1_000_000);
        configure(builder).build().run()
    }
}
