//! The "may this call return" oracle.

use gossa_ast::{ExprId, ExprKind, Package};

/// Decides whether a call expression may return normally.
///
/// Answering `false` for a call that does return only makes the graph
/// pessimistic about the following statements; answering `true` is always
/// safe.
pub trait MayReturn {
    fn may_return(&self, pkg: &Package, call: ExprId) -> bool;
}

impl<F> MayReturn for F
where
    F: Fn(&Package, ExprId) -> bool,
{
    fn may_return(&self, pkg: &Package, call: ExprId) -> bool {
        self(pkg, call)
    }
}

/// Treats `panic(...)` and `os.Exit(...)` as no-return, every other call as
/// returning.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultOracle;

impl MayReturn for DefaultOracle {
    fn may_return(&self, pkg: &Package, call: ExprId) -> bool {
        let ExprKind::Call { func, .. } = pkg.expr(call).kind else {
            return true;
        };
        match pkg.expr(func).kind {
            ExprKind::Builtin(b) => !b.is_no_return(),
            ExprKind::Intrinsic(i) => !i.is_no_return(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use gossa_ast::{AstBuilder, Builtin, ExprId, Intrinsic, Package};
    use gossa_ir::StringInterner;
    use gossa_types::Idx;

    use super::{DefaultOracle, MayReturn};

    #[test]
    fn default_oracle_knows_panic_and_exit() {
        let mut b = AstBuilder::new("main", StringInterner::shared());
        let msg = b.string("boom");
        let panic = b.call_builtin(Builtin::Panic, vec![msg], Idx::EMPTY_TUPLE);
        let one = b.int(1);
        let exit = b.call_intrinsic(Intrinsic::OsExit, vec![one], Idx::EMPTY_TUPLE);
        let s = b.string("x");
        let print = b.call_intrinsic(Intrinsic::FmtPrintln, vec![s], Idx::EMPTY_TUPLE);
        let pkg = b.finish();

        assert!(!DefaultOracle.may_return(&pkg, panic));
        assert!(!DefaultOracle.may_return(&pkg, exit));
        assert!(DefaultOracle.may_return(&pkg, print));
    }

    #[test]
    fn closures_are_oracles() {
        let pkg = Package::default();
        let never = |_: &Package, _: ExprId| false;
        assert!(!never.may_return(&pkg, ExprId::new(0)));
    }
}
