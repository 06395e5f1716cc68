//! SSA form for Go packages.
//!
//! [`build_program`] lowers a typed [`gossa_ast::Package`] into a
//! [`Program`] of SSA [`Function`]s:
//!
//! - every declaration with a body, plus the synthetic package initializer
//! - function literals as closures over heap cells
//! - generic functions and methods once per distinct type-argument list,
//!   on demand
//!
//! Building never aborts. Problems (bad labels, unsupported constructs,
//! sanity-check failures) come back as diagnostics next to a complete
//! program in which the offending construct panics when executed.
//!
//! # Modules
//!
//! - [`ir`]: the IR itself
//! - `build`: AST → SSA lowering with on-the-fly φ placement
//! - [`printer`]: textual listings
//! - [`sanity`]: structural checks over built functions

mod build;
pub mod ir;
pub mod printer;
pub mod sanity;

use gossa_cfg::{DefaultOracle, MayReturn};

pub use build::{build_program, BuildOutput};
pub use ir::{
    Block, BlockId, BoundTarget, Callee, FnId, Function, GlobalInfo, Instr, MethodImpl, Program,
    SelectDir, SelectState, Synthetic, Terminator, VarId,
};
pub use printer::{format_function, format_instr, format_program};

/// Builder options.
pub struct BuildConfig {
    /// Run [`sanity::check`] over every built function.
    pub sanity_check: bool,
    /// Decides which calls end their block.
    pub oracle: Box<dyn MayReturn>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            sanity_check: cfg!(debug_assertions),
            oracle: Box::new(DefaultOracle),
        }
    }
}

impl BuildConfig {
    #[must_use]
    pub fn with_sanity_check(mut self, on: bool) -> Self {
        self.sanity_check = on;
        self
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: impl MayReturn + 'static) -> Self {
        self.oracle = Box::new(oracle);
        self
    }
}
