//! `InterpreterBuilder` for creating executions with various configurations.

use gossa_ssa::Program;
use gossa_types::Pool;

use super::{Execution, InterpreterConfig};
use crate::print_handler::{stdout_handler, SharedPrintHandler};

/// Builder for [`Execution`]s.
///
/// Output goes to stdout unless a print handler is given; tests pass
/// [`buffer_handler`](crate::buffer_handler) and read the output back from
/// the [`Outcome`](super::Outcome).
pub struct InterpreterBuilder<'p> {
    program: &'p Program,
    pool: &'p Pool,
    config: InterpreterConfig,
    print_handler: Option<SharedPrintHandler>,
}

impl<'p> InterpreterBuilder<'p> {
    pub fn new(program: &'p Program, pool: &'p Pool) -> Self {
        Self {
            program,
            pool,
            config: InterpreterConfig::default(),
            print_handler: None,
        }
    }

    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// Log every executed instruction at `trace` level.
    #[must_use]
    pub fn trace(mut self, on: bool) -> Self {
        self.config.trace = on;
        self
    }

    /// Frame depth at which a goroutine stops with a stack overflow.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Seed for the choices `select` makes among ready cases. Runs with
    /// the same seed make the same choices.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    #[must_use]
    pub fn step_budget(mut self, steps: u64) -> Self {
        self.config.step_budget = Some(steps);
        self
    }

    #[must_use]
    pub fn config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Execution<'p> {
        let print = self.print_handler.unwrap_or_else(stdout_handler);
        Execution::new(self.program, self.pool, self.config, print)
    }
}
