//! SSA interpreter.
//!
//! An [`Execution`] owns everything one run of a program needs: the heap,
//! the goroutine table and run queue, channels and sync state, the output
//! handle and a seeded RNG. There is no global state, so independent
//! executions can run side by side.
//!
//! # Modules
//!
//! - `builder`: [`InterpreterBuilder`], the configuration entry point
//! - `frame`: activation records
//! - `exec`: instructions, φ transitions and terminators
//! - `call`: calls, method dispatch, returns
//! - `unwind`: panics, deferred calls and `recover`
//! - `builtins`, `intrinsics`: natively implemented callees
//! - `printing`: `fmt` and `print` rendering of values

mod builder;
mod builtins;
mod call;
mod exec;
pub(crate) mod frame;
mod intrinsics;
mod printing;
mod unwind;

use gossa_ir::Name;
use gossa_ssa::Program;
use gossa_types::{MethodSets, Pool};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::errors::{ExecResult, Fatal, Trap};
use crate::heap::Heap;
use crate::print_handler::SharedPrintHandler;
use crate::sched::{GoId, Goroutine, Scheduler};
use crate::value::{zero, Callable, Pointer};

pub use builder::InterpreterBuilder;

use frame::ReturnTo;

/// Default limit on the frame depth of one goroutine.
pub const DEFAULT_MAX_DEPTH: usize = 100_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Emit every executed instruction at `trace` level.
    pub trace: bool,
    pub max_depth: usize,
    /// Seeds the RNG behind `select`.
    pub seed: u64,
    /// Stop with [`Fatal::StepBudget`] after this many instructions.
    pub step_budget: Option<u64>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            trace: false,
            max_depth: DEFAULT_MAX_DEPTH,
            seed: 0,
            step_budget: None,
        }
    }
}

/// One panic of a failed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanicRecord {
    pub message: String,
    /// Recovered before a later panic superseded it.
    pub recovered: bool,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// `0` on normal completion, `2` after an uncaught panic or a fatal
    /// error, the argument of `os.Exit` otherwise.
    pub exit_code: i32,
    /// The panic that ended the run, preceded by the panics it superseded.
    pub panics: Vec<PanicRecord>,
    pub fatal: Option<Fatal>,
    /// Program output, when the print handler captures it.
    pub output: String,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// What the Go runtime prints on stderr for a failed run.
    pub fn failure(&self) -> Option<String> {
        if let Some(fatal) = &self.fatal {
            return Some(format!("fatal error: {fatal}"));
        }
        if self.panics.is_empty() {
            return None;
        }
        let mut text = String::new();
        for (i, p) in self.panics.iter().enumerate() {
            if i > 0 {
                text.push_str("\n\t");
            }
            text.push_str("panic: ");
            text.push_str(&p.message);
            if p.recovered {
                text.push_str(" [recovered]");
            }
        }
        Some(text)
    }
}

/// How a run stopped early.
enum Stop {
    Exit(i32),
    Panic(Vec<PanicRecord>),
    Fatal(Fatal),
}

/// What one step of a goroutine leaves it doing.
#[derive(Debug)]
pub(crate) enum Flow {
    Continue,
    /// Blocked; runs again once woken.
    Park,
    /// Still runnable, but lets others run first.
    Yield,
    /// The frame stack is empty.
    Done,
    /// The bottom frame of a nested run returned.
    Returned(crate::value::Value),
    /// A panic unwound the whole stack.
    Uncaught,
}

struct MethodNames {
    error: Name,
    string: Name,
}

/// One run of a program.
pub struct Execution<'p> {
    program: &'p Program,
    pool: &'p Pool,
    msets: MethodSets,
    config: InterpreterConfig,
    print: SharedPrintHandler,
    heap: Heap,
    /// Cell of each package-level variable.
    globals: Vec<Pointer>,
    sched: Scheduler,
    rng: StdRng,
    steps: u64,
    names: MethodNames,
}

impl<'p> Execution<'p> {
    fn new(
        program: &'p Program,
        pool: &'p Pool,
        config: InterpreterConfig,
        print: SharedPrintHandler,
    ) -> Self {
        let mut heap = Heap::new();
        let globals = program
            .globals
            .iter()
            .map(|g| heap.alloc(zero(pool, g.ty)))
            .collect();
        Execution {
            program,
            pool,
            msets: MethodSets::new(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            print,
            heap,
            globals,
            sched: Scheduler::new(),
            steps: 0,
            names: MethodNames {
                error: pool.intern_name("Error"),
                string: pool.intern_name("String"),
            },
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Run the package initializer, then `main`, until the main goroutine
    /// finishes or the run stops.
    pub fn run(mut self) -> Outcome {
        let stop = self.run_main();
        self.print.flush();
        let output = self.print.get_output();
        debug!(
            steps = self.steps,
            cells = self.heap.num_cells(),
            goroutines = self.sched.num_goroutines(),
            "run finished"
        );
        let (exit_code, panics, fatal) = match stop {
            Ok(()) => (0, Vec::new(), None),
            Err(Stop::Exit(code)) => (code, Vec::new(), None),
            Err(Stop::Panic(panics)) => (2, panics, None),
            Err(Stop::Fatal(f)) => (2, Vec::new(), Some(f)),
        };
        Outcome {
            exit_code,
            panics,
            fatal,
            output,
        }
    }

    fn run_main(&mut self) -> Result<(), Stop> {
        let main_id = self.sched.next_goroutine_id();
        let mut main = Goroutine::new(main_id);
        main.then = self.program.main;
        self.push_call(
            &mut main,
            Callable::func(self.program.init),
            Vec::new(),
            ReturnTo::Discard,
            false,
        )
        .map_err(stop_of)?;
        self.sched.spawn(main);

        loop {
            let Some(mut g) = self.sched.take_runnable() else {
                return Err(Stop::Fatal(Fatal::Deadlock));
            };
            match self.run_goroutine(&mut g).map_err(stop_of)? {
                Flow::Park => self.sched.park(g),
                Flow::Yield => self.sched.requeue(g),
                Flow::Uncaught => return Err(Stop::Panic(self.panic_chain(&mut g))),
                Flow::Done | Flow::Returned(_) => {
                    debug!(goroutine = %g.id, "exit");
                    if g.id == main_id {
                        return Ok(());
                    }
                }
                Flow::Continue => self.sched.requeue(g),
            }
        }
    }

    /// Step `g` until it blocks, yields, finishes or panics out.
    fn run_goroutine(&mut self, g: &mut Goroutine) -> ExecResult<Flow> {
        loop {
            self.count_step()?;
            match self.step(g) {
                Ok(Flow::Continue) => {}
                Ok(flow) => return Ok(flow),
                Err(Trap::Fault(fault)) => {
                    let value = self.fault_value(fault);
                    self.start_panic(g, value);
                }
                Err(trap) => return Err(trap),
            }
        }
    }

    fn count_step(&mut self) -> ExecResult<()> {
        self.steps += 1;
        match self.config.step_budget {
            Some(budget) if self.steps > budget => Err(Fatal::StepBudget(budget).into()),
            _ => Ok(()),
        }
    }

    fn new_goroutine(&self) -> Goroutine {
        Goroutine::new(self.sched.next_goroutine_id())
    }

    /// Register a fresh wait ticket on `g` and return it.
    fn begin_wait(&self, g: &mut Goroutine) -> (GoId, u64) {
        let ticket = self.sched.next_ticket();
        g.ticket = ticket;
        (g.id, ticket)
    }
}

fn stop_of(trap: Trap) -> Stop {
    match trap {
        Trap::Exit(code) => Stop::Exit(code),
        Trap::Fatal(f) => Stop::Fatal(f),
        // Faults are turned into panics before they get here.
        Trap::Fault(f) => Stop::Fatal(Fatal::Internal(format!("unhandled fault: {f}"))),
    }
}

#[cfg(test)]
mod tests;
