//! Gossa Interp - runs SSA programs built by `gossa_ssa`.
//!
//! # Architecture
//!
//! - `value`: the runtime value model; aggregates are copied on
//!   assignment, everything addressable lives in the heap
//! - `heap`: cells, maps and range iterators, addressed by index
//! - `ops`: arithmetic, comparison and conversion on scalar values
//! - `sched`: goroutines, channels, mutexes and wait groups; one
//!   goroutine runs at a time
//! - `interpreter`: instruction execution, calls, panics and the natively
//!   implemented library
//! - `format`: number and string formatting shared by `fmt` and `print`
//! - `reflect`: the `reflect` subset
//!
//! # Usage
//!
//! ```ignore
//! let outcome = InterpreterBuilder::new(&program, &pool)
//!     .print_handler(buffer_handler())
//!     .seed(7)
//!     .build()
//!     .run();
//! assert!(outcome.success());
//! ```

mod errors;
mod format;
mod heap;
pub mod interpreter;
mod ops;
mod print_handler;
pub mod reflect;
mod sched;
pub mod value;

use std::sync::Once;

pub use errors::{Fatal, RuntimeFault};
pub use interpreter::{
    Execution, InterpreterBuilder, InterpreterConfig, Outcome, PanicRecord, DEFAULT_MAX_DEPTH,
};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, PrintHandlerImpl, SharedPrintHandler,
};
pub use reflect::Kind;
pub use value::Value;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber configured from `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset, and nothing after the first
/// call. Interpreter events live under the `gossa_interp` target:
/// `debug` for goroutine lifecycle and panics, `trace` for every
/// instruction when the execution was built with
/// [`InterpreterBuilder::trace`].
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
