//! Runtime faults and fatal errors.
//!
//! A [`RuntimeFault`] is recoverable: the interpreter turns it into a panic
//! value and unwinds. A [`Fatal`] ends the execution on the spot, without
//! running deferred calls.

use thiserror::Error;

use crate::value::Value;

/// A fault raised while executing an instruction.
///
/// Except for [`RuntimeFault::Panic`], every fault surfaces to the program as
/// a `runtime.Error` whose `Error()` text is the `Display` output.
#[derive(Clone, Debug, Error)]
pub enum RuntimeFault {
    #[error("runtime error: index out of range [{index}] with length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Message tail is the Go bounds expression, e.g. `[:5] with capacity 3`.
    #[error("runtime error: slice bounds out of range {0}")]
    SliceBounds(String),

    #[error("runtime error: invalid memory address or nil pointer dereference")]
    NilDeref,

    #[error("assignment to entry in nil map")]
    NilMapWrite,

    #[error("runtime error: integer divide by zero")]
    DivideByZero,

    #[error("runtime error: negative shift amount")]
    NegativeShift,

    #[error("send on closed channel")]
    SendOnClosed,

    #[error("close of closed channel")]
    CloseOfClosed,

    #[error("close of nil channel")]
    CloseOfNil,

    /// `x.(T)` failed. `actual` is `None` for a nil interface.
    #[error("interface conversion: {}", type_assert_message(iface, actual.as_deref(), wanted, missing.as_deref()))]
    TypeAssertion {
        iface: String,
        actual: Option<String>,
        wanted: String,
        /// Method the dynamic type lacks, for interface targets.
        missing: Option<String>,
    },

    #[error("runtime error: hash of unhashable type {0}")]
    Unhashable(String),

    #[error("runtime error: comparing uncomparable type {0}")]
    Uncomparable(String),

    /// `make` with a negative or oversized length; the payload names the
    /// operation (`makeslice: len`).
    #[error("runtime error: {0} out of range")]
    MakeOutOfRange(&'static str),

    #[error("reflect: call of reflect.{method} on {kind} Value")]
    Reflect { method: &'static str, kind: String },

    /// Misuse of a `reflect.Type` method or an index out of range; the
    /// payload follows `reflect: `.
    #[error("reflect: {0}")]
    ReflectUsage(String),

    /// A construct the builder could not lower, reached at run time.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// `panic(v)` from the program itself.
    #[error("panic")]
    Panic(Value),
}

fn type_assert_message(
    iface: &str,
    actual: Option<&str>,
    wanted: &str,
    missing: Option<&str>,
) -> String {
    match (actual, missing) {
        (None, _) => format!("{iface} is nil, not {wanted}"),
        (Some(actual), Some(m)) => {
            format!("{actual} is not {wanted}: missing method {m}")
        }
        (Some(actual), None) => format!("{iface} is {actual}, not {wanted}"),
    }
}

/// An unrecoverable condition. Deferred calls do not run.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Fatal {
    #[error("all goroutines are asleep - deadlock!")]
    Deadlock,

    #[error("stack overflow (frame depth limit {limit} exceeded)")]
    StackOverflow { limit: usize },

    #[error("step budget of {0} instructions exhausted")]
    StepBudget(u64),

    #[error("sync: unlock of unlocked mutex")]
    UnlockOfUnlocked,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Why execution of a goroutine stopped short of its next instruction.
#[derive(Debug)]
pub(crate) enum Trap {
    Fault(RuntimeFault),
    Fatal(Fatal),
    /// `os.Exit(code)`.
    Exit(i32),
}

impl From<RuntimeFault> for Trap {
    fn from(f: RuntimeFault) -> Self {
        Trap::Fault(f)
    }
}

impl From<Fatal> for Trap {
    fn from(f: Fatal) -> Self {
        Trap::Fatal(f)
    }
}

pub(crate) type ExecResult<T> = Result<T, Trap>;

/// Shorthand for interpreter invariants that a well-formed program never
/// violates.
pub(crate) fn internal(msg: impl Into<String>) -> Trap {
    Trap::Fatal(Fatal::Internal(msg.into()))
}
