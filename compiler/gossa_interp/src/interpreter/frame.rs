//! Activation records.

use gossa_ssa::{BlockId, FnId, Function, VarId};
use gossa_types::Idx;

use crate::value::{Callable, Value};

/// Where a frame stands with respect to a panic.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FrameMode {
    Normal,
    /// A panic is propagating through this frame: its deferred calls run,
    /// then it is popped.
    Unwinding,
    /// A deferred call recovered the panic. The remaining deferred calls
    /// run, then the function returns through its recover block.
    Recovered,
}

/// What to do with the results when a frame returns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReturnTo {
    /// Store into this register of the caller and advance past the call.
    Value(VarId),
    /// A deferred call finished; the caller resumes its defer processing.
    Deferred,
    /// Bottom of a goroutine.
    Discard,
    /// Bottom of a nested run started by the interpreter itself (`Error`
    /// and `String` methods called while formatting).
    Sync,
}

#[derive(Clone, Debug)]
pub(crate) struct Deferred {
    pub callee: Callable,
    pub args: Vec<Value>,
    /// Static argument types, for builtins that need them.
    pub types: Vec<Idx>,
}

#[derive(Debug)]
pub(crate) struct Frame {
    pub func: FnId,
    pub block: BlockId,
    /// Next instruction of `block`; `instrs.len()` means the terminator.
    pub pc: usize,
    pub regs: Vec<Value>,
    /// Pending deferred calls, last to run at the end.
    pub defers: Vec<Deferred>,
    pub mode: FrameMode,
    pub ret: ReturnTo,
    /// Called directly by the unwinding machinery, so `recover()` here can
    /// stop the panic.
    pub can_recover: bool,
}

impl Frame {
    pub fn new(f: &Function, ret: ReturnTo, can_recover: bool) -> Self {
        Frame {
            func: f.id,
            block: BlockId::new(0),
            pc: 0,
            regs: vec![Value::Void; f.num_vars()],
            defers: Vec::new(),
            mode: FrameMode::Normal,
            ret,
            can_recover,
        }
    }

    pub fn get(&self, v: VarId) -> Value {
        self.regs[v.index()].clone()
    }

    pub fn set(&mut self, v: VarId, value: Value) {
        self.regs[v.index()] = value;
    }
}
