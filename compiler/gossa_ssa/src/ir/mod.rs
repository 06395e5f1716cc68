//! SSA IR: programs, functions, blocks, instructions.
//!
//! - **[`Program`]**: every built function plus globals, the synthetic
//!   package initializer and the interface method registry
//! - **[`Function`]**: parameters, free variables, blocks, value types
//! - **[`Block`]**: φ-nodes first, then ordinary instructions, then one
//!   [`Terminator`]
//! - **[`Instr`]**: one operation; value-producing instructions define
//!   exactly one [`VarId`]
//!
//! Functions are immutable once [`crate::build_program`] returns.

use std::fmt;

use gossa_ast::{Builtin, Intrinsic};
use gossa_ir::{BinaryOp, ConstValue, FuncId, GlobalId, Name, Span, UnaryOp};
use gossa_types::Idx;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

macro_rules! ir_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

ir_id!(
    /// An SSA value within one function.
    VarId,
    "t"
);
ir_id!(
    /// A basic block within one function.
    BlockId,
    "b"
);
ir_id!(
    /// A built function within a [`Program`].
    FnId,
    "f"
);

/// What a call, `go` or `defer` invokes.
#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    /// Statically known function.
    Static(FnId),
    /// Function value: static function, closure or bound method.
    Value(VarId),
    /// Dynamic dispatch on an interface value.
    Invoke { recv: VarId, method: Name },
    Builtin(Builtin),
    Intrinsic(Intrinsic),
}

/// Target of a bound method value `x.m`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BoundTarget {
    Static(FnId),
    Invoke(Name),
}

/// Direction of a select case.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectDir {
    Send,
    Recv,
}

/// One non-default case of a select.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SelectState {
    pub dir: SelectDir,
    pub ch: VarId,
    /// Value to send.
    pub value: Option<VarId>,
}

/// One SSA operation.
///
/// `ty` fields hold the type of `dst`.
#[derive(Clone, Debug, PartialEq)]
pub enum Instr {
    /// One operand per predecessor, in the block's predecessor order.
    Phi {
        dst: VarId,
        ty: Idx,
        edges: Vec<VarId>,
    },
    /// Constant; `ConstValue::Nil` is the zero value of `ty`.
    Const {
        dst: VarId,
        ty: Idx,
        value: ConstValue,
    },
    /// Address of a package-level variable.
    Global {
        dst: VarId,
        ty: Idx,
        global: GlobalId,
    },
    /// A function as a value.
    FuncValue { dst: VarId, ty: Idx, func: FnId },
    /// Closure over the cells in `bindings` (one per free variable).
    MakeClosure {
        dst: VarId,
        ty: Idx,
        func: FnId,
        bindings: Vec<VarId>,
    },
    /// Method value with its receiver evaluated now.
    MakeBound {
        dst: VarId,
        ty: Idx,
        recv: VarId,
        target: BoundTarget,
    },
    /// New zeroed cell of type `elem`; `dst` is a `*elem`.
    Alloc { dst: VarId, ty: Idx, elem: Idx },
    Load { dst: VarId, ty: Idx, addr: VarId },
    Store { addr: VarId, value: VarId },
    /// `&x.f` for a pointer-to-struct `x`.
    FieldAddr {
        dst: VarId,
        ty: Idx,
        x: VarId,
        field: u32,
    },
    /// `&x[i]` for a pointer-to-array or slice `x`.
    IndexAddr {
        dst: VarId,
        ty: Idx,
        x: VarId,
        index: VarId,
    },
    /// Field of a struct value.
    Field {
        dst: VarId,
        ty: Idx,
        x: VarId,
        field: u32,
    },
    /// Element of an array value or byte of a string.
    Index {
        dst: VarId,
        ty: Idx,
        x: VarId,
        index: VarId,
    },
    /// Map lookup; `(value, ok)` when `comma_ok`, else the value or zero.
    Lookup {
        dst: VarId,
        ty: Idx,
        map: VarId,
        key: VarId,
        comma_ok: bool,
    },
    /// Slice of a string, slice, or pointer-to-array.
    Slice {
        dst: VarId,
        ty: Idx,
        x: VarId,
        low: Option<VarId>,
        high: Option<VarId>,
        max: Option<VarId>,
    },
    BinOp {
        dst: VarId,
        ty: Idx,
        op: BinaryOp,
        x: VarId,
        y: VarId,
    },
    UnOp {
        dst: VarId,
        ty: Idx,
        op: UnaryOp,
        x: VarId,
    },
    /// Numeric, string and same-underlying-type conversions, and
    /// interface-to-interface changes.
    Convert { dst: VarId, ty: Idx, x: VarId },
    /// Box a concrete value as interface type `ty`; the dynamic type is
    /// `x`'s type.
    MakeInterface { dst: VarId, ty: Idx, x: VarId },
    TypeAssert {
        dst: VarId,
        ty: Idx,
        x: VarId,
        asserted: Idx,
        comma_ok: bool,
    },
    MakeSlice {
        dst: VarId,
        ty: Idx,
        len: VarId,
        cap: VarId,
    },
    MakeMap { dst: VarId, ty: Idx },
    MakeChan { dst: VarId, ty: Idx, size: VarId },
    MapUpdate { map: VarId, key: VarId, value: VarId },
    Call {
        dst: VarId,
        ty: Idx,
        callee: Callee,
        args: Vec<VarId>,
    },
    Go { callee: Callee, args: Vec<VarId> },
    /// Push onto the frame's defer list; arguments are evaluated now.
    Defer { callee: Callee, args: Vec<VarId> },
    /// Run the frame's deferred calls, most recent first.
    RunDefers,
    Send { ch: VarId, value: VarId },
    /// `<-ch`; `(value, ok)` when `comma_ok`.
    Recv {
        dst: VarId,
        ty: Idx,
        ch: VarId,
        comma_ok: bool,
    },
    /// Result is `(index int, recvOk bool, recv values...)`; index `-1`
    /// means the default case was taken.
    Select {
        dst: VarId,
        ty: Idx,
        states: Vec<SelectState>,
        blocking: bool,
    },
    /// Element of a tuple.
    Extract {
        dst: VarId,
        ty: Idx,
        tuple: VarId,
        index: u32,
    },
    /// Iterator over a string or map.
    Range { dst: VarId, ty: Idx, x: VarId },
    /// Advance an iterator: `(ok, key, value)`.
    Next {
        dst: VarId,
        ty: Idx,
        iter: VarId,
        is_string: bool,
    },
}

impl Instr {
    /// The defined value, if any.
    pub fn dst(&self) -> Option<VarId> {
        match self {
            Instr::Phi { dst, .. }
            | Instr::Const { dst, .. }
            | Instr::Global { dst, .. }
            | Instr::FuncValue { dst, .. }
            | Instr::MakeClosure { dst, .. }
            | Instr::MakeBound { dst, .. }
            | Instr::Alloc { dst, .. }
            | Instr::Load { dst, .. }
            | Instr::FieldAddr { dst, .. }
            | Instr::IndexAddr { dst, .. }
            | Instr::Field { dst, .. }
            | Instr::Index { dst, .. }
            | Instr::Lookup { dst, .. }
            | Instr::Slice { dst, .. }
            | Instr::BinOp { dst, .. }
            | Instr::UnOp { dst, .. }
            | Instr::Convert { dst, .. }
            | Instr::MakeInterface { dst, .. }
            | Instr::TypeAssert { dst, .. }
            | Instr::MakeSlice { dst, .. }
            | Instr::MakeMap { dst, .. }
            | Instr::MakeChan { dst, .. }
            | Instr::Call { dst, .. }
            | Instr::Recv { dst, .. }
            | Instr::Select { dst, .. }
            | Instr::Extract { dst, .. }
            | Instr::Range { dst, .. }
            | Instr::Next { dst, .. } => Some(*dst),
            Instr::Store { .. }
            | Instr::MapUpdate { .. }
            | Instr::Go { .. }
            | Instr::Defer { .. }
            | Instr::RunDefers
            | Instr::Send { .. } => None,
        }
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Instr::Phi { .. })
    }

    /// Operands in evaluation order.
    pub fn operands(&self) -> SmallVec<[VarId; 4]> {
        let mut ops = SmallVec::new();
        self.for_each_operand(|v| ops.push(v));
        ops
    }

    fn for_each_operand(&self, mut f: impl FnMut(VarId)) {
        let callee = |c: &Callee, f: &mut dyn FnMut(VarId)| match c {
            Callee::Value(v) | Callee::Invoke { recv: v, .. } => f(*v),
            Callee::Static(_) | Callee::Builtin(_) | Callee::Intrinsic(_) => {}
        };
        match self {
            Instr::Phi { edges, .. } => edges.iter().copied().for_each(f),
            Instr::Const { .. }
            | Instr::Global { .. }
            | Instr::FuncValue { .. }
            | Instr::Alloc { .. }
            | Instr::MakeMap { .. }
            | Instr::RunDefers => {}
            Instr::MakeClosure { bindings, .. } => bindings.iter().copied().for_each(f),
            Instr::MakeBound { recv, .. } => f(*recv),
            Instr::Load { addr: x, .. }
            | Instr::FieldAddr { x, .. }
            | Instr::Field { x, .. }
            | Instr::UnOp { x, .. }
            | Instr::Convert { x, .. }
            | Instr::MakeInterface { x, .. }
            | Instr::TypeAssert { x, .. }
            | Instr::MakeChan { size: x, .. }
            | Instr::Recv { ch: x, .. }
            | Instr::Extract { tuple: x, .. }
            | Instr::Range { x, .. }
            | Instr::Next { iter: x, .. } => f(*x),
            Instr::Store { addr, value } => {
                f(*addr);
                f(*value);
            }
            Instr::IndexAddr { x, index, .. } | Instr::Index { x, index, .. } => {
                f(*x);
                f(*index);
            }
            Instr::Lookup { map, key, .. } => {
                f(*map);
                f(*key);
            }
            Instr::Slice {
                x, low, high, max, ..
            } => {
                f(*x);
                for v in [low, high, max].into_iter().flatten() {
                    f(*v);
                }
            }
            Instr::BinOp { x, y, .. } => {
                f(*x);
                f(*y);
            }
            Instr::MakeSlice { len, cap, .. } => {
                f(*len);
                f(*cap);
            }
            Instr::MapUpdate { map, key, value } => {
                f(*map);
                f(*key);
                f(*value);
            }
            Instr::Call { callee: c, args, .. }
            | Instr::Go { callee: c, args }
            | Instr::Defer { callee: c, args } => {
                callee(c, &mut f);
                args.iter().copied().for_each(f);
            }
            Instr::Send { ch, value } => {
                f(*ch);
                f(*value);
            }
            Instr::Select { states, .. } => {
                for s in states {
                    f(s.ch);
                    if let Some(v) = s.value {
                        f(v);
                    }
                }
            }
        }
    }

    /// Rewrite every operand through `f`.
    pub fn map_operands(&mut self, mut f: impl FnMut(VarId) -> VarId) {
        let mut callee = |c: &mut Callee, f: &mut dyn FnMut(VarId) -> VarId| match c {
            Callee::Value(v) | Callee::Invoke { recv: v, .. } => *v = f(*v),
            Callee::Static(_) | Callee::Builtin(_) | Callee::Intrinsic(_) => {}
        };
        match self {
            Instr::Phi { edges: vs, .. } | Instr::MakeClosure { bindings: vs, .. } => {
                vs.iter_mut().for_each(|v| *v = f(*v));
            }
            Instr::Const { .. }
            | Instr::Global { .. }
            | Instr::FuncValue { .. }
            | Instr::Alloc { .. }
            | Instr::MakeMap { .. }
            | Instr::RunDefers => {}
            Instr::MakeBound { recv: x, .. }
            | Instr::Load { addr: x, .. }
            | Instr::FieldAddr { x, .. }
            | Instr::Field { x, .. }
            | Instr::UnOp { x, .. }
            | Instr::Convert { x, .. }
            | Instr::MakeInterface { x, .. }
            | Instr::TypeAssert { x, .. }
            | Instr::MakeChan { size: x, .. }
            | Instr::Recv { ch: x, .. }
            | Instr::Extract { tuple: x, .. }
            | Instr::Range { x, .. }
            | Instr::Next { iter: x, .. } => *x = f(*x),
            Instr::Store { addr: a, value: b }
            | Instr::IndexAddr { x: a, index: b, .. }
            | Instr::Index { x: a, index: b, .. }
            | Instr::Lookup { map: a, key: b, .. }
            | Instr::BinOp { x: a, y: b, .. }
            | Instr::MakeSlice { len: a, cap: b, .. }
            | Instr::Send { ch: a, value: b } => {
                *a = f(*a);
                *b = f(*b);
            }
            Instr::Slice {
                x, low, high, max, ..
            } => {
                *x = f(*x);
                for v in [low, high, max].into_iter().flatten() {
                    *v = f(*v);
                }
            }
            Instr::MapUpdate { map, key, value } => {
                *map = f(*map);
                *key = f(*key);
                *value = f(*value);
            }
            Instr::Call { callee: c, args, .. }
            | Instr::Go { callee: c, args }
            | Instr::Defer { callee: c, args } => {
                callee(c, &mut f);
                args.iter_mut().for_each(|v| *v = f(*v));
            }
            Instr::Select { states, .. } => {
                for s in states {
                    s.ch = f(s.ch);
                    if let Some(v) = &mut s.value {
                        *v = f(*v);
                    }
                }
            }
        }
    }
}

/// Block exit.
#[derive(Clone, Debug, PartialEq)]
pub enum Terminator {
    Jump(BlockId),
    If {
        cond: VarId,
        then: BlockId,
        els: BlockId,
    },
    Return(Vec<VarId>),
    /// Start unwinding with the given (interface-typed) value.
    Panic(VarId),
    /// Control never reaches the end of this block.
    Unreachable,
}

impl Terminator {
    pub fn succs(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Terminator::Jump(t) => smallvec::smallvec![*t],
            Terminator::If { then, els, .. } => smallvec::smallvec![*then, *els],
            Terminator::Return(_) | Terminator::Panic(_) | Terminator::Unreachable => {
                SmallVec::new()
            }
        }
    }

    pub fn operands(&self) -> SmallVec<[VarId; 4]> {
        match self {
            Terminator::If { cond, .. } => smallvec::smallvec![*cond],
            Terminator::Return(vs) => vs.iter().copied().collect(),
            Terminator::Panic(v) => smallvec::smallvec![*v],
            Terminator::Jump(_) | Terminator::Unreachable => SmallVec::new(),
        }
    }

    pub fn map_operands(&mut self, mut f: impl FnMut(VarId) -> VarId) {
        match self {
            Terminator::If { cond: v, .. } | Terminator::Panic(v) => *v = f(*v),
            Terminator::Return(vs) => vs.iter_mut().for_each(|v| *v = f(*v)),
            Terminator::Jump(_) | Terminator::Unreachable => {}
        }
    }

    /// Short name used as the block kind in listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Terminator::Jump(_) => "jump",
            Terminator::If { .. } => "if",
            Terminator::Return(_) => "return",
            Terminator::Panic(_) => "panic",
            Terminator::Unreachable => "unreachable",
        }
    }
}

/// A basic block.
#[derive(Clone, Debug)]
pub struct Block {
    pub id: BlockId,
    /// Why the block exists (`entry`, `if.then`, `for.loop`, ...).
    pub comment: &'static str,
    /// φ-nodes first.
    pub instrs: Vec<Instr>,
    pub term: Terminator,
    pub preds: Vec<BlockId>,
    pub succs: SmallVec<[BlockId; 2]>,
    /// Reachable from the entry block or from the recover block.
    pub live: bool,
    /// Span of the originating statement.
    pub span: Span,
}

impl Block {
    pub fn phis(&self) -> impl Iterator<Item = &Instr> {
        self.instrs.iter().take_while(|i| i.is_phi())
    }
}

/// Why a function exists.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Synthetic {
    /// Package initializer: global initializers, then user `init`s.
    PackageInit,
}

/// A built function.
#[derive(Clone, Debug)]
pub struct Function {
    pub id: FnId,
    /// Qualified name: `main.f`, `main.(*T).M`, `main.f[int]`, `main.f$1`.
    pub name: String,
    pub sig: Idx,
    /// The declaration this was built from (`None` for closures and
    /// synthetic functions).
    pub decl: Option<FuncId>,
    pub type_args: Vec<Idx>,
    pub synthetic: Option<Synthetic>,
    /// Receiver first for methods.
    pub params: Vec<VarId>,
    /// Captured cells, in closure binding order.
    pub free_vars: Vec<VarId>,
    /// Empty for body-less declarations.
    pub blocks: Vec<Block>,
    /// Type of each value, indexed by [`VarId`].
    pub var_types: Vec<Idx>,
    /// Resumption point after a recovered panic: returns the named results'
    /// current values (or zero values).
    pub recover: Option<BlockId>,
    pub span: Span,
}

impl Function {
    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn var_type(&self, v: VarId) -> Idx {
        self.var_types[v.index()]
    }

    pub fn num_vars(&self) -> usize {
        self.var_types.len()
    }
}

/// Implementation of a method for one dynamic type.
#[derive(Clone, Debug, PartialEq)]
pub enum MethodImpl {
    /// Walk `path` from the receiver, adjust to the declared receiver
    /// form, call `func`.
    Func {
        func: FnId,
        path: SmallVec<[u32; 4]>,
        ptr_recv: bool,
    },
    /// Walk `path` to an embedded interface field and dispatch again.
    Embedded { path: SmallVec<[u32; 4]> },
    /// Implemented by the runtime (`runtime.Error.Error`,
    /// `errors.errorString.Error`).
    Native {
        path: SmallVec<[u32; 4]>,
        recv: Idx,
        ptr_recv: bool,
    },
}

/// A package-level variable.
#[derive(Clone, Debug)]
pub struct GlobalInfo {
    pub name: String,
    pub ty: Idx,
}

/// A built package.
#[derive(Clone, Debug)]
pub struct Program {
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalInfo>,
    /// Synthetic package initializer.
    pub init: FnId,
    pub main: Option<FnId>,
    /// `(dynamic type, method name) -> implementation` for every type that
    /// can reach an interface.
    pub methods: FxHashMap<(Idx, Name), MethodImpl>,
    /// `*errors.errorString`, the dynamic type of `errors.New` values.
    pub error_string: Idx,
}

impl Program {
    pub fn func(&self, id: FnId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn func_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn method(&self, ty: Idx, name: Name) -> Option<&MethodImpl> {
        self.methods.get(&(ty, name))
    }
}

#[cfg(test)]
mod tests;
