//! Expression nodes.

use std::fmt;

use gossa_ir::{BinaryOp, ConstValue, FuncId, GlobalId, LocalId, Name, Span, UnaryOp};
use gossa_types::Idx;

use crate::{Builtin, ExprId, Intrinsic, StmtId};

/// Expression node: kind, resolved type, source location.
///
/// `ty` is the type the checker assigned. Multi-value expressions (calls
/// returning several results, comma-ok forms) have a tuple type.
#[derive(Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Idx,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Idx, span: Span) -> Self {
        Expr { kind, ty, span }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {:?} @ {:?}", self.kind, self.ty, self.span)
    }
}

/// Function literal: an anonymous function that may capture locals of the
/// enclosing functions by reference.
#[derive(Clone, PartialEq, Debug)]
pub struct FuncLit {
    pub sig: Idx,
    /// `None` for blank or unnamed parameters.
    pub params: Vec<Option<LocalId>>,
    /// Named results; empty when results are unnamed.
    pub results: Vec<Option<LocalId>>,
    pub body: Vec<StmtId>,
}

/// Key of a composite literal element.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum CompositeKey {
    /// Struct field by position.
    Field(u32),
    /// Array or slice index (constant).
    Index(u64),
    /// Map key.
    Expr(ExprId),
}

/// One element of a composite literal.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct CompositeElem {
    pub key: Option<CompositeKey>,
    pub value: ExprId,
}

/// Expression variants.
///
/// Identifiers arrive resolved: the front end decides whether a name is a
/// local, a global, a function, a builtin or an intrinsic.
#[derive(Clone, PartialEq, Debug)]
pub enum ExprKind {
    Const(ConstValue),
    Local(LocalId),
    Global(GlobalId),
    Func(FuncId),
    /// Instantiated generic function `f[targs]`.
    Instance {
        func: FuncId,
        targs: Vec<Idx>,
    },
    Builtin(Builtin),
    Intrinsic(Intrinsic),
    /// `_` on the left of an assignment.
    Blank,
    FuncLit(Box<FuncLit>),
    /// `T{...}` for struct, array, slice and map types; `ty` gives `T`.
    Composite {
        elems: Vec<CompositeElem>,
    },
    /// `x.f`; `path` holds the field index at each embedding level, the last
    /// one being the selected field. Pointers along the path are
    /// dereferenced implicitly.
    Field {
        x: ExprId,
        path: Vec<u32>,
    },
    /// `x.m` as a method value or call target.
    Method {
        recv: ExprId,
        method: Name,
    },
    /// `x[i]`; `comma_ok` only for map lookups in two-value context.
    Index {
        x: ExprId,
        index: ExprId,
        comma_ok: bool,
    },
    /// `x[low:high:max]`
    Slice {
        x: ExprId,
        low: Option<ExprId>,
        high: Option<ExprId>,
        max: Option<ExprId>,
    },
    /// `x.(T)`
    TypeAssert {
        x: ExprId,
        ty: Idx,
        comma_ok: bool,
    },
    /// `f(args)`; `ellipsis` marks `f(xs...)`.
    Call {
        func: ExprId,
        args: Vec<ExprId>,
        ellipsis: bool,
    },
    /// `*x`
    Deref(ExprId),
    /// `&x`
    AddrOf(ExprId),
    Unary {
        op: UnaryOp,
        x: ExprId,
    },
    Binary {
        op: BinaryOp,
        x: ExprId,
        y: ExprId,
    },
    /// `<-ch`
    Recv {
        ch: ExprId,
        comma_ok: bool,
    },
    /// `T(x)`; the target is the expression's type.
    Convert(ExprId),
}

impl ExprKind {
    /// Addressable operand forms (locals, globals, field/index chains over
    /// addressable operands, dereferences).
    pub fn is_addressable_form(&self) -> bool {
        matches!(
            self,
            ExprKind::Local(_)
                | ExprKind::Global(_)
                | ExprKind::Deref(_)
                | ExprKind::Field { .. }
                | ExprKind::Index { .. }
        )
    }
}
