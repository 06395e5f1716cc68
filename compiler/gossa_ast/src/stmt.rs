//! Statement nodes.

use std::fmt;

use gossa_ir::{BinaryOp, LocalId, Name, Span};
use gossa_types::Idx;

use crate::{ExprId, StmtId};

/// Statement node.
#[derive(Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

impl fmt::Debug for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.kind, self.span)
    }
}

/// Iteration variable of a range loop.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RangeTarget {
    /// `for k := range`: a fresh variable per iteration.
    Local(LocalId),
    /// `for x.f = range`: assignment to an existing location.
    Expr(ExprId),
}

/// `case e1, e2: body` of an expression switch. Empty `exprs` is `default`.
#[derive(Clone, PartialEq, Debug)]
pub struct CaseClause {
    pub exprs: Vec<ExprId>,
    pub body: Vec<StmtId>,
    pub span: Span,
}

impl CaseClause {
    pub fn is_default(&self) -> bool {
        self.exprs.is_empty()
    }
}

/// `case T1, T2: body` of a type switch. `None` stands for `case nil`;
/// empty `types` is `default`.
#[derive(Clone, PartialEq, Debug)]
pub struct TypeClause {
    pub types: Vec<Option<Idx>>,
    /// The clause's implicitly declared variable (`switch v := x.(type)`).
    pub local: Option<LocalId>,
    pub body: Vec<StmtId>,
    pub span: Span,
}

impl TypeClause {
    pub fn is_default(&self) -> bool {
        self.types.is_empty()
    }
}

/// `case comm: body` of a select. `comm` is a send, a receive expression
/// statement, or a define/assign whose single right-hand side is a receive.
/// `None` is `default`.
#[derive(Clone, PartialEq, Debug)]
pub struct CommClause {
    pub comm: Option<StmtId>,
    pub body: Vec<StmtId>,
    pub span: Span,
}

/// Statement variants.
#[derive(Clone, PartialEq, Debug)]
pub enum StmtKind {
    Empty,
    Expr(ExprId),
    /// `a, b := x, y` and `var a, b T = x, y`. `None` is `_`; an empty
    /// `rhs` declares zero values.
    Define {
        lhs: Vec<Option<LocalId>>,
        rhs: Vec<ExprId>,
    },
    /// `a, b = x, y` with parallel semantics, or `a, b = f()`.
    Assign {
        lhs: Vec<ExprId>,
        rhs: Vec<ExprId>,
    },
    /// `x op= y`
    OpAssign {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    IncDec {
        x: ExprId,
        inc: bool,
    },
    Send {
        ch: ExprId,
        value: ExprId,
    },
    /// `go call`
    Go(ExprId),
    /// `defer call`
    Defer(ExprId),
    Return(Vec<ExprId>),
    Break(Option<Name>),
    Continue(Option<Name>),
    Goto(Name),
    Fallthrough,
    Block(Vec<StmtId>),
    If {
        init: Option<StmtId>,
        cond: ExprId,
        then: Vec<StmtId>,
        /// A `Block` or another `If`.
        els: Option<StmtId>,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        post: Option<StmtId>,
        body: Vec<StmtId>,
    },
    Range {
        key: Option<RangeTarget>,
        value: Option<RangeTarget>,
        x: ExprId,
        body: Vec<StmtId>,
    },
    Switch {
        init: Option<StmtId>,
        /// `None` is `switch { ... }`, i.e. `switch true`.
        tag: Option<ExprId>,
        clauses: Vec<CaseClause>,
    },
    TypeSwitch {
        init: Option<StmtId>,
        x: ExprId,
        clauses: Vec<TypeClause>,
    },
    Select {
        clauses: Vec<CommClause>,
    },
    Labeled {
        label: Name,
        stmt: StmtId,
    },
}

impl StmtKind {
    /// Statements without nested statement lists.
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            StmtKind::Empty
                | StmtKind::Expr(_)
                | StmtKind::Define { .. }
                | StmtKind::Assign { .. }
                | StmtKind::OpAssign { .. }
                | StmtKind::IncDec { .. }
                | StmtKind::Send { .. }
                | StmtKind::Go(_)
                | StmtKind::Defer(_)
                | StmtKind::Return(_)
                | StmtKind::Break(_)
                | StmtKind::Continue(_)
                | StmtKind::Goto(_)
                | StmtKind::Fallthrough
        )
    }
}
