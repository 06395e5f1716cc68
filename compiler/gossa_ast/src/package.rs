//! The unit handed over by the front end.

use gossa_ir::{FuncId, GlobalId, LocalId, Name, Span};
use gossa_types::Idx;

use crate::{Expr, ExprId, Stmt, StmtId};

/// A local variable: parameter, named result, or variable declared in a
/// function body. Local ids are unique across the package, so a local
/// belongs to exactly one function or function literal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalDecl {
    pub name: Name,
    pub ty: Idx,
    pub span: Span,
}

/// A package-level variable.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GlobalDecl {
    pub name: Name,
    pub ty: Idx,
    pub span: Span,
}

/// Method receiver.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Receiver {
    /// `None` for an unnamed or blank receiver.
    pub local: Option<LocalId>,
    /// `T` or `*T`; for methods of generic types, `T` is the template
    /// applied to the method's own type parameters.
    pub ty: Idx,
}

/// A function or method declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub id: FuncId,
    pub name: Name,
    pub recv: Option<Receiver>,
    /// Type parameters; for methods of generic types, the receiver's.
    pub type_params: Vec<Idx>,
    /// Signature without receiver.
    pub sig: Idx,
    pub params: Vec<Option<LocalId>>,
    pub results: Vec<Option<LocalId>>,
    /// `None` for declarations without a body.
    pub body: Option<Vec<StmtId>>,
    pub span: Span,
}

impl FuncDecl {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Has at least one named result.
    pub fn has_named_results(&self) -> bool {
        self.results.iter().any(Option::is_some)
    }
}

/// A package-level `var` initializer, in initialization order.
#[derive(Clone, Debug, PartialEq)]
pub struct VarInit {
    pub lhs: Vec<Option<GlobalId>>,
    pub rhs: Vec<ExprId>,
}

/// A type-checked package.
#[derive(Clone, Debug, Default)]
pub struct Package {
    pub name: Name,
    pub exprs: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    pub locals: Vec<LocalDecl>,
    pub globals: Vec<GlobalDecl>,
    pub funcs: Vec<FuncDecl>,
    /// Already sorted in dependency order by the front end.
    pub var_inits: Vec<VarInit>,
    /// User `init` functions in source order.
    pub inits: Vec<FuncId>,
    pub main: Option<FuncId>,
}

impl Package {
    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn local(&self, id: LocalId) -> &LocalDecl {
        &self.locals[id.index()]
    }

    #[inline]
    pub fn global(&self, id: GlobalId) -> &GlobalDecl {
        &self.globals[id.index()]
    }

    #[inline]
    pub fn func(&self, id: FuncId) -> &FuncDecl {
        &self.funcs[id.index()]
    }

    /// Find a top-level function by name.
    pub fn func_by_name(&self, name: Name) -> Option<&FuncDecl> {
        self.funcs
            .iter()
            .find(|f| f.name == name && f.recv.is_none())
    }
}
