//! Typed Go syntax tree.
//!
//! Parsing and type checking happen outside this workspace. The front end
//! hands over a [`Package`]: arena-allocated statements and expressions in
//! which every expression carries its resolved type ([`gossa_types::Idx`])
//! and every identifier is already resolved to a local, global, function,
//! builtin or intrinsic.
//!
//! # Design
//!
//! - No `Box<Expr>`: children are [`ExprId`] / [`StmtId`] indices into the
//!   package arenas, so the CFG utility can refer to statements by identity.
//! - Compound statements own their clause lists; simple statements are
//!   leaves.
//! - [`AstBuilder`] is the construction API used by front ends and tests.

mod builtin;
mod expr;
mod ids;
mod make;
mod package;
pub mod printer;
mod stmt;
pub mod visitor;

pub use builtin::{Builtin, Intrinsic};
pub use expr::{CompositeElem, CompositeKey, Expr, ExprKind, FuncLit};
pub use ids::{ExprId, StmtId};
pub use make::AstBuilder;
pub use package::{FuncDecl, GlobalDecl, LocalDecl, Package, Receiver, VarInit};
pub use printer::Printer;
pub use stmt::{CaseClause, CommClause, RangeTarget, Stmt, StmtKind, TypeClause};
