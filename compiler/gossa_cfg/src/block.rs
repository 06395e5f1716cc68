//! Graph representation and rendering.

use std::fmt::{self, Write};

use gossa_ast::{ExprId, Package, Printer, StmtId};
use gossa_diagnostic::Diagnostic;
use gossa_types::Pool;
use smallvec::SmallVec;

/// Why a block exists.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Follows a return, branch or no-return call.
    Unreachable,
    /// Function entry.
    Body,
    /// Target of a label.
    Label,
    IfThen,
    IfElse,
    IfDone,
    ForBody,
    ForDone,
    ForLoop,
    ForPost,
    RangeBody,
    RangeDone,
    RangeLoop,
    SwitchCaseBody,
    SwitchDone,
    SwitchNextCase,
    TypeSwitchCaseBody,
    TypeSwitchDone,
    TypeSwitchNextCase,
    SelectCaseBody,
    SelectDone,
    SelectAfterCase,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A node of a block: a simple statement, or the condition / tag / range
/// operand of a compound statement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CfgNode {
    Stmt(StmtId),
    Expr(ExprId),
}

/// A basic block of statements.
#[derive(Clone, Debug)]
pub struct CfgBlock {
    pub index: u32,
    pub kind: BlockKind,
    /// The statement that caused the block (`None` for the entry block
    /// and for labels referenced before their definition).
    pub stmt: Option<StmtId>,
    pub nodes: Vec<CfgNode>,
    pub succs: SmallVec<[u32; 2]>,
    pub live: bool,
}

/// The control-flow graph of one function body.
#[derive(Clone, Debug, Default)]
pub struct Cfg {
    pub blocks: Vec<CfgBlock>,
    /// Malformed control flow found while building, sorted by position.
    pub diagnostics: Vec<Diagnostic>,
}

impl Cfg {
    pub fn entry(&self) -> &CfgBlock {
        &self.blocks[0]
    }

    /// Simple statements in block order.
    pub fn statements(&self) -> impl Iterator<Item = StmtId> + '_ {
        self.blocks.iter().flat_map(|b| {
            b.nodes.iter().filter_map(|n| match n {
                CfgNode::Stmt(s) => Some(*s),
                CfgNode::Expr(_) => None,
            })
        })
    }

    /// Blocks reachable from the entry.
    pub fn live_blocks(&self) -> impl Iterator<Item = &CfgBlock> {
        self.blocks.iter().filter(|b| b.live)
    }

    /// The block containing `stmt`, if any.
    pub fn block_of(&self, stmt: StmtId) -> Option<&CfgBlock> {
        self.blocks
            .iter()
            .find(|b| b.nodes.contains(&CfgNode::Stmt(stmt)))
    }

    /// One line per block: `.N: Kind [live|dead] node; node`.
    pub fn format(&self, pkg: &Package, pool: &Pool) -> String {
        let printer = Printer::new(pkg, pool);
        let mut out = String::new();
        for block in &self.blocks {
            let _ = write!(
                out,
                ".{}: {} [{}]",
                block.index,
                block.kind,
                if block.live { "live" } else { "dead" }
            );
            for (i, node) in block.nodes.iter().enumerate() {
                out.push_str(if i == 0 { " " } else { "; " });
                match *node {
                    CfgNode::Stmt(s) => printer.stmt_into(s, &mut out),
                    CfgNode::Expr(e) => printer.expr_into(e, &mut out),
                }
            }
            out.push('\n');
        }
        out
    }

    /// Edges in Graphviz `dot` notation. Dead blocks are drawn dashed.
    pub fn dot(&self) -> String {
        let mut out = String::from("digraph cfg {\n");
        for block in &self.blocks {
            let _ = writeln!(
                out,
                "  n{} [label=\".{}: {}\"{}];",
                block.index,
                block.index,
                block.kind,
                if block.live { "" } else { ", style=dashed" }
            );
        }
        for block in &self.blocks {
            for succ in &block.succs {
                let _ = writeln!(out, "  n{} -> n{};", block.index, succ);
            }
        }
        out.push_str("}\n");
        out
    }
}
