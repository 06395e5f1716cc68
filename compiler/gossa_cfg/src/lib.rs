//! Statement-level control-flow graphs.
//!
//! [`build`] partitions a function body into basic blocks of simple
//! statements and condition expressions, links them, and marks every
//! block live or dead by forward reachability from the entry block.
//! A call the [`MayReturn`] oracle reports as no-return (`panic`,
//! `os.Exit`) ends its block the same way `return` does.
//!
//! The graph is a standalone utility (dead-code detection, `dot`
//! visualization); the SSA builder reuses [`forward_reachable`] for its
//! own block liveness.

mod block;
mod builder;
mod oracle;
mod reachability;

pub use block::{BlockKind, Cfg, CfgBlock, CfgNode};
pub use builder::build;
pub use oracle::{DefaultOracle, MayReturn};
pub use reachability::forward_reachable;
