//! Structural checks over built functions.
//!
//! Run by the builder when [`crate::BuildConfig::sanity_check`] is set; each
//! problem becomes an `invalid SSA` diagnostic. Checked:
//!
//! - block ids match their position and successor lists match terminators
//! - predecessor and successor lists mirror each other
//! - φ-nodes come first and carry one edge per predecessor
//! - every value is defined once and every use refers to a defined value

use rustc_hash::FxHashSet;

use crate::ir::{Function, VarId};

/// Problems found in `f`; empty when it is well formed.
pub fn check(f: &Function) -> Vec<String> {
    let mut problems = Vec::new();
    if !f.has_body() {
        return problems;
    }
    let n = f.blocks.len();

    let mut defined: FxHashSet<VarId> = FxHashSet::default();
    let mut define = |v: VarId, problems: &mut Vec<String>| {
        if !defined.insert(v) {
            problems.push(format!("{v} defined more than once"));
        }
    };
    for &p in f.params.iter().chain(&f.free_vars) {
        define(p, &mut problems);
    }
    for block in &f.blocks {
        for instr in &block.instrs {
            if let Some(d) = instr.dst() {
                define(d, &mut problems);
            }
        }
    }

    for (i, block) in f.blocks.iter().enumerate() {
        let id = block.id;
        if id.index() != i {
            problems.push(format!("block at position {i} has id {id}"));
        }
        if block.succs != block.term.succs() {
            problems.push(format!("{id}: successors do not match terminator"));
        }
        for &s in &block.succs {
            if s.index() >= n {
                problems.push(format!("{id}: successor {s} out of range"));
            } else if !f.blocks[s.index()].preds.contains(&id) {
                problems.push(format!("{id}: missing from predecessors of {s}"));
            }
        }
        for &p in &block.preds {
            if p.index() >= n {
                problems.push(format!("{id}: predecessor {p} out of range"));
            } else if !f.blocks[p.index()].succs.contains(&id) {
                problems.push(format!("{id}: missing from successors of {p}"));
            }
        }

        let mut past_phis = false;
        for instr in &block.instrs {
            if instr.is_phi() {
                if past_phis {
                    problems.push(format!("{id}: φ after ordinary instruction"));
                }
                if let crate::ir::Instr::Phi { dst, edges, .. } = instr {
                    if edges.len() != block.preds.len() {
                        problems.push(format!(
                            "{id}: φ {dst} has {} edges for {} predecessors",
                            edges.len(),
                            block.preds.len()
                        ));
                    }
                }
            } else {
                past_phis = true;
            }
            for v in instr.operands() {
                check_use(f, &defined, v, &mut problems);
            }
        }
        for v in block.term.operands() {
            check_use(f, &defined, v, &mut problems);
        }
    }
    problems
}

fn check_use(f: &Function, defined: &FxHashSet<VarId>, v: VarId, problems: &mut Vec<String>) {
    if v.index() >= f.num_vars() {
        problems.push(format!("use of {v} out of range"));
    } else if !defined.contains(&v) {
        problems.push(format!("use of undefined {v}"));
    }
}

#[cfg(test)]
mod tests {
    use gossa_ir::{ConstValue, Span};
    use gossa_types::Idx;
    use pretty_assertions::assert_eq;
    use smallvec::smallvec;

    use super::check;
    use crate::ir::{Block, BlockId, FnId, Function, Instr, Terminator, VarId};

    fn block(id: u32, instrs: Vec<Instr>, term: Terminator, preds: Vec<BlockId>) -> Block {
        Block {
            id: BlockId::new(id),
            comment: "test",
            succs: term.succs(),
            instrs,
            term,
            preds,
            live: true,
            span: Span::DUMMY,
        }
    }

    fn function(blocks: Vec<Block>, vars: usize) -> Function {
        Function {
            id: FnId::new(0),
            name: "main.f".into(),
            sig: Idx::INVALID,
            decl: None,
            type_args: Vec::new(),
            synthetic: None,
            params: Vec::new(),
            free_vars: Vec::new(),
            blocks,
            var_types: vec![Idx::INT; vars],
            recover: None,
            span: Span::DUMMY,
        }
    }

    fn konst(dst: u32) -> Instr {
        Instr::Const {
            dst: VarId::new(dst),
            ty: Idx::INT,
            value: ConstValue::Int(1),
        }
    }

    #[test]
    fn well_formed_function_passes() {
        let f = function(
            vec![
                block(0, vec![konst(0)], Terminator::Jump(BlockId::new(1)), vec![]),
                block(
                    1,
                    vec![],
                    Terminator::Return(vec![VarId::new(0)]),
                    vec![BlockId::new(0)],
                ),
            ],
            1,
        );
        assert_eq!(check(&f), Vec::<String>::new());
    }

    #[test]
    fn reports_undefined_use_and_phi_arity() {
        let phi = Instr::Phi {
            dst: VarId::new(1),
            ty: Idx::INT,
            edges: vec![VarId::new(0), VarId::new(2)],
        };
        let f = function(
            vec![
                block(0, vec![konst(0)], Terminator::Jump(BlockId::new(1)), vec![]),
                block(
                    1,
                    vec![phi],
                    Terminator::Return(vec![VarId::new(1)]),
                    vec![BlockId::new(0)],
                ),
            ],
            3,
        );
        let problems = check(&f);
        assert!(problems.iter().any(|p| p.contains("2 edges for 1 predecessors")));
        assert!(problems.iter().any(|p| p == "use of undefined t2"));
    }

    #[test]
    fn reports_pred_succ_mismatch() {
        let mut b1 = block(1, vec![], Terminator::Unreachable, vec![]);
        b1.succs = smallvec![BlockId::new(0)];
        let f = function(
            vec![block(0, vec![], Terminator::Jump(BlockId::new(1)), vec![]), b1],
            0,
        );
        let problems = check(&f);
        assert!(problems.contains(&"b0: missing from predecessors of b1".to_owned()));
        assert!(problems.contains(&"b1: successors do not match terminator".to_owned()));
    }

    #[test]
    fn reports_double_definition() {
        let f = function(
            vec![block(0, vec![konst(0), konst(0)], Terminator::Return(vec![]), vec![])],
            1,
        );
        assert_eq!(check(&f), vec!["t0 defined more than once".to_owned()]);
    }
}
