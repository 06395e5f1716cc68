//! Block and value bookkeeping for one function under construction.
//!
//! Follows the "position at a block, emit, terminate" pattern. Variables
//! are tracked per block and φ-nodes are placed on the fly (Braun et al.,
//! "Simple and Efficient Construction of Static Single Assignment Form"):
//!
//! - a read that misses the current block places an operand-less φ there
//!   and records it as incomplete
//! - [`FuncBuilder::finish`] seals every block at once: predecessor lists
//!   are final, so incomplete φs receive one operand per predecessor
//! - trivial φs (all operands equal, ignoring self references) are then
//!   replaced by their single operand until a fixpoint is reached
//! - a φ with no operand at all reads a variable that is undefined on
//!   every path; it becomes the zero value of its type

use gossa_cfg::forward_reachable;
use gossa_ir::{ConstValue, LocalId, Span};
use gossa_types::Idx;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::warn;

use crate::ir::{Block, BlockId, Instr, Terminator, VarId};

/// Something the SSA renamer tracks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum VarKey {
    /// A source local. For locals living in a heap cell the tracked value
    /// is the cell's address.
    Local(LocalId),
    /// A builder-introduced variable (loop counters, iterators).
    Temp(u32),
}

struct BlockBuilder {
    comment: &'static str,
    phis: Vec<Instr>,
    instrs: Vec<Instr>,
    term: Option<Terminator>,
    preds: Vec<BlockId>,
    span: Span,
}

/// Function body under construction.
pub(crate) struct FuncBuilder {
    blocks: Vec<BlockBuilder>,
    current: BlockId,
    var_types: Vec<Idx>,
    defs: FxHashMap<(VarKey, BlockId), VarId>,
    /// φs waiting for operands: `(block, variable, φ)`.
    incomplete: Vec<(BlockId, VarKey, VarId)>,
    next_temp: u32,
    span: Span,
}

/// Blocks and value types of a finished body.
pub(crate) struct FinishedBody {
    pub blocks: Vec<Block>,
    pub var_types: Vec<Idx>,
}

impl FuncBuilder {
    /// Create a builder with an entry block.
    pub fn new(span: Span) -> Self {
        let mut b = FuncBuilder {
            blocks: Vec::new(),
            current: BlockId::new(0),
            var_types: Vec::new(),
            defs: FxHashMap::default(),
            incomplete: Vec::new(),
            next_temp: 0,
            span,
        };
        let entry = b.new_block("entry");
        b.position_at(entry);
        b
    }

    // Blocks

    pub fn new_block(&mut self, comment: &'static str) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(BlockBuilder {
            comment,
            phis: Vec::new(),
            instrs: Vec::new(),
            term: None,
            preds: Vec::new(),
            span: self.span,
        });
        id
    }

    pub fn position_at(&mut self, block: BlockId) {
        debug_assert!(block.index() < self.blocks.len(), "{block} out of bounds");
        self.current = block;
    }

    #[inline]
    pub fn current_block(&self) -> BlockId {
        self.current
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.blocks[self.current.index()].term.is_some()
    }

    pub fn has_preds(&self, block: BlockId) -> bool {
        !self.blocks[block.index()].preds.is_empty()
    }

    /// Continue in a fresh block nothing jumps to (yet). Code following
    /// `return`, `break`, `panic`, ... lands here.
    pub fn start_dead_block(&mut self) {
        let b = self.new_block("unreachable");
        self.position_at(b);
    }

    /// Span recorded on blocks created from now on.
    pub fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    // Values

    pub fn fresh_var(&mut self, ty: Idx) -> VarId {
        let id = VarId::new(self.var_types.len() as u32);
        self.var_types.push(ty);
        id
    }

    #[inline]
    pub fn var_type(&self, v: VarId) -> Idx {
        self.var_types[v.index()]
    }

    pub fn fresh_temp(&mut self) -> VarKey {
        let t = VarKey::Temp(self.next_temp);
        self.next_temp += 1;
        t
    }

    /// Append an instruction to the current block.
    pub fn push(&mut self, instr: Instr) {
        let block = &mut self.blocks[self.current.index()];
        debug_assert!(
            block.term.is_none(),
            "emitting into terminated block {}",
            self.current
        );
        debug_assert!(!instr.is_phi(), "φs go through add_phi");
        block.instrs.push(instr);
    }

    /// Emit a value-producing instruction built by `make` around a fresh
    /// destination of type `ty`.
    pub fn emit(&mut self, ty: Idx, make: impl FnOnce(VarId) -> Instr) -> VarId {
        let dst = self.fresh_var(ty);
        self.push(make(dst));
        dst
    }

    pub fn emit_const(&mut self, ty: Idx, value: ConstValue) -> VarId {
        self.emit(ty, |dst| Instr::Const { dst, ty, value })
    }

    /// Add a complete φ to `block`; `edges` follow its predecessor order.
    pub fn add_phi(&mut self, block: BlockId, ty: Idx, edges: Vec<VarId>) -> VarId {
        let dst = self.fresh_var(ty);
        self.blocks[block.index()]
            .phis
            .push(Instr::Phi { dst, ty, edges });
        dst
    }

    pub fn preds(&self, block: BlockId) -> &[BlockId] {
        &self.blocks[block.index()].preds
    }

    // Variables

    pub fn write_var(&mut self, key: VarKey, value: VarId) {
        self.defs.insert((key, self.current), value);
    }

    /// Current value of `key` in the current block; `ty` types a φ placed
    /// on a miss.
    pub fn read_var(&mut self, key: VarKey, ty: Idx) -> VarId {
        if let Some(&v) = self.defs.get(&(key, self.current)) {
            return v;
        }
        let block = self.current;
        let phi = self.add_phi(block, ty, Vec::new());
        self.incomplete.push((block, key, phi));
        self.defs.insert((key, block), phi);
        phi
    }

    /// Read once every predecessor list is final. Always places a φ (even
    /// for a single predecessor) so unreachable single-predecessor cycles
    /// terminate; trivial φs are removed afterwards.
    fn read_var_sealed(&mut self, key: VarKey, block: BlockId, ty: Idx) -> VarId {
        if let Some(&v) = self.defs.get(&(key, block)) {
            return v;
        }
        let phi = self.add_phi(block, ty, Vec::new());
        if self.has_preds(block) {
            self.incomplete.push((block, key, phi));
        }
        self.defs.insert((key, block), phi);
        phi
    }

    // Terminators

    fn set_term(&mut self, term: Terminator) {
        let current = self.current;
        for succ in term.succs() {
            self.blocks[succ.index()].preds.push(current);
        }
        let block = &mut self.blocks[current.index()];
        debug_assert!(block.term.is_none(), "block {current} already terminated");
        block.term = Some(term);
    }

    pub fn jump(&mut self, target: BlockId) {
        self.set_term(Terminator::Jump(target));
    }

    pub fn branch(&mut self, cond: VarId, then: BlockId, els: BlockId) {
        if then == els {
            self.jump(then);
        } else {
            self.set_term(Terminator::If { cond, then, els });
        }
    }

    pub fn ret(&mut self, values: Vec<VarId>) {
        self.set_term(Terminator::Return(values));
    }

    pub fn panic(&mut self, value: VarId) {
        self.set_term(Terminator::Panic(value));
    }

    pub fn unreachable(&mut self) {
        self.set_term(Terminator::Unreachable);
    }

    // Finalization

    /// Seal all blocks, drop trivial φs, compute liveness from `entry`
    /// and `extra_roots`.
    pub fn finish(mut self, extra_roots: &[BlockId]) -> FinishedBody {
        for (i, bb) in self.blocks.iter_mut().enumerate() {
            if bb.term.is_none() {
                warn!(block = i, "unterminated block in SSA, adding Unreachable");
                bb.term = Some(Terminator::Unreachable);
            }
        }

        self.seal_all();
        let subst = self.remove_trivial_phis();

        let lookup = |v: VarId| resolve(&subst, v);
        let mut blocks: Vec<Block> = self
            .blocks
            .into_iter()
            .enumerate()
            .map(|(i, bb)| {
                let mut instrs = bb.phis;
                instrs.extend(bb.instrs);
                for instr in &mut instrs {
                    instr.map_operands(lookup);
                }
                let mut term = bb.term.unwrap_or(Terminator::Unreachable);
                term.map_operands(lookup);
                Block {
                    id: BlockId::new(i as u32),
                    comment: bb.comment,
                    succs: term.succs(),
                    instrs,
                    term,
                    preds: bb.preds,
                    live: false,
                    span: bb.span,
                }
            })
            .collect();

        let succs = |i: usize| {
            blocks[i]
                .succs
                .iter()
                .map(|s| s.index())
                .collect::<SmallVec<[usize; 2]>>()
        };
        let mut live = forward_reachable(blocks.len(), 0, succs);
        for root in extra_roots {
            let from_root = forward_reachable(blocks.len(), root.index(), succs);
            for (l, r) in live.iter_mut().zip(from_root) {
                *l |= r;
            }
        }
        for (block, live) in blocks.iter_mut().zip(live) {
            block.live = live;
        }

        FinishedBody {
            blocks,
            var_types: self.var_types,
        }
    }

    fn seal_all(&mut self) {
        while let Some((block, key, phi)) = self.incomplete.pop() {
            let ty = self.var_types[phi.index()];
            let preds = self.blocks[block.index()].preds.clone();
            let edges: Vec<VarId> = preds
                .into_iter()
                .map(|p| self.read_var_sealed(key, p, ty))
                .collect();
            if let Some(Instr::Phi { edges: slot, .. }) = self.blocks[block.index()]
                .phis
                .iter_mut()
                .find(|i| i.dst() == Some(phi))
            {
                *slot = edges;
            }
        }
    }

    /// Replace trivial φs until nothing changes; returns the substitution.
    fn remove_trivial_phis(&mut self) -> FxHashMap<VarId, VarId> {
        let mut subst: FxHashMap<VarId, VarId> = FxHashMap::default();
        let mut zeros: Vec<(usize, VarId, Idx)> = Vec::new();
        let mut changed = true;
        while changed {
            changed = false;
            for (bi, bb) in self.blocks.iter_mut().enumerate() {
                bb.phis.retain(|phi| {
                    let Instr::Phi { dst, ty, edges } = phi else {
                        return true;
                    };
                    let mut same = None;
                    for &op in edges {
                        let op = resolve(&subst, op);
                        if op == *dst || Some(op) == same {
                            continue;
                        }
                        if same.is_some() {
                            return true;
                        }
                        same = Some(op);
                    }
                    match same {
                        Some(v) => {
                            subst.insert(*dst, v);
                        }
                        None => zeros.push((bi, *dst, *ty)),
                    }
                    changed = true;
                    false
                });
            }
        }
        for (bi, dst, ty) in zeros {
            self.blocks[bi].instrs.insert(
                0,
                Instr::Const {
                    dst,
                    ty,
                    value: ConstValue::Nil,
                },
            );
        }
        subst
    }
}

fn resolve(subst: &FxHashMap<VarId, VarId>, mut v: VarId) -> VarId {
    while let Some(&next) = subst.get(&v) {
        v = next;
    }
    v
}
