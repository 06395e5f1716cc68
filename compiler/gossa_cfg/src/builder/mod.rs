//! Graph construction.
//!
//! A single walk over the statement tree. `current` is the block receiving
//! nodes; `jump`/`ifelse` close it. Branch targets come from a stack of
//! enclosing breakable statements and from the per-label table; forward
//! `goto`s create their label block on first mention.

use gossa_ast::{
    CaseClause, CommClause, ExprId, ExprKind, Package, RangeTarget, StmtId, StmtKind, TypeClause,
};
use gossa_diagnostic::{
    DiagnosticConfig, DiagnosticQueue, break_outside, continue_outside, duplicate_label,
    invalid_branch_label, misplaced_fallthrough, undefined_label,
};
use gossa_ir::{Name, Span, StringInterner, ensure_sufficient_stack};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::{BlockKind, Cfg, CfgBlock, CfgNode, MayReturn, forward_reachable};

type BlockIdx = u32;

/// Blocks associated with a label.
struct LabelBlocks {
    goto: BlockIdx,
    /// Set only while the labeled statement is being built.
    brk: Option<BlockIdx>,
    cont: Option<BlockIdx>,
    /// Span of the defining labeled statement.
    defined: Option<Span>,
}

/// Branch targets of one enclosing breakable statement.
#[derive(Copy, Clone, Default)]
struct Targets {
    brk: Option<BlockIdx>,
    cont: Option<BlockIdx>,
    fallthru: Option<BlockIdx>,
}

/// Where a `fallthrough` may appear while building the current clause.
#[derive(Copy, Clone)]
enum Fallthrough {
    None,
    /// The last statement of a non-final switch clause.
    Allowed(StmtId),
    FinalCase(StmtId),
    TypeSwitch(StmtId),
}

/// A `break L`/`continue L`/`goto L` checked once all labels are known.
struct LabelUse {
    span: Span,
    keyword: &'static str,
    label: Name,
}

struct Builder<'a> {
    pkg: &'a Package,
    interner: &'a StringInterner,
    may_return: &'a dyn MayReturn,
    blocks: Vec<CfgBlock>,
    current: Option<BlockIdx>,
    labels: FxHashMap<Name, LabelBlocks>,
    targets: Vec<Targets>,
    fallthrough: Fallthrough,
    label_uses: Vec<LabelUse>,
    diagnostics: DiagnosticQueue,
}

/// Build the graph of a function body.
pub fn build(
    pkg: &Package,
    interner: &StringInterner,
    body: &[StmtId],
    may_return: &dyn MayReturn,
) -> Cfg {
    let mut b = Builder {
        pkg,
        interner,
        may_return,
        blocks: Vec::new(),
        current: None,
        labels: FxHashMap::default(),
        targets: Vec::new(),
        fallthrough: Fallthrough::None,
        label_uses: Vec::new(),
        diagnostics: DiagnosticQueue::with_config(DiagnosticConfig::unlimited()),
    };
    let entry = b.new_block(BlockKind::Body, None);
    b.current = Some(entry);
    b.stmt_list(body);
    b.check_labels();

    let live = forward_reachable(b.blocks.len(), 0, |i| {
        b.blocks[i].succs.iter().map(|&s| s as usize).collect::<SmallVec<[usize; 2]>>()
    });
    for (block, live) in b.blocks.iter_mut().zip(live) {
        block.live = live;
    }
    debug!(
        blocks = b.blocks.len(),
        dead = b.blocks.iter().filter(|blk| !blk.live).count(),
        "built cfg"
    );
    Cfg {
        blocks: b.blocks,
        diagnostics: b.diagnostics.flush(),
    }
}

fn push_block(blocks: &mut Vec<CfgBlock>, kind: BlockKind, stmt: Option<StmtId>) -> BlockIdx {
    let index = blocks.len() as BlockIdx;
    blocks.push(CfgBlock {
        index,
        kind,
        stmt,
        nodes: Vec::new(),
        succs: SmallVec::new(),
        live: false,
    });
    index
}

impl Builder<'_> {
    fn new_block(&mut self, kind: BlockKind, stmt: Option<StmtId>) -> BlockIdx {
        push_block(&mut self.blocks, kind, stmt)
    }

    /// The block receiving nodes; code after a terminator lands in a fresh
    /// unreachable block.
    fn current(&mut self) -> BlockIdx {
        match self.current {
            Some(c) => c,
            None => {
                let c = self.new_block(BlockKind::Unreachable, None);
                self.current = Some(c);
                c
            }
        }
    }

    fn add(&mut self, node: CfgNode) {
        let c = self.current();
        self.blocks[c as usize].nodes.push(node);
    }

    fn jump(&mut self, target: BlockIdx) {
        let c = self.current();
        self.blocks[c as usize].succs.push(target);
        self.current = None;
    }

    fn ifelse(&mut self, then: BlockIdx, els: BlockIdx) {
        let c = self.current();
        self.blocks[c as usize].succs.extend([then, els]);
        self.current = None;
    }

    fn span(&self, stmt: StmtId) -> Span {
        self.pkg.stmt(stmt).span
    }

    fn label_blocks(&mut self, label: Name) -> &mut LabelBlocks {
        let blocks = &mut self.blocks;
        self.labels.entry(label).or_insert_with(|| LabelBlocks {
            goto: push_block(blocks, BlockKind::Label, None),
            brk: None,
            cont: None,
            defined: None,
        })
    }

    fn stmt_list(&mut self, list: &[StmtId]) {
        for &s in list {
            self.stmt(s, None);
        }
    }

    fn with_targets(&mut self, targets: Targets, body: &[StmtId]) {
        self.targets.push(targets);
        self.stmt_list(body);
        self.targets.pop();
    }

    fn stmt(&mut self, id: StmtId, label: Option<Name>) {
        ensure_sufficient_stack(|| self.stmt_inner(id, label));
    }

    fn stmt_inner(&mut self, id: StmtId, label: Option<Name>) {
        let pkg = self.pkg;
        match &pkg.stmt(id).kind {
            StmtKind::Empty
            | StmtKind::Define { .. }
            | StmtKind::Assign { .. }
            | StmtKind::OpAssign { .. }
            | StmtKind::IncDec { .. }
            | StmtKind::Send { .. }
            | StmtKind::Go(_)
            | StmtKind::Defer(_) => self.add(CfgNode::Stmt(id)),
            StmtKind::Expr(e) => {
                self.add(CfgNode::Stmt(id));
                let is_call = matches!(pkg.expr(*e).kind, ExprKind::Call { .. });
                if is_call && !self.may_return.may_return(pkg, *e) {
                    self.current = Some(self.new_block(BlockKind::Unreachable, Some(id)));
                }
            }
            StmtKind::Return(_) => {
                self.add(CfgNode::Stmt(id));
                self.current = Some(self.new_block(BlockKind::Unreachable, Some(id)));
            }
            StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Goto(_)
            | StmtKind::Fallthrough => self.branch(id),
            StmtKind::Block(list) => self.stmt_list(list),
            StmtKind::Labeled { label: name, stmt } => {
                let span = self.span(id);
                let text = self.interner.lookup(*name);
                let lb = self.label_blocks(*name);
                let (goto, first) = (lb.goto, lb.defined);
                if first.is_none() {
                    lb.defined = Some(span);
                }
                match first {
                    Some(first) => {
                        self.diagnostics.add(duplicate_label(span, first, text));
                    }
                    None => self.blocks[goto as usize].stmt = Some(id),
                }
                self.jump(goto);
                self.current = Some(goto);
                self.stmt(*stmt, Some(*name));
                if let Some(lb) = self.labels.get_mut(name) {
                    lb.brk = None;
                    lb.cont = None;
                }
            }
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => {
                if let Some(init) = init {
                    self.stmt(*init, None);
                }
                let then_block = self.new_block(BlockKind::IfThen, Some(id));
                let done = self.new_block(BlockKind::IfDone, Some(id));
                let else_block = match els {
                    Some(_) => self.new_block(BlockKind::IfElse, Some(id)),
                    None => done,
                };
                self.add(CfgNode::Expr(*cond));
                self.ifelse(then_block, else_block);
                self.current = Some(then_block);
                self.stmt_list(then);
                self.jump(done);
                if let Some(els) = els {
                    self.current = Some(else_block);
                    self.stmt(*els, None);
                    self.jump(done);
                }
                self.current = Some(done);
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => self.for_stmt(id, *init, *cond, *post, body, label),
            StmtKind::Range {
                key,
                value,
                x,
                body,
            } => self.range_stmt(id, *key, *value, *x, body, label),
            StmtKind::Switch { init, tag, clauses } => {
                self.switch_stmt(id, *init, *tag, clauses, label);
            }
            StmtKind::TypeSwitch { init, x, clauses } => {
                self.type_switch_stmt(id, *init, *x, clauses, label);
            }
            StmtKind::Select { clauses } => self.select_stmt(id, clauses, label),
        }
    }

    fn set_label_targets(&mut self, label: Option<Name>, brk: BlockIdx, cont: Option<BlockIdx>) {
        if let Some(lb) = label.and_then(|l| self.labels.get_mut(&l)) {
            lb.brk = Some(brk);
            lb.cont = cont;
        }
    }

    fn branch(&mut self, id: StmtId) {
        let span = self.span(id);
        let target = match self.pkg.stmt(id).kind {
            StmtKind::Break(Some(label)) => {
                let lb = self.label_blocks(label);
                let target = lb.brk;
                if target.is_none() {
                    self.label_uses.push(LabelUse {
                        span,
                        keyword: "break",
                        label,
                    });
                }
                target
            }
            StmtKind::Continue(Some(label)) => {
                let lb = self.label_blocks(label);
                let target = lb.cont;
                if target.is_none() {
                    self.label_uses.push(LabelUse {
                        span,
                        keyword: "continue",
                        label,
                    });
                }
                target
            }
            StmtKind::Break(None) => {
                let target = self.targets.iter().rev().find_map(|t| t.brk);
                if target.is_none() {
                    self.diagnostics.add(break_outside(span));
                }
                target
            }
            StmtKind::Continue(None) => {
                let target = self.targets.iter().rev().find_map(|t| t.cont);
                if target.is_none() {
                    self.diagnostics.add(continue_outside(span));
                }
                target
            }
            StmtKind::Goto(label) => {
                let goto = self.label_blocks(label).goto;
                self.label_uses.push(LabelUse {
                    span,
                    keyword: "goto",
                    label,
                });
                Some(goto)
            }
            _ => self.fallthrough_target(id, span),
        };
        let target = match target {
            Some(t) => t,
            None => self.new_block(BlockKind::Unreachable, Some(id)),
        };
        self.add(CfgNode::Stmt(id));
        self.jump(target);
        self.current = Some(self.new_block(BlockKind::Unreachable, Some(id)));
    }

    fn fallthrough_target(&mut self, id: StmtId, span: Span) -> Option<BlockIdx> {
        let reason = match self.fallthrough {
            Fallthrough::Allowed(s) if s == id => {
                return self.targets.last().and_then(|t| t.fallthru);
            }
            Fallthrough::FinalCase(s) if s == id => "cannot fallthrough final case in switch",
            Fallthrough::TypeSwitch(s) if s == id => "cannot fallthrough in type switch",
            _ => "not the last statement of a case clause",
        };
        self.diagnostics.add(misplaced_fallthrough(span, reason));
        None
    }

    /// Labels referenced by `goto` must exist; labels referenced by
    /// `break`/`continue` must also enclose the branch.
    fn check_labels(&mut self) {
        for u in std::mem::take(&mut self.label_uses) {
            let defined = self
                .labels
                .get(&u.label)
                .is_some_and(|lb| lb.defined.is_some());
            let text = self.interner.lookup(u.label);
            if !defined {
                self.diagnostics.add(undefined_label(u.span, u.keyword, text));
            } else if u.keyword != "goto" {
                self.diagnostics
                    .add(invalid_branch_label(u.span, u.keyword, text));
            }
        }
    }

    fn for_stmt(
        &mut self,
        id: StmtId,
        init: Option<StmtId>,
        cond: Option<ExprId>,
        post: Option<StmtId>,
        body: &[StmtId],
        label: Option<Name>,
    ) {
        if let Some(init) = init {
            self.stmt(init, None);
        }
        let body_block = self.new_block(BlockKind::ForBody, Some(id));
        let done = self.new_block(BlockKind::ForDone, Some(id));
        let loop_block = match cond {
            Some(_) => self.new_block(BlockKind::ForLoop, Some(id)),
            None => body_block,
        };
        let cont = match post {
            Some(_) => self.new_block(BlockKind::ForPost, Some(id)),
            None => loop_block,
        };
        self.set_label_targets(label, done, Some(cont));
        self.jump(loop_block);
        self.current = Some(loop_block);
        if let Some(cond) = cond {
            self.add(CfgNode::Expr(cond));
            self.ifelse(body_block, done);
            self.current = Some(body_block);
        }
        self.with_targets(
            Targets {
                brk: Some(done),
                cont: Some(cont),
                fallthru: None,
            },
            body,
        );
        self.jump(cont);
        if let Some(post) = post {
            self.current = Some(cont);
            self.stmt(post, None);
            self.jump(loop_block);
        }
        self.current = Some(done);
    }

    fn range_stmt(
        &mut self,
        id: StmtId,
        key: Option<RangeTarget>,
        value: Option<RangeTarget>,
        x: ExprId,
        body: &[StmtId],
        label: Option<Name>,
    ) {
        self.add(CfgNode::Expr(x));
        for target in [key, value].into_iter().flatten() {
            if let RangeTarget::Expr(e) = target {
                self.add(CfgNode::Expr(e));
            }
        }
        let loop_block = self.new_block(BlockKind::RangeLoop, Some(id));
        self.jump(loop_block);
        self.current = Some(loop_block);
        let body_block = self.new_block(BlockKind::RangeBody, Some(id));
        let done = self.new_block(BlockKind::RangeDone, Some(id));
        self.ifelse(body_block, done);
        self.current = Some(body_block);
        self.set_label_targets(label, done, Some(loop_block));
        self.with_targets(
            Targets {
                brk: Some(done),
                cont: Some(loop_block),
                fallthru: None,
            },
            body,
        );
        self.jump(loop_block);
        self.current = Some(done);
    }

    fn clause_body(&mut self, targets: Targets, fallthrough: Fallthrough, body: &[StmtId]) {
        let saved = std::mem::replace(&mut self.fallthrough, fallthrough);
        self.with_targets(targets, body);
        self.fallthrough = saved;
    }

    /// The default clause is moved to the end; each case body block is
    /// allocated one step early so `fallthrough` can target the next body
    /// in source order.
    fn switch_stmt(
        &mut self,
        id: StmtId,
        init: Option<StmtId>,
        tag: Option<ExprId>,
        clauses: &[CaseClause],
        label: Option<Name>,
    ) {
        if let Some(init) = init {
            self.stmt(init, None);
        }
        if let Some(tag) = tag {
            self.add(CfgNode::Expr(tag));
        }
        let done = self.new_block(BlockKind::SwitchDone, Some(id));
        self.set_label_targets(label, done, None);

        let mut default: Option<(&CaseClause, BlockIdx, BlockIdx, Fallthrough)> = None;
        let mut fallthru: Option<BlockIdx> = None;
        for (i, clause) in clauses.iter().enumerate() {
            let body = match fallthru {
                Some(b) => b,
                None => self.new_block(BlockKind::SwitchCaseBody, Some(id)),
            };
            let is_final = i + 1 == clauses.len();
            let next_body = if is_final {
                done
            } else {
                self.new_block(BlockKind::SwitchCaseBody, Some(id))
            };
            fallthru = Some(next_body);
            let ft = match clause.body.last() {
                Some(&last) if is_final => Fallthrough::FinalCase(last),
                Some(&last) => Fallthrough::Allowed(last),
                None => Fallthrough::None,
            };

            if clause.is_default() {
                default = Some((clause, body, next_body, ft));
                continue;
            }

            let mut next_cond = None;
            for &cond in &clause.exprs {
                let next = self.new_block(BlockKind::SwitchNextCase, Some(id));
                self.add(CfgNode::Expr(cond));
                self.ifelse(body, next);
                self.current = Some(next);
                next_cond = Some(next);
            }

            self.current = Some(body);
            self.clause_body(
                Targets {
                    brk: Some(done),
                    cont: None,
                    fallthru: Some(next_body),
                },
                ft,
                &clause.body,
            );
            self.jump(done);
            self.current = next_cond;
        }
        if let Some((clause, body, next_body, ft)) = default {
            self.jump(body);
            self.current = Some(body);
            self.clause_body(
                Targets {
                    brk: Some(done),
                    cont: None,
                    fallthru: Some(next_body),
                },
                ft,
                &clause.body,
            );
        }
        self.jump(done);
        self.current = Some(done);
    }

    fn type_switch_stmt(
        &mut self,
        id: StmtId,
        init: Option<StmtId>,
        x: ExprId,
        clauses: &[TypeClause],
        label: Option<Name>,
    ) {
        if let Some(init) = init {
            self.stmt(init, None);
        }
        self.add(CfgNode::Expr(x));
        let done = self.new_block(BlockKind::TypeSwitchDone, Some(id));
        self.set_label_targets(label, done, None);

        let mut default = None;
        for clause in clauses {
            if clause.is_default() {
                default = Some(clause);
                continue;
            }
            let body = self.new_block(BlockKind::TypeSwitchCaseBody, Some(id));
            let mut next = None;
            for _ in &clause.types {
                let n = self.new_block(BlockKind::TypeSwitchNextCase, Some(id));
                self.ifelse(body, n);
                self.current = Some(n);
                next = Some(n);
            }
            self.current = Some(body);
            self.type_case_body(clause, done);
            self.current = next;
        }
        match default {
            Some(clause) => self.type_case_body(clause, done),
            None => self.jump(done),
        }
        self.current = Some(done);
    }

    fn type_case_body(&mut self, clause: &TypeClause, done: BlockIdx) {
        let ft = clause
            .body
            .last()
            .map_or(Fallthrough::None, |&last| Fallthrough::TypeSwitch(last));
        self.clause_body(
            Targets {
                brk: Some(done),
                ..Targets::default()
            },
            ft,
            &clause.body,
        );
        self.jump(done);
    }

    /// Communication statements are evaluated up front; each case body is
    /// then guarded by a two-way branch. `select {}` leaves `done`
    /// unreachable.
    fn select_stmt(&mut self, id: StmtId, clauses: &[CommClause], label: Option<Name>) {
        for clause in clauses {
            if let Some(comm) = clause.comm {
                self.stmt(comm, None);
            }
        }
        let done = self.new_block(BlockKind::SelectDone, Some(id));
        self.set_label_targets(label, done, None);
        let targets = Targets {
            brk: Some(done),
            ..Targets::default()
        };

        let mut default = None;
        for clause in clauses {
            if clause.comm.is_none() {
                default = Some(clause);
                continue;
            }
            let body = self.new_block(BlockKind::SelectCaseBody, Some(id));
            let next = self.new_block(BlockKind::SelectAfterCase, Some(id));
            self.ifelse(body, next);
            self.current = Some(body);
            self.clause_body(targets, Fallthrough::None, &clause.body);
            self.jump(done);
            self.current = Some(next);
        }
        if let Some(clause) = default {
            self.clause_body(targets, Fallthrough::None, &clause.body);
            self.jump(done);
        }
        self.current = Some(done);
    }
}

#[cfg(test)]
mod tests;
