//! Structured control flow: branches, loops, switches and select.
//!
//! Every construct is lowered to blocks named after it (`if.then`,
//! `for.loop`, `range.body`, `switch.next`, ...). Targets of `break` and
//! `continue` live on [`FnLowerer::targets`]; labeled statements register
//! theirs in [`FnLowerer::labels`].

use gossa_ast::{
    CaseClause, CommClause, ExprId, ExprKind, RangeTarget, StmtId, StmtKind, TypeClause,
};
use gossa_diagnostic::malformed;
use gossa_ir::{BinaryOp, ConstValue, LocalId, Name, Span};
use gossa_types::{Idx, Tag};

use super::lower::{FnLowerer, Targets};
use crate::ir::{BlockId, Callee, Instr, SelectDir, SelectState, VarId};

/// A select case after its operands have been evaluated.
enum Comm {
    Send,
    /// `ordinal` counts receive cases only.
    Recv { ordinal: u32, elem: Idx, stmt: StmtId },
    Default,
}

impl<'p> FnLowerer<'_, 'p> {
    // Jumps

    /// Jump to `target`, or mark the block unreachable when there is none;
    /// either way, continue in a dead block.
    pub(super) fn jump_or_dead(&mut self, target: Option<BlockId>) {
        match target {
            Some(t) => self.b.jump(t),
            None => self.b.unreachable(),
        }
        self.b.start_dead_block();
    }

    pub(super) fn break_stmt(&mut self, label: Option<Name>) {
        let target = match label {
            Some(l) => self.labels.get(&l).and_then(|b| b.brk),
            None => self.targets.last().map(|t| t.brk),
        };
        self.jump_or_dead(target);
    }

    pub(super) fn continue_stmt(&mut self, label: Option<Name>) {
        let target = match label {
            Some(l) => self.labels.get(&l).and_then(|b| b.cont),
            None => self.targets.iter().rev().find_map(|t| t.cont),
        };
        self.jump_or_dead(target);
    }

    /// Claim the pending label for a statement with the given targets.
    fn bind_label(&mut self, brk: BlockId, cont: Option<BlockId>) {
        if let Some(label) = self.pending_label.take() {
            let blocks = self.label_blocks(label);
            blocks.brk = Some(brk);
            blocks.cont = cont;
        }
    }

    pub(super) fn labeled_stmt(&mut self, label: Name, stmt: StmtId) {
        let target = self.label_target(label);
        if !self.b.is_terminated() {
            self.b.jump(target);
        }
        self.b.position_at(target);
        let breakable = matches!(
            self.pkg().stmt(stmt).kind,
            StmtKind::For { .. }
                | StmtKind::Range { .. }
                | StmtKind::Switch { .. }
                | StmtKind::TypeSwitch { .. }
                | StmtKind::Select { .. }
        );
        if breakable {
            self.pending_label = Some(label);
        }
        self.stmt(stmt);
        self.pending_label = None;
    }

    fn cond(&mut self, e: ExprId) -> VarId {
        self.expr_as(e, Idx::NONE)
    }

    /// Jump to `target` unless the current block already ended.
    fn jump_if_open(&mut self, target: BlockId) {
        if !self.b.is_terminated() {
            self.b.jump(target);
        }
    }

    // If

    pub(super) fn if_stmt(
        &mut self,
        init: Option<StmtId>,
        cond: ExprId,
        then: &'p [StmtId],
        els: Option<StmtId>,
    ) {
        if let Some(init) = init {
            self.stmt(init);
        }
        let c = self.cond(cond);
        let then_b = self.b.new_block("if.then");
        let done = self.b.new_block("if.done");
        let else_b = match els {
            Some(_) => self.b.new_block("if.else"),
            None => done,
        };
        self.b.branch(c, then_b, else_b);

        self.b.position_at(then_b);
        self.stmts(then);
        self.jump_if_open(done);

        if let Some(els) = els {
            self.b.position_at(else_b);
            self.stmt(els);
            self.jump_if_open(done);
        }
        self.b.position_at(done);
    }

    // Loops

    pub(super) fn for_stmt(
        &mut self,
        init: Option<StmtId>,
        cond: Option<ExprId>,
        post: Option<StmtId>,
        body: &'p [StmtId],
    ) {
        let mut loop_locals: Vec<LocalId> = Vec::new();
        if let Some(init) = init {
            if let StmtKind::Define { lhs, .. } = &self.pkg().stmt(init).kind {
                loop_locals.extend(lhs.iter().flatten().copied());
            }
            self.stmt(init);
        }
        let head = self.b.new_block("for.loop");
        let body_b = self.b.new_block("for.body");
        let done = self.b.new_block("for.done");
        let cont = self.b.new_block("for.post");
        self.bind_label(done, Some(cont));
        self.b.jump(head);

        self.b.position_at(head);
        match cond {
            Some(c) => {
                let c = self.cond(c);
                self.b.branch(c, body_b, done);
            }
            None => self.b.jump(body_b),
        }

        self.b.position_at(body_b);
        self.targets.push(Targets {
            brk: done,
            cont: Some(cont),
        });
        self.stmts(body);
        self.targets.pop();
        self.jump_if_open(cont);

        // Each iteration sees its own copy of captured loop variables.
        self.b.position_at(cont);
        self.renew_cells(&loop_locals);
        if let Some(post) = post {
            self.stmt(post);
        }
        self.jump_if_open(head);

        self.b.position_at(done);
    }

    pub(super) fn range_stmt(
        &mut self,
        key: Option<RangeTarget>,
        value: Option<RangeTarget>,
        x: ExprId,
        body: &'p [StmtId],
        span: Span,
    ) {
        let xt = self.value_ty(x);
        let tag = self.pb.pool.under_tag(xt);
        match tag {
            Tag::String | Tag::Map => {
                self.range_iter(key, value, x, xt, tag != Tag::Map, body);
            }
            Tag::Chan => self.range_chan(key, x, xt, body),
            Tag::Slice | Tag::Array | Tag::Pointer => self.range_indexed(key, value, x, xt, body),
            t if t.is_integer() => self.range_indexed(key, None, x, xt, body),
            _ => {
                let what = "range over this operand";
                self.unsupported(span, what, Idx::INVALID);
            }
        }
    }

    /// Bind one range variable: a fresh local per iteration, or a store to
    /// an existing location.
    fn bind_range_target(&mut self, target: Option<RangeTarget>, v: VarId) {
        match target {
            None => {}
            Some(RangeTarget::Local(l)) => {
                let ty = self.local_ty(l);
                let v = self.conv(v, ty);
                self.define_local(l, Some(v));
            }
            Some(RangeTarget::Expr(e)) => {
                let lv = self.lvalue(e);
                let ty = self.lvalue_ty(lv);
                let v = self.conv(v, ty);
                self.store_lvalue(lv, v);
            }
        }
    }

    /// Loop header shared by counted loops: `body` runs while the counter
    /// (pre-incremented from -1) is below `len`.
    fn counted_loop(&mut self, len: VarId, counter_ty: Idx) -> (VarId, BlockId, BlockId, BlockId) {
        let counter = self.b.fresh_temp();
        let start = self.b.emit_const(counter_ty, ConstValue::Int(-1));
        self.b.write_var(counter, start);
        let head = self.b.new_block("range.loop");
        let body = self.b.new_block("range.body");
        let done = self.b.new_block("range.done");
        self.b.jump(head);

        self.b.position_at(head);
        let prev = self.b.read_var(counter, counter_ty);
        let one = self.b.emit_const(counter_ty, ConstValue::Int(1));
        let i = self.binop(BinaryOp::Add, prev, one, counter_ty);
        self.b.write_var(counter, i);
        let more = self.b.emit(Idx::BOOL, |dst| Instr::BinOp {
            dst,
            ty: Idx::BOOL,
            op: BinaryOp::Lt,
            x: i,
            y: len,
        });
        self.b.branch(more, body, done);
        (i, head, body, done)
    }

    /// Integers, slices, arrays and pointers to arrays.
    fn range_indexed(
        &mut self,
        key: Option<RangeTarget>,
        value: Option<RangeTarget>,
        x: ExprId,
        xt: Idx,
        body: &'p [StmtId],
    ) {
        let tag = self.pb.pool.under_tag(xt);
        let xv = self.expr_as(x, xt);
        let (len, counter_ty) = match tag {
            Tag::Slice => {
                let len = self.b.emit(Idx::INT, |dst| Instr::Call {
                    dst,
                    ty: Idx::INT,
                    callee: Callee::Builtin(gossa_ast::Builtin::Len),
                    args: vec![xv],
                });
                (len, Idx::INT)
            }
            Tag::Array | Tag::Pointer => {
                let arr = self.pb.pool.deref(xt);
                let n = self.pb.pool.array_len(arr);
                let len = self.b.emit_const(Idx::INT, ConstValue::Int(i128::from(n)));
                (len, Idx::INT)
            }
            _ => (xv, xt),
        };
        let (i, head, body_b, done) = self.counted_loop(len, counter_ty);
        self.bind_label(done, Some(head));

        self.b.position_at(body_b);
        self.bind_range_target(key, i);
        if value.is_some() {
            let elem = match tag {
                Tag::Array => {
                    let ety = self.pb.pool.elem(xt);
                    self.b.emit(ety, |dst| Instr::Index {
                        dst,
                        ty: ety,
                        x: xv,
                        index: i,
                    })
                }
                _ => {
                    let arr = if tag == Tag::Pointer {
                        self.pb.pool.deref(xt)
                    } else {
                        xt
                    };
                    let ety = self.pb.pool.elem(arr);
                    let ptr = self.pointer_to(ety);
                    let addr = self.b.emit(ptr, |dst| Instr::IndexAddr {
                        dst,
                        ty: ptr,
                        x: xv,
                        index: i,
                    });
                    self.load(addr, ety)
                }
            };
            self.bind_range_target(value, elem);
        }
        self.loop_body(body, done, head);
        self.b.position_at(done);
    }

    /// Strings and maps, through a runtime iterator.
    fn range_iter(
        &mut self,
        key: Option<RangeTarget>,
        value: Option<RangeTarget>,
        x: ExprId,
        xt: Idx,
        is_string: bool,
        body: &'p [StmtId],
    ) {
        let xv = self.expr_as(x, xt);
        let (kt, vt) = if is_string {
            (Idx::INT, Idx::RUNE)
        } else {
            (self.pb.pool.key(xt), self.pb.pool.elem(xt))
        };
        let next_ty = self.pb.pool.tuple(&[Idx::BOOL, kt, vt]);
        let iter = self.b.emit(Idx::INVALID, |dst| Instr::Range {
            dst,
            ty: Idx::INVALID,
            x: xv,
        });
        let head = self.b.new_block("range.loop");
        let body_b = self.b.new_block("range.body");
        let done = self.b.new_block("range.done");
        self.bind_label(done, Some(head));
        self.b.jump(head);

        self.b.position_at(head);
        let next = self.b.emit(next_ty, |dst| Instr::Next {
            dst,
            ty: next_ty,
            iter,
            is_string,
        });
        let ok = self.extract(next, 0, Idx::BOOL);
        self.b.branch(ok, body_b, done);

        self.b.position_at(body_b);
        if key.is_some() {
            let k = self.extract(next, 1, kt);
            self.bind_range_target(key, k);
        }
        if value.is_some() {
            let v = self.extract(next, 2, vt);
            self.bind_range_target(value, v);
        }
        self.loop_body(body, done, head);
        self.b.position_at(done);
    }

    /// Channels: receive until closed and drained.
    fn range_chan(&mut self, key: Option<RangeTarget>, x: ExprId, xt: Idx, body: &'p [StmtId]) {
        let ch = self.expr_as(x, xt);
        let elem = self.pb.pool.elem(xt);
        let recv_ty = self.pb.pool.tuple(&[elem, Idx::BOOL]);
        let head = self.b.new_block("range.loop");
        let body_b = self.b.new_block("range.body");
        let done = self.b.new_block("range.done");
        self.bind_label(done, Some(head));
        self.b.jump(head);

        self.b.position_at(head);
        let r = self.b.emit(recv_ty, |dst| Instr::Recv {
            dst,
            ty: recv_ty,
            ch,
            comma_ok: true,
        });
        let ok = self.extract(r, 1, Idx::BOOL);
        self.b.branch(ok, body_b, done);

        self.b.position_at(body_b);
        if key.is_some() {
            let v = self.extract(r, 0, elem);
            self.bind_range_target(key, v);
        }
        self.loop_body(body, done, head);
        self.b.position_at(done);
    }

    fn loop_body(&mut self, body: &'p [StmtId], brk: BlockId, cont: BlockId) {
        self.targets.push(Targets {
            brk,
            cont: Some(cont),
        });
        self.stmts(body);
        self.targets.pop();
        self.jump_if_open(cont);
    }

    pub(super) fn extract(&mut self, tuple: VarId, index: u32, ty: Idx) -> VarId {
        self.b.emit(ty, |dst| Instr::Extract {
            dst,
            ty,
            tuple,
            index,
        })
    }

    // Switches

    /// Lower clause bodies in source order; `fallthrough` reaches the next
    /// clause's body.
    fn clause_bodies<C>(
        &mut self,
        clauses: &'p [C],
        blocks: &[BlockId],
        done: BlockId,
        mut prologue: impl FnMut(&mut Self, usize),
        body_of: impl Fn(&'p C) -> &'p [StmtId],
    ) {
        let saved = self.fallthrough;
        self.targets.push(Targets {
            brk: done,
            cont: None,
        });
        for (i, clause) in clauses.iter().enumerate() {
            self.b.position_at(blocks[i]);
            self.fallthrough = blocks.get(i + 1).copied();
            prologue(self, i);
            self.stmts(body_of(clause));
            self.jump_if_open(done);
        }
        self.targets.pop();
        self.fallthrough = saved;
    }

    pub(super) fn switch_stmt(
        &mut self,
        init: Option<StmtId>,
        tag: Option<ExprId>,
        clauses: &'p [CaseClause],
    ) {
        if let Some(init) = init {
            self.stmt(init);
        }
        let tag = tag.map(|t| {
            let ty = self.value_ty(t);
            (self.expr_as(t, ty), ty)
        });
        let done = self.b.new_block("switch.done");
        self.bind_label(done, None);
        let bodies: Vec<BlockId> = clauses
            .iter()
            .map(|_| self.b.new_block("switch.body"))
            .collect();

        let mut default = None;
        for (i, clause) in clauses.iter().enumerate() {
            if clause.is_default() {
                default = Some(bodies[i]);
                continue;
            }
            for &e in &clause.exprs {
                let c = match tag {
                    Some((tv, tt)) => self.case_matches(tv, tt, e),
                    None => self.cond(e),
                };
                let next = self.b.new_block("switch.next");
                self.b.branch(c, bodies[i], next);
                self.b.position_at(next);
            }
        }
        self.b.jump(default.unwrap_or(done));

        self.clause_bodies(clauses, &bodies, done, |_, _| {}, |c| c.body.as_slice());
        self.b.position_at(done);
    }

    /// `tag == e`, boxing the concrete side when one side is an interface.
    fn case_matches(&mut self, tv: VarId, tt: Idx, e: ExprId) -> VarId {
        let et = self.expr_ty(e);
        let box_tag = {
            let pool = &*self.pb.pool;
            !pool.tag(et).is_untyped() && pool.is_interface(et) && !pool.is_interface(tt)
        };
        let (x, y) = if box_tag {
            let ev = self.expr(e);
            (self.conv(tv, et), ev)
        } else {
            (tv, self.expr_as(e, tt))
        };
        self.b.emit(Idx::BOOL, |dst| Instr::BinOp {
            dst,
            ty: Idx::BOOL,
            op: BinaryOp::Eq,
            x,
            y,
        })
    }

    pub(super) fn type_switch_stmt(
        &mut self,
        init: Option<StmtId>,
        x: ExprId,
        clauses: &'p [TypeClause],
    ) {
        if let Some(init) = init {
            self.stmt(init);
        }
        let xv = self.expr(x);
        let xt = self.b.var_type(xv);
        let done = self.b.new_block("switch.done");
        self.bind_label(done, None);
        let bodies: Vec<BlockId> = clauses
            .iter()
            .map(|_| self.b.new_block("typeswitch.body"))
            .collect();

        // Value bound by single-type clauses, asserted in the test block
        // that branches to the clause.
        let mut asserted: Vec<Option<VarId>> = vec![None; clauses.len()];
        let mut default = None;
        for (i, clause) in clauses.iter().enumerate() {
            if clause.types.is_empty() {
                default = Some(bodies[i]);
                continue;
            }
            for &t in &clause.types {
                let ok = match t {
                    None => {
                        let nil = self.zero(xt);
                        self.b.emit(Idx::BOOL, |dst| Instr::BinOp {
                            dst,
                            ty: Idx::BOOL,
                            op: BinaryOp::Eq,
                            x: xv,
                            y: nil,
                        })
                    }
                    Some(t) => {
                        let t = self.pb.ty(t);
                        let pair_ty = self.pb.pool.tuple(&[t, Idx::BOOL]);
                        let pair = self.b.emit(pair_ty, |dst| Instr::TypeAssert {
                            dst,
                            ty: pair_ty,
                            x: xv,
                            asserted: t,
                            comma_ok: true,
                        });
                        if clause.types.len() == 1 {
                            asserted[i] = Some(self.extract(pair, 0, t));
                        }
                        self.extract(pair, 1, Idx::BOOL)
                    }
                };
                let next = self.b.new_block("typeswitch.next");
                self.b.branch(ok, bodies[i], next);
                self.b.position_at(next);
            }
        }
        self.b.jump(default.unwrap_or(done));

        let bind = |lw: &mut Self, i: usize| {
            if let Some(l) = clauses[i].local {
                let v = asserted[i].unwrap_or(xv);
                let ty = lw.local_ty(l);
                let v = lw.conv(v, ty);
                lw.define_local(l, Some(v));
            }
        };
        self.clause_bodies(clauses, &bodies, done, bind, |c| c.body.as_slice());
        self.b.position_at(done);
    }

    // Select

    pub(super) fn select_stmt(&mut self, clauses: &'p [CommClause]) {
        let mut states = Vec::new();
        let mut comms = Vec::with_capacity(clauses.len());
        let mut tuple = vec![Idx::INT, Idx::BOOL];
        for clause in clauses {
            let Some(comm) = clause.comm else {
                comms.push(Comm::Default);
                continue;
            };
            match self.select_state(comm) {
                Some((state, elem)) => {
                    if state.dir == SelectDir::Recv {
                        comms.push(Comm::Recv {
                            ordinal: (tuple.len() - 2) as u32,
                            elem,
                            stmt: comm,
                        });
                        tuple.push(elem);
                    } else {
                        comms.push(Comm::Send);
                    }
                    states.push(state);
                }
                None => {
                    let span = self.pkg().stmt(comm).span;
                    self.pb.report(malformed(span, "select case"));
                    return;
                }
            }
        }

        let has_default = comms.iter().any(|c| matches!(c, Comm::Default));
        let ty = self.pb.pool.tuple(&tuple);
        let result = self.b.emit(ty, |dst| Instr::Select {
            dst,
            ty,
            states,
            blocking: !has_default,
        });
        if clauses.is_empty() {
            // `select {}` blocks forever.
            self.b.unreachable();
            self.b.start_dead_block();
            return;
        }

        let index = self.extract(result, 0, Idx::INT);
        let done = self.b.new_block("select.done");
        self.bind_label(done, None);
        self.targets.push(Targets {
            brk: done,
            cont: None,
        });
        let mut default_body = None;
        let mut k = 0i128;
        for (clause, comm) in clauses.iter().zip(&comms) {
            if matches!(comm, Comm::Default) {
                default_body = Some(&clause.body);
                continue;
            }
            let body = self.b.new_block("select.body");
            let next = self.b.new_block("select.next");
            let kv = self.b.emit_const(Idx::INT, ConstValue::Int(k));
            k += 1;
            let hit = self.b.emit(Idx::BOOL, |dst| Instr::BinOp {
                dst,
                ty: Idx::BOOL,
                op: BinaryOp::Eq,
                x: index,
                y: kv,
            });
            self.b.branch(hit, body, next);

            self.b.position_at(body);
            if let Comm::Recv {
                ordinal,
                elem,
                stmt,
            } = *comm
            {
                let v = self.extract(result, 2 + ordinal, elem);
                let ok = self.extract(result, 1, Idx::BOOL);
                self.bind_select_recv(stmt, v, ok);
            }
            self.stmts(&clause.body);
            self.jump_if_open(done);
            self.b.position_at(next);
        }
        match default_body {
            Some(body) => {
                self.stmts(body);
                self.jump_if_open(done);
            }
            None => self.b.unreachable(),
        }
        self.targets.pop();
        self.b.position_at(done);
    }

    /// Evaluate the channel (and value) of one select case.
    fn select_state(&mut self, comm: StmtId) -> Option<(SelectState, Idx)> {
        let pkg = self.pkg();
        let recv_of = |e: ExprId| match pkg.expr(e).kind {
            ExprKind::Recv { ch, .. } => Some(ch),
            _ => None,
        };
        let ch = match &pkg.stmt(comm).kind {
            StmtKind::Send { ch, value } => {
                let ct = self.value_ty(*ch);
                let elem = self.pb.pool.elem(ct);
                let ch = self.expr_as(*ch, ct);
                let value = self.expr_as(*value, elem);
                return Some((
                    SelectState {
                        dir: SelectDir::Send,
                        ch,
                        value: Some(value),
                    },
                    elem,
                ));
            }
            StmtKind::Expr(e) => recv_of(*e)?,
            StmtKind::Define { rhs, .. } | StmtKind::Assign { rhs, .. } => match rhs.as_slice() {
                [e] => recv_of(*e)?,
                _ => return None,
            },
            _ => return None,
        };
        let ct = self.value_ty(ch);
        let elem = self.pb.pool.elem(ct);
        let ch = self.expr_as(ch, ct);
        Some((
            SelectState {
                dir: SelectDir::Recv,
                ch,
                value: None,
            },
            elem,
        ))
    }

    /// `v := <-ch`, `v, ok = <-ch`, ... in a taken select case.
    fn bind_select_recv(&mut self, comm: StmtId, v: VarId, ok: VarId) {
        let values = [v, ok];
        match &self.pkg().stmt(comm).kind {
            StmtKind::Define { lhs, .. } => {
                for (l, &v) in lhs.iter().zip(&values) {
                    if let Some(l) = l {
                        let ty = self.local_ty(*l);
                        let v = self.conv(v, ty);
                        self.declare(*l, Some(v));
                    }
                }
            }
            StmtKind::Assign { lhs, .. } => {
                let lvs: Vec<_> = lhs.iter().map(|&e| self.lvalue(e)).collect();
                for (lv, &v) in lvs.into_iter().zip(&values) {
                    let ty = self.lvalue_ty(lv);
                    let v = self.conv(v, ty);
                    self.store_lvalue(lv, v);
                }
            }
            _ => {}
        }
    }
}
