use gossa_ast::Builtin;
use gossa_ir::{BinaryOp, Name};
use gossa_types::Idx;
use pretty_assertions::assert_eq;
use smallvec::SmallVec;

use super::*;

fn v(n: u32) -> VarId {
    VarId::new(n)
}

#[test]
fn id_display() {
    assert_eq!(v(3).to_string(), "t3");
    assert_eq!(BlockId::new(0).to_string(), "b0");
    assert_eq!(format!("{:?}", FnId::new(7)), "f7");
}

#[test]
fn operands_follow_evaluation_order() {
    let call = Instr::Call {
        dst: v(9),
        ty: Idx::INT,
        callee: Callee::Invoke {
            recv: v(1),
            method: Name::EMPTY,
        },
        args: vec![v(2), v(3)],
    };
    assert_eq!(call.operands().as_slice(), &[v(1), v(2), v(3)]);
    assert_eq!(call.dst(), Some(v(9)));

    let slice = Instr::Slice {
        dst: v(5),
        ty: Idx::STRING,
        x: v(0),
        low: None,
        high: Some(v(4)),
        max: None,
    };
    assert_eq!(slice.operands().as_slice(), &[v(0), v(4)]);

    let select = Instr::Select {
        dst: v(8),
        ty: Idx::INVALID,
        states: vec![
            SelectState {
                dir: SelectDir::Send,
                ch: v(1),
                value: Some(v(2)),
            },
            SelectState {
                dir: SelectDir::Recv,
                ch: v(3),
                value: None,
            },
        ],
        blocking: true,
    };
    assert_eq!(select.operands().as_slice(), &[v(1), v(2), v(3)]);
}

#[test]
fn effects_define_nothing() {
    let store = Instr::Store {
        addr: v(0),
        value: v(1),
    };
    assert_eq!(store.dst(), None);
    assert_eq!(Instr::RunDefers.dst(), None);
    assert!(Instr::RunDefers.operands().is_empty());
    let go = Instr::Go {
        callee: Callee::Builtin(Builtin::Println),
        args: vec![v(4)],
    };
    assert_eq!(go.operands().as_slice(), &[v(4)]);
}

#[test]
fn map_operands_rewrites_every_use() {
    let mut instr = Instr::BinOp {
        dst: v(2),
        ty: Idx::INT,
        op: BinaryOp::Add,
        x: v(0),
        y: v(1),
    };
    instr.map_operands(|x| VarId::new(x.raw() + 10));
    assert_eq!(instr.operands().as_slice(), &[v(10), v(11)]);
    // The destination is not an operand.
    assert_eq!(instr.dst(), Some(v(2)));

    let mut phi = Instr::Phi {
        dst: v(3),
        ty: Idx::INT,
        edges: vec![v(0), v(0), v(1)],
    };
    phi.map_operands(|x| if x == v(0) { v(7) } else { x });
    assert_eq!(phi.operands().as_slice(), &[v(7), v(7), v(1)]);

    let mut term = Terminator::Return(vec![v(1), v(2)]);
    term.map_operands(|_| v(0));
    assert_eq!(term, Terminator::Return(vec![v(0), v(0)]));
}

#[test]
fn terminator_successors() {
    let (b1, b2) = (BlockId::new(1), BlockId::new(2));
    let branch = Terminator::If {
        cond: v(0),
        then: b1,
        els: b2,
    };
    let expected: SmallVec<[BlockId; 2]> = smallvec::smallvec![b1, b2];
    assert_eq!(branch.succs(), expected);
    assert_eq!(branch.operands().as_slice(), &[v(0)]);
    assert_eq!(branch.kind(), "if");
    assert!(Terminator::Panic(v(0)).succs().is_empty());
    assert!(Terminator::Unreachable.succs().is_empty());
    assert_eq!(Terminator::Jump(b2).succs().as_slice(), &[b2]);
}
