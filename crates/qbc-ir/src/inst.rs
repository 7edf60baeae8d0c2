// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! IR instructions, terminators and operands.

use crate::{BlockId, FuncId, IrType, SlotId, ValueId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub u32);

/// An operand: a constant, an instruction result, an incoming parameter,
/// or the address of a slot, a global or a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Const { ty: IrType, bits: i64 },
    Inst(ValueId),
    Param(u32),
    Slot(SlotId),
    Global(GlobalId),
    Func(FuncId),
}

impl Value {
    pub fn iconst(ty: IrType, v: i64) -> Value {
        Value::Const { ty, bits: ty.wrap(v) }
    }

    pub fn bool(v: bool) -> Value {
        Value::Const { ty: IrType::I1, bits: v as i64 }
    }

    pub fn as_const(&self) -> Option<i64> {
        match self {
            Value::Const { bits, .. } => Some(*bits),
            _ => None,
        }
    }
}

/// Integer comparison condition. Ordered comparisons are signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntCC {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl IntCC {
    pub fn eval(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            IntCC::Eq => lhs == rhs,
            IntCC::Ne => lhs != rhs,
            IntCC::Slt => lhs < rhs,
            IntCC::Sle => lhs <= rhs,
            IntCC::Sgt => lhs > rhs,
            IntCC::Sge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
}

/// Straight-line instruction - no control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    /// Reserve the stack slot `slot` (type and name live in the function's slot table).
    StackAlloc {
        slot: SlotId,
    },
    Load {
        dst: ValueId,
        ty: IrType,
        addr: Value,
    },
    Store {
        value: Value,
        addr: Value,
    },
    IntCast {
        dst: ValueId,
        value: Value,
        ty: IrType,
        signed: bool,
    },
    Icmp {
        dst: ValueId,
        cond: IntCC,
        lhs: Value,
        rhs: Value,
    },
    Binary {
        dst: ValueId,
        op: BinOp,
        lhs: Value,
        rhs: Value,
    },
    Call {
        dst: Option<ValueId>,
        callee: FuncId,
        args: Vec<Value>,
    },
}

/// Ends a basic block.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Br {
        target: BlockId,
    },
    CondBr {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    Ret {
        value: Option<Value>,
    },
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br { target } => vec![*target],
            Terminator::CondBr { then_block, else_block, .. } => vec![*then_block, *else_block],
            Terminator::Ret { .. } => Vec::new(),
        }
    }
}
