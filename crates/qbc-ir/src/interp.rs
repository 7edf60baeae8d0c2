// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Reference evaluator for IR modules.
//!
//! Executes defined functions on 64-bit integer values. Addresses are tagged
//! integers: stack cells, string globals and functions live in separate
//! ranges. Calls to functions without a body are recorded and return 0.

use std::collections::HashMap;

use thiserror::Error;

use crate::{BinOp, BlockId, FuncId, Function, Inst, IrType, Module, SlotId, Terminator, Value};

const TAG_SHIFT: u32 = 48;
const STACK_TAG: i64 = 1 << TAG_SHIFT;
const GLOBAL_TAG: i64 = 2 << TAG_SHIFT;
const FUNC_TAG: i64 = 3 << TAG_SHIFT;
const TAG_MASK: i64 = !((1 << TAG_SHIFT) - 1);

const DEFAULT_STEP_LIMIT: u64 = 1_000_000;
const MAX_CALL_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpError {
    #[error("no function named `{0}`")]
    UnknownFunction(String),

    #[error("function `{0}` has no body")]
    NoBody(String),

    #[error("`{function}` expects {expected} arguments, got {found}")]
    Arity { function: String, expected: usize, found: usize },

    #[error("block `{block}` in `{function}` has no terminator")]
    Unterminated { function: String, block: String },

    #[error("slot {0} used before its allocation executed")]
    UnallocatedSlot(u32),

    #[error("invalid memory access at {0:#x}")]
    BadAddress(i64),

    #[error("division by zero")]
    DivisionByZero,

    #[error("step limit of {0} exceeded")]
    StepLimit(u64),

    #[error("call depth limit exceeded")]
    StackOverflow,
}

pub type InterpResult<T> = Result<T, InterpError>;

/// A call to an imported function, as observed by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternCall {
    pub name: String,
    pub args: Vec<i64>,
}

struct Frame<'f> {
    func: &'f Function,
    args: Vec<i64>,
    slots: HashMap<SlotId, i64>,
    values: Vec<i64>,
}

pub struct Interpreter<'m> {
    module: &'m Module,
    memory: Vec<i64>,
    extern_calls: Vec<ExternCall>,
    steps: u64,
    step_limit: u64,
    depth: usize,
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m Module) -> Self {
        Interpreter {
            module,
            memory: Vec::new(),
            extern_calls: Vec::new(),
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
            depth: 0,
        }
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    /// Calls to imported functions, in execution order.
    pub fn extern_calls(&self) -> &[ExternCall] {
        &self.extern_calls
    }

    /// Content of the string global an address points at.
    pub fn string_at(&self, addr: i64) -> Option<&'m str> {
        if addr & TAG_MASK != GLOBAL_TAG {
            return None;
        }
        let module = self.module;
        let index = (addr & !TAG_MASK) as usize;
        module.globals().get(index).map(|g| g.content.as_str())
    }

    /// Run the function `name`. Returns `None` for void functions.
    pub fn call(&mut self, name: &str, args: &[i64]) -> InterpResult<Option<i64>> {
        let id = self
            .module
            .get_function(name)
            .ok_or_else(|| InterpError::UnknownFunction(name.to_string()))?;
        let func = self.module.function(id);
        if !func.has_body() {
            return Err(InterpError::NoBody(name.to_string()));
        }
        self.invoke(id, args.to_vec())
    }

    fn invoke(&mut self, id: FuncId, args: Vec<i64>) -> InterpResult<Option<i64>> {
        let module = self.module;
        let func = module.function(id);
        let expected = func.sig.params.len();
        let arity_ok = if func.sig.variadic { args.len() >= expected } else { args.len() == expected };
        if !arity_ok {
            return Err(InterpError::Arity {
                function: func.name.clone(),
                expected,
                found: args.len(),
            });
        }

        if !func.has_body() {
            tracing::trace!(name = %func.name, ?args, "extern call");
            self.extern_calls.push(ExternCall { name: func.name.clone(), args });
            return Ok((func.sig.ret != IrType::Void).then_some(0));
        }

        if self.depth >= MAX_CALL_DEPTH {
            return Err(InterpError::StackOverflow);
        }
        self.depth += 1;
        let args = args
            .iter()
            .zip(&func.sig.params)
            .map(|(v, ty)| ty.wrap(*v))
            .collect();
        let mut frame = Frame {
            func,
            args,
            slots: HashMap::new(),
            values: vec![0; func.value_types.len()],
        };
        let result = self.run(&mut frame);
        self.depth -= 1;
        result
    }

    fn run(&mut self, frame: &mut Frame<'m>) -> InterpResult<Option<i64>> {
        let func = frame.func;
        let Some(mut block) = func.entry_block() else {
            return Err(InterpError::NoBody(func.name.clone()));
        };
        loop {
            block = match self.run_block(frame, block)? {
                Flow::Jump(next) => next,
                Flow::Return(value) => return Ok(value),
            };
        }
    }

    fn run_block(&mut self, frame: &mut Frame<'m>, id: BlockId) -> InterpResult<Flow> {
        let func = frame.func;
        let block = func.block(id);
        for inst in &block.insts {
            self.tick()?;
            self.exec(frame, inst)?;
        }
        self.tick()?;
        match &block.terminator {
            Some(Terminator::Br { target }) => Ok(Flow::Jump(*target)),
            Some(Terminator::CondBr { cond, then_block, else_block }) => {
                let c = self.eval(frame, cond)?;
                Ok(Flow::Jump(if c != 0 { *then_block } else { *else_block }))
            }
            Some(Terminator::Ret { value }) => {
                let v = match value {
                    Some(v) => Some(func.sig.ret.wrap(self.eval(frame, v)?)),
                    None => None,
                };
                Ok(Flow::Return(v))
            }
            None => Err(InterpError::Unterminated {
                function: func.name.clone(),
                block: block.name.clone(),
            }),
        }
    }

    fn tick(&mut self) -> InterpResult<()> {
        self.steps += 1;
        if self.steps > self.step_limit {
            return Err(InterpError::StepLimit(self.step_limit));
        }
        Ok(())
    }

    fn exec(&mut self, frame: &mut Frame<'m>, inst: &Inst) -> InterpResult<()> {
        match inst {
            Inst::StackAlloc { slot } => {
                if !frame.slots.contains_key(slot) {
                    let addr = STACK_TAG | self.memory.len() as i64;
                    self.memory.push(0);
                    frame.slots.insert(*slot, addr);
                }
            }
            Inst::Load { dst, ty, addr } => {
                let addr = self.eval(frame, addr)?;
                let cell = self.cell(addr)?;
                frame.values[dst.0 as usize] = ty.wrap(self.memory[cell]);
            }
            Inst::Store { value, addr } => {
                let v = self.eval(frame, value)?;
                let addr = self.eval(frame, addr)?;
                let cell = self.cell(addr)?;
                self.memory[cell] = v;
            }
            Inst::IntCast { dst, value, ty, signed } => {
                let from = frame.func.value_type(value);
                let v = self.eval(frame, value)?;
                let v = if *signed {
                    // i1 is stored as 0/1, wider types already sign-extended
                    if from == IrType::I1 { -(v & 1) } else { v }
                } else {
                    // values are kept sign-extended; zero-extend from the source width
                    match from.bits() {
                        64 => v,
                        bits => v & ((1i64 << bits) - 1),
                    }
                };
                frame.values[dst.0 as usize] = ty.wrap(v);
            }
            Inst::Icmp { dst, cond, lhs, rhs } => {
                let l = self.eval(frame, lhs)?;
                let r = self.eval(frame, rhs)?;
                frame.values[dst.0 as usize] = cond.eval(l, r) as i64;
            }
            Inst::Binary { dst, op, lhs, rhs } => {
                let ty = frame.func.value_types[dst.0 as usize];
                let l = self.eval(frame, lhs)?;
                let r = self.eval(frame, rhs)?;
                let v = match op {
                    BinOp::Add => l.wrapping_add(r),
                    BinOp::Sub => l.wrapping_sub(r),
                    BinOp::Mul => l.wrapping_mul(r),
                    BinOp::SDiv if r == 0 => return Err(InterpError::DivisionByZero),
                    BinOp::SDiv => l.wrapping_div(r),
                    BinOp::SRem if r == 0 => return Err(InterpError::DivisionByZero),
                    BinOp::SRem => l.wrapping_rem(r),
                };
                frame.values[dst.0 as usize] = ty.wrap(v);
            }
            Inst::Call { dst, callee, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval(frame, a))
                    .collect::<InterpResult<Vec<_>>>()?;
                let result = self.invoke(*callee, args)?;
                if let Some(dst) = dst {
                    frame.values[dst.0 as usize] = result.unwrap_or(0);
                }
            }
        }
        Ok(())
    }

    fn eval(&self, frame: &Frame<'m>, value: &Value) -> InterpResult<i64> {
        Ok(match value {
            Value::Const { bits, .. } => *bits,
            Value::Inst(id) => frame.values[id.0 as usize],
            Value::Param(i) => frame.args.get(*i as usize).copied().unwrap_or(0),
            Value::Slot(slot) => *frame.slots.get(slot).ok_or(InterpError::UnallocatedSlot(slot.0))?,
            Value::Global(id) => GLOBAL_TAG | id.0 as i64,
            Value::Func(id) => FUNC_TAG | id.0 as i64,
        })
    }

    fn cell(&self, addr: i64) -> InterpResult<usize> {
        let index = (addr & !TAG_MASK) as usize;
        if addr & TAG_MASK != STACK_TAG || index >= self.memory.len() {
            return Err(InterpError::BadAddress(addr));
        }
        Ok(index)
    }
}

enum Flow {
    Jump(BlockId),
    Return(Option<i64>),
}
