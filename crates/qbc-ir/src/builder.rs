// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! FuncBuilder - instruction cursor positioned at one insertion point.

use crate::{
    BinOp, BlockId, FuncId, Function, Inst, IntCC, IrError, IrResult, IrType, Module, SlotId,
    Terminator, Value,
};

/// Emits into `func` at the current block. Owns no state of its own beyond
/// the insertion point, so a builder can be created and dropped per statement.
pub struct FuncBuilder<'m> {
    module: &'m mut Module,
    func: FuncId,
    block: BlockId,
}

impl<'m> FuncBuilder<'m> {
    pub fn new(module: &'m mut Module, func: FuncId, block: BlockId) -> Self {
        FuncBuilder { module, func, block }
    }

    /// Start the body of a declared function: creates its entry block.
    pub fn define(module: &'m mut Module, func: FuncId, entry_name: &str) -> IrResult<Self> {
        let function = module.function_mut(func);
        if function.has_body() {
            return Err(IrError::AlreadyDefined { name: function.name.clone() });
        }
        let block = function.create_block(entry_name);
        Ok(FuncBuilder { module, func, block })
    }

    pub fn module(&mut self) -> &mut Module {
        &mut *self.module
    }

    pub fn func_id(&self) -> FuncId {
        self.func
    }

    pub fn function(&self) -> &Function {
        self.module.function(self.func)
    }

    fn function_mut(&mut self) -> &mut Function {
        self.module.function_mut(self.func)
    }

    pub fn current_block(&self) -> BlockId {
        self.block
    }

    pub fn switch_to_block(&mut self, block: BlockId) {
        self.block = block;
    }

    pub fn create_block(&mut self, name: &str) -> BlockId {
        let id = self.function_mut().create_block(name);
        tracing::trace!(block = id.0, name, "created block");
        id
    }

    pub fn move_block_after(&mut self, block: BlockId, after: BlockId) {
        self.function_mut().move_block_after(block, after);
    }

    pub fn is_terminated(&self) -> bool {
        self.function().is_terminated(self.block)
    }

    pub fn value_type(&self, value: &Value) -> IrType {
        self.function().value_type(value)
    }

    // Entry-block code emitted through `entry` may follow the entry
    // terminator; everywhere else a terminated block is a codegen bug.
    fn push(&mut self, inst: Inst) {
        let block = self.block;
        debug_assert!(
            !self.function().is_terminated(block) || self.function().entry_block() == Some(block),
            "instruction emitted after terminator"
        );
        self.function_mut().block_mut(block).insts.push(inst);
    }

    fn terminate(&mut self, term: Terminator) {
        let block = self.block;
        let func = self.function_mut();
        let target = func.block_mut(block);
        if target.terminator.is_some() {
            tracing::warn!(block = %target.name, "block already terminated, dropping terminator");
            return;
        }
        target.terminator = Some(term);
    }

    /// A second cursor at the end of the entry block (before its
    /// terminator). This builder's insertion point is untouched. Values
    /// created there dominate every block of the function.
    pub fn entry(&mut self) -> FuncBuilder<'_> {
        let block = self.function().entry_block().unwrap_or(self.block);
        FuncBuilder { module: &mut *self.module, func: self.func, block }
    }

    pub fn param(&self, index: u32) -> Value {
        Value::Param(index)
    }

    pub fn stack_alloc(&mut self, ty: IrType, name: &str) -> Value {
        let slot: SlotId = self.function_mut().new_slot(ty, name);
        self.push(Inst::StackAlloc { slot });
        Value::Slot(slot)
    }

    pub fn load(&mut self, ty: IrType, addr: Value) -> Value {
        let dst = self.function_mut().new_value(ty);
        self.push(Inst::Load { dst, ty, addr });
        Value::Inst(dst)
    }

    pub fn store(&mut self, value: Value, addr: Value) {
        self.push(Inst::Store { value, addr });
    }

    /// Integer cast; same width is a no-op and returns `value` itself.
    pub fn int_cast(&mut self, value: Value, ty: IrType, signed: bool) -> Value {
        let from = self.value_type(&value);
        if from == ty {
            return value;
        }
        if let Value::Const { ty: cty, bits } = value {
            let v = if cty == IrType::I1 && signed { -bits } else { bits };
            return Value::iconst(ty, v);
        }
        let dst = self.function_mut().new_value(ty);
        self.push(Inst::IntCast { dst, value, ty, signed });
        Value::Inst(dst)
    }

    pub fn icmp(&mut self, cond: IntCC, lhs: Value, rhs: Value) -> Value {
        let dst = self.function_mut().new_value(IrType::I1);
        self.push(Inst::Icmp { dst, cond, lhs, rhs });
        Value::Inst(dst)
    }

    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Value {
        let ty = self.value_type(&lhs);
        let dst = self.function_mut().new_value(ty);
        self.push(Inst::Binary { dst, op, lhs, rhs });
        Value::Inst(dst)
    }

    /// Call `callee`; returns the result unless the callee returns void.
    pub fn call(&mut self, callee: FuncId, args: Vec<Value>) -> Option<Value> {
        let ret = self.module.function(callee).sig.ret;
        let dst = if ret == IrType::Void {
            None
        } else {
            Some(self.function_mut().new_value(ret))
        };
        self.push(Inst::Call { dst, callee, args });
        dst.map(Value::Inst)
    }

    /// Address of a string constant.
    pub fn string_ptr(&mut self, content: &str) -> Value {
        Value::Global(self.module.intern_string(content))
    }

    pub fn br(&mut self, target: BlockId) {
        self.terminate(Terminator::Br { target });
    }

    pub fn cond_br(&mut self, cond: Value, then_block: BlockId, else_block: BlockId) {
        self.terminate(Terminator::CondBr { cond, then_block, else_block });
    }

    pub fn ret(&mut self, value: Option<Value>) {
        self.terminate(Terminator::Ret { value });
    }
}
