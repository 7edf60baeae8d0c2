// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Function translator - lowers one qbc IR function to Cranelift IR.

use cranelift::prelude::*;
use cranelift_codegen::ir::{FuncRef, Function, GlobalValue, MemFlags, StackSlot};
use cranelift_codegen::isa::CallConv;
use cranelift_frontend::{FunctionBuilder as ClifFunctionBuilder, FunctionBuilderContext};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use qbc_ir::{BinOp, BlockId, FuncId, GlobalId, Inst, IrType, SlotId, Terminator, ValueId};
use crate::types::{align_shift, ir_signature, ir_to_cranelift_type};
use crate::{CodegenError, CodegenResult};

pub struct FunctionTranslator<'a> {
    func: &'a mut Function,
    builder_ctx: FunctionBuilderContext,
    lowering: Lowering<'a>,
}

/// Everything the per-instruction lowering reads or fills in. Kept apart
/// from `func` so it can be borrowed next to the Cranelift builder.
struct Lowering<'a> {
    module: &'a qbc_ir::Module,
    ir_fn: &'a qbc_ir::Function,
    /// Pre-imported function references (IR function → Cranelift FuncRef)
    func_refs: &'a HashMap<FuncId, FuncRef>,
    /// String data (IR global → GlobalValue for the data address)
    string_globals: &'a HashMap<GlobalId, GlobalValue>,
    ptr_ty: Type,
    call_conv: CallConv,

    block_map: HashMap<BlockId, Block>,
    slot_map: HashMap<SlotId, StackSlot>,
    values: HashMap<ValueId, Value>,
    params: Vec<Value>,
}

impl<'a> FunctionTranslator<'a> {
    pub fn new(
        func: &'a mut Function,
        module: &'a qbc_ir::Module,
        ir_fn: &'a qbc_ir::Function,
        func_refs: &'a HashMap<FuncId, FuncRef>,
        string_globals: &'a HashMap<GlobalId, GlobalValue>,
        ptr_ty: Type,
        call_conv: CallConv,
    ) -> Self {
        FunctionTranslator {
            func,
            builder_ctx: FunctionBuilderContext::new(),
            lowering: Lowering {
                module,
                ir_fn,
                func_refs,
                string_globals,
                ptr_ty,
                call_conv,
                block_map: HashMap::new(),
                slot_map: HashMap::new(),
                values: HashMap::new(),
                params: Vec::new(),
            },
        }
    }

    /// Build the Cranelift IR. Unreachable blocks are dropped.
    pub fn build(&mut self) -> CodegenResult<()> {
        let ir_fn = self.lowering.ir_fn;
        ir_fn.verify().map_err(|e| CodegenError::InvalidIr(e.to_string()))?;
        let order = reverse_postorder(ir_fn)?;

        let mut builder = ClifFunctionBuilder::new(self.func, &mut self.builder_ctx);

        for &id in &order {
            let block = builder.create_block();
            self.lowering.block_map.insert(id, block);
        }
        let entry = self.lowering.block(order[0])?;
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        self.lowering.params = builder.block_params(entry).to_vec();

        // Every IR slot gets a frame slot up front; StackAlloc is then a no-op.
        for (index, slot) in ir_fn.slots.iter().enumerate() {
            let ss = builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                slot.ty.bytes().max(1),
                align_shift(slot.ty),
            ));
            self.lowering.slot_map.insert(SlotId(index as u32), ss);
        }

        for &id in &order {
            let block = self.lowering.block(id)?;
            if block != entry {
                builder.switch_to_block(block);
            }
            let ir_block = ir_fn.block(id);
            for inst in &ir_block.insts {
                self.lowering.lower_inst(&mut builder, inst)?;
            }
            let term = ir_block.terminator.as_ref().ok_or_else(|| {
                CodegenError::InvalidIr(format!("block `{}` in `{}` has no terminator", ir_block.name, ir_fn.name))
            })?;
            self.lowering.lower_terminator(&mut builder, term)?;
        }

        builder.seal_all_blocks();
        builder.finalize();
        tracing::trace!(name = %ir_fn.name, blocks = order.len(), "translated");
        Ok(())
    }
}

/// Reachable blocks in reverse postorder, so every definition is lowered
/// before its uses.
fn reverse_postorder(ir_fn: &qbc_ir::Function) -> CodegenResult<Vec<BlockId>> {
    let entry = ir_fn
        .entry_block()
        .ok_or_else(|| CodegenError::InvalidIr(format!("`{}` has no body", ir_fn.name)))?;
    let mut seen = HashSet::from([entry]);
    let mut post = Vec::new();
    let mut stack = vec![(entry, 0usize)];
    while let Some((block, next)) = stack.pop() {
        let succs = ir_fn
            .block(block)
            .terminator
            .as_ref()
            .map(Terminator::successors)
            .unwrap_or_default();
        match succs.get(next) {
            Some(&succ) => {
                stack.push((block, next + 1));
                if seen.insert(succ) {
                    stack.push((succ, 0));
                }
            }
            None => post.push(block),
        }
    }
    post.reverse();
    Ok(post)
}

fn int_cc(cond: qbc_ir::IntCC) -> IntCC {
    match cond {
        qbc_ir::IntCC::Eq => IntCC::Equal,
        qbc_ir::IntCC::Ne => IntCC::NotEqual,
        qbc_ir::IntCC::Slt => IntCC::SignedLessThan,
        qbc_ir::IntCC::Sle => IntCC::SignedLessThanOrEqual,
        qbc_ir::IntCC::Sgt => IntCC::SignedGreaterThan,
        qbc_ir::IntCC::Sge => IntCC::SignedGreaterThanOrEqual,
    }
}

impl Lowering<'_> {
    fn block(&self, id: BlockId) -> CodegenResult<Block> {
        self.block_map
            .get(&id)
            .copied()
            .ok_or_else(|| CodegenError::InvalidIr(format!("block {} of `{}` is unreachable", id.0, self.ir_fn.name)))
    }

    fn slot(&self, id: SlotId) -> CodegenResult<StackSlot> {
        self.slot_map
            .get(&id)
            .copied()
            .ok_or_else(|| CodegenError::InvalidIr(format!("slot{} of `{}` does not exist", id.0, self.ir_fn.name)))
    }

    fn lower_inst(&mut self, builder: &mut ClifFunctionBuilder, inst: &Inst) -> CodegenResult<()> {
        match inst {
            Inst::StackAlloc { .. } => {}
            Inst::Load { dst, ty, addr } => {
                let ty = ir_to_cranelift_type(*ty, self.ptr_ty)?;
                let val = match addr {
                    qbc_ir::Value::Slot(slot) => builder.ins().stack_load(ty, self.slot(*slot)?, 0),
                    other => {
                        let ptr = self.operand(builder, *other)?;
                        builder.ins().load(ty, MemFlags::trusted(), ptr, 0)
                    }
                };
                self.values.insert(*dst, val);
            }
            Inst::Store { value, addr } => {
                let val = self.operand(builder, *value)?;
                match addr {
                    qbc_ir::Value::Slot(slot) => {
                        builder.ins().stack_store(val, self.slot(*slot)?, 0);
                    }
                    other => {
                        let ptr = self.operand(builder, *other)?;
                        builder.ins().store(MemFlags::trusted(), val, ptr, 0);
                    }
                }
            }
            Inst::IntCast { dst, value, ty, signed } => {
                let from = self.ir_fn.value_type(value);
                let val = self.operand(builder, *value)?;
                let val = self.int_cast(builder, val, from, *ty, *signed)?;
                self.values.insert(*dst, val);
            }
            Inst::Icmp { dst, cond, lhs, rhs } => {
                let lhs = self.operand(builder, *lhs)?;
                let rhs = self.operand(builder, *rhs)?;
                let val = builder.ins().icmp(int_cc(*cond), lhs, rhs);
                self.values.insert(*dst, val);
            }
            Inst::Binary { dst, op, lhs, rhs } => {
                let lhs = self.operand(builder, *lhs)?;
                let rhs = self.operand(builder, *rhs)?;
                let val = match op {
                    BinOp::Add => builder.ins().iadd(lhs, rhs),
                    BinOp::Sub => builder.ins().isub(lhs, rhs),
                    BinOp::Mul => builder.ins().imul(lhs, rhs),
                    BinOp::SDiv => builder.ins().sdiv(lhs, rhs),
                    BinOp::SRem => builder.ins().srem(lhs, rhs),
                };
                self.values.insert(*dst, val);
            }
            Inst::Call { dst, callee, args } => self.lower_call(builder, *dst, *callee, args)?,
        }
        Ok(())
    }

    /// Truth values are 0/1 in an i8; a signed widening turns 1 into -1.
    fn int_cast(
        &self,
        builder: &mut ClifFunctionBuilder,
        val: Value,
        from: IrType,
        to: IrType,
        signed: bool,
    ) -> CodegenResult<Value> {
        let to_ty = ir_to_cranelift_type(to, self.ptr_ty)?;
        if from == IrType::I1 {
            let wide = if to_ty.bits() > 8 { builder.ins().uextend(to_ty, val) } else { val };
            return Ok(if signed && to != IrType::I1 { builder.ins().ineg(wide) } else { wide });
        }
        let from_ty = ir_to_cranelift_type(from, self.ptr_ty)?;
        if to == IrType::I1 {
            let narrow = if from_ty.bits() > 8 { builder.ins().ireduce(types::I8, val) } else { val };
            return Ok(builder.ins().band_imm(narrow, 1));
        }
        Ok(match from_ty.bits().cmp(&to_ty.bits()) {
            Ordering::Less if signed => builder.ins().sextend(to_ty, val),
            Ordering::Less => builder.ins().uextend(to_ty, val),
            Ordering::Greater => builder.ins().ireduce(to_ty, val),
            Ordering::Equal => val,
        })
    }

    fn lower_call(
        &mut self,
        builder: &mut ClifFunctionBuilder,
        dst: Option<ValueId>,
        callee: FuncId,
        args: &[qbc_ir::Value],
    ) -> CodegenResult<()> {
        let target = self.module.function(callee);
        let func_ref = *self
            .func_refs
            .get(&callee)
            .ok_or_else(|| CodegenError::FunctionNotFound(target.name.clone()))?;
        let mut vals = Vec::with_capacity(args.len());
        for arg in args {
            vals.push(self.operand(builder, *arg)?);
        }

        let fixed = target.sig.params.len();
        let call = if target.sig.variadic && vals.len() > fixed {
            // No varargs in Cranelift: call through the address with a
            // signature built from the arguments actually passed.
            let mut sig = ir_signature(&target.sig, self.call_conv, self.ptr_ty)?;
            for val in &vals[fixed..] {
                sig.params.push(AbiParam::new(builder.func.dfg.value_type(*val)));
            }
            let sig_ref = builder.import_signature(sig);
            let addr = builder.ins().func_addr(self.ptr_ty, func_ref);
            builder.ins().call_indirect(sig_ref, addr, &vals)
        } else {
            builder.ins().call(func_ref, &vals)
        };

        if let Some(dst) = dst {
            let result = builder
                .inst_results(call)
                .first()
                .copied()
                .ok_or_else(|| CodegenError::InvalidIr(format!("`{}` returns no value", target.name)))?;
            self.values.insert(dst, result);
        }
        Ok(())
    }

    fn lower_terminator(&mut self, builder: &mut ClifFunctionBuilder, term: &Terminator) -> CodegenResult<()> {
        match term {
            Terminator::Br { target } => {
                let target = self.block(*target)?;
                builder.ins().jump(target, &[]);
            }
            Terminator::CondBr { cond, then_block, else_block } => {
                let cond = self.operand(builder, *cond)?;
                let then_cl = self.block(*then_block)?;
                let else_cl = self.block(*else_block)?;
                builder.ins().brif(cond, then_cl, &[], else_cl, &[]);
            }
            Terminator::Ret { value: Some(value) } => {
                let val = self.operand(builder, *value)?;
                builder.ins().return_(&[val]);
            }
            Terminator::Ret { value: None } => {
                builder.ins().return_(&[]);
            }
        }
        Ok(())
    }

    fn operand(&self, builder: &mut ClifFunctionBuilder, value: qbc_ir::Value) -> CodegenResult<Value> {
        match value {
            qbc_ir::Value::Const { ty, bits } => {
                let ty = ir_to_cranelift_type(ty, self.ptr_ty)?;
                // iconst immediates of narrow types are zero-extended
                let imm = match ty.bits() {
                    64 => bits,
                    width => bits & ((1i64 << width) - 1),
                };
                Ok(builder.ins().iconst(ty, imm))
            }
            qbc_ir::Value::Inst(id) => self.values.get(&id).copied().ok_or_else(|| {
                CodegenError::InvalidIr(format!("v{} in `{}` is used before it is defined", id.0, self.ir_fn.name))
            }),
            qbc_ir::Value::Param(index) => self.params.get(index as usize).copied().ok_or_else(|| {
                CodegenError::InvalidIr(format!("`{}` has no parameter {}", self.ir_fn.name, index))
            }),
            qbc_ir::Value::Slot(slot) => Ok(builder.ins().stack_addr(self.ptr_ty, self.slot(slot)?, 0)),
            qbc_ir::Value::Global(global) => {
                let gv = self.string_globals.get(&global).copied().ok_or_else(|| {
                    CodegenError::InvalidIr(format!("global {} is not a registered string", global.0))
                })?;
                Ok(builder.ins().global_value(self.ptr_ty, gv))
            }
            qbc_ir::Value::Func(func) => {
                let func_ref = self.func_refs.get(&func).copied().ok_or_else(|| {
                    CodegenError::FunctionNotFound(self.module.function(func).name.clone())
                })?;
                Ok(builder.ins().func_addr(self.ptr_ty, func_ref))
            }
        }
    }
}
