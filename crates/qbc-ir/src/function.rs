// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! IR function representation - control-flow graph of basic blocks.

use crate::{Inst, IrError, IrResult, IrType, Terminator, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

/// Visibility of a function outside its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Module-private (`STATIC`).
    Internal,
    /// Defined here and exported (`EXTERN`).
    Export,
    /// Defined elsewhere, typically the C runtime (`IMPORTC`).
    Import,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<IrType>,
    pub ret: IrType,
    pub variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<IrType>, ret: IrType) -> Self {
        Signature { params, ret, variadic: false }
    }

    pub fn variadic(mut self, variadic: bool) -> Self {
        self.variadic = variadic;
        self
    }
}

#[derive(Debug, Clone)]
pub struct StackSlotData {
    pub ty: IrType,
    /// Name hint for listings and diagnostics.
    pub name: String,
}

/// Basic block in the CFG
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub insts: Vec<Inst>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: FuncId,
    pub name: String,
    pub linkage: Linkage,
    pub sig: Signature,
    pub param_names: Vec<Option<String>>,
    pub blocks: Vec<Block>,
    /// Block order for listing and lowering. Only a layout hint.
    pub layout: Vec<BlockId>,
    pub slots: Vec<StackSlotData>,
    pub value_types: Vec<IrType>,
}

impl Function {
    pub fn new(id: FuncId, name: String, linkage: Linkage, sig: Signature) -> Self {
        let param_names = vec![None; sig.params.len()];
        Function {
            id,
            name,
            linkage,
            sig,
            param_names,
            blocks: Vec::new(),
            layout: Vec::new(),
            slots: Vec::new(),
            value_types: Vec::new(),
        }
    }

    /// A function with no blocks is a declaration only.
    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.layout.first().copied()
    }

    pub fn create_block(&mut self, name: &str) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            id,
            name: name.to_string(),
            insts: Vec::new(),
            terminator: None,
        });
        self.layout.push(id);
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0 as usize]
    }

    pub fn is_terminated(&self, id: BlockId) -> bool {
        self.block(id).terminator.is_some()
    }

    /// Blocks in layout order.
    pub fn blocks_in_layout(&self) -> impl Iterator<Item = &Block> + '_ {
        self.layout.iter().map(move |id| self.block(*id))
    }

    /// Move `block` so that it directly follows `after` in the layout.
    pub fn move_block_after(&mut self, block: BlockId, after: BlockId) {
        if block == after {
            return;
        }
        self.layout.retain(|b| *b != block);
        let pos = self
            .layout
            .iter()
            .position(|b| *b == after)
            .map(|p| p + 1)
            .unwrap_or(self.layout.len());
        self.layout.insert(pos, block);
    }

    pub fn set_param_name(&mut self, index: u32, name: &str) {
        if let Some(slot) = self.param_names.get_mut(index as usize) {
            *slot = Some(name.to_string());
        }
    }

    pub fn new_value(&mut self, ty: IrType) -> ValueId {
        let id = ValueId(self.value_types.len() as u32);
        self.value_types.push(ty);
        id
    }

    pub fn new_slot(&mut self, ty: IrType, name: &str) -> SlotId {
        let id = SlotId(self.slots.len() as u32);
        self.slots.push(StackSlotData { ty, name: name.to_string() });
        id
    }

    pub fn value_type(&self, value: &Value) -> IrType {
        match value {
            Value::Const { ty, .. } => *ty,
            Value::Inst(id) => self.value_types[id.0 as usize],
            Value::Param(i) => self.sig.params[*i as usize],
            Value::Slot(_) | Value::Global(_) | Value::Func(_) => IrType::Ptr,
        }
    }

    /// Predecessors of `id` (blocks whose terminator targets it).
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks_in_layout()
            .filter(|b| {
                b.terminator
                    .as_ref()
                    .map(|t| t.successors().contains(&id))
                    .unwrap_or(false)
            })
            .map(|b| b.id)
            .collect()
    }

    /// Structural check: every block terminated, every branch target exists.
    pub fn verify(&self) -> IrResult<()> {
        for block in self.blocks_in_layout() {
            let Some(term) = &block.terminator else {
                return Err(IrError::Unterminated {
                    function: self.name.clone(),
                    block: block.name.clone(),
                });
            };
            if term.successors().iter().any(|t| t.0 as usize >= self.blocks.len()) {
                return Err(IrError::DanglingTarget {
                    function: self.name.clone(),
                    block: block.name.clone(),
                });
            }
        }
        Ok(())
    }
}
