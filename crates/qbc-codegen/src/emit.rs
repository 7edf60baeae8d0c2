// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Emitter - what type descriptors get to emit through.

use qbc_ir::{BlockId, FuncBuilder, FuncId, Module, Value};

use crate::error::OpResult;
use crate::runtime::RuntimeTable;

/// An IR cursor plus access to the runtime function table.
pub struct Emitter<'a> {
    pub ir: FuncBuilder<'a>,
    runtime: &'a RuntimeTable,
}

impl<'a> Emitter<'a> {
    pub fn new(module: &'a mut Module, runtime: &'a RuntimeTable, func: FuncId, block: BlockId) -> Self {
        Emitter { ir: FuncBuilder::new(module, func, block), runtime }
    }

    /// Emitter positioned in the entry block; `self` keeps its position.
    pub fn at_entry(&mut self) -> Emitter<'_> {
        Emitter { ir: self.ir.entry(), runtime: self.runtime }
    }

    pub fn in_entry_block(&self) -> bool {
        self.ir.function().entry_block() == Some(self.ir.current_block())
    }

    /// Call a runtime function, importing it on first use.
    pub fn runtime_call(&mut self, name: &str, args: Vec<Value>) -> OpResult<Option<Value>> {
        let callee = self.runtime.declare(self.ir.module(), name)?;
        Ok(self.ir.call(callee, args))
    }
}
