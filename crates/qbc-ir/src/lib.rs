// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! qbc IR - the backend interface the BASIC code generator emits into.
//!
//! A module holds functions; a function is a list of basic blocks with
//! instructions and exactly one terminator each. Instructions are emitted
//! through a [`FuncBuilder`] positioned at the current insertion point.

mod builder;
mod display;
mod function;
mod inst;
mod module;
mod types;

pub mod interp;

pub use builder::FuncBuilder;
pub use function::{Block, BlockId, FuncId, Function, Linkage, Signature, SlotId, StackSlotData, ValueId};
pub use inst::{BinOp, GlobalId, Inst, IntCC, Terminator, Value};
pub use module::{GlobalData, Module};
pub use types::IrType;

use thiserror::Error;

/// Structural errors reported by the IR layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("function `{name}` is already declared with a different signature")]
    SignatureConflict { name: String },

    #[error("function `{name}` already has a body")]
    AlreadyDefined { name: String },

    #[error("block `{block}` in `{function}` has no terminator")]
    Unterminated { function: String, block: String },

    #[error("block `{block}` in `{function}` branches to a block that does not exist")]
    DanglingTarget { function: String, block: String },

    #[error("call to `{callee}` passes {found} arguments, expected {expected}")]
    CallArity { callee: String, expected: usize, found: usize },
}

pub type IrResult<T> = Result<T, IrError>;
