// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! QBASIC code generation - syntax tree to qbc IR.
//!
//! [`compile_program`] consumes a parsed [`ast::Program`] and returns the
//! IR module, or every error found (one per failing function).

pub mod ast;
mod context;
mod decl;
mod emit;
mod error;
mod lower;
mod options;
pub mod runtime;
mod scope;
mod types;

mod tests;

pub use context::{Context, Position};
pub use decl::{ArgStorage, Binding};
pub use emit::Emitter;
pub use error::{CodegenError, CodegenErrorKind, CodegenResult, OpResult};
pub use lower::{Codegen, Typed};
pub use options::{CodegenOptions, PrintMode};
pub use runtime::RuntimeTable;
pub use scope::{ScopeId, Scopes};
pub use types::{
    operators_of, same_type, ArithOp, CallableType, IntegerType, Operators, Relation, StringType, TypeDescriptor,
    TypeRef, TypeTable, VoidType,
};

use qbc_ir::Module;

/// Compile `program` into an IR module.
pub fn compile_program(program: ast::Program, options: CodegenOptions) -> Result<Module, Vec<CodegenError>> {
    Codegen::new(options).compile(program)
}
