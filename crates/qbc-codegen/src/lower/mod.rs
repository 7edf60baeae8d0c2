// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Code generation - walk the syntax tree and emit IR.
//!
//! Every statement takes a [`Context`] and returns the block where code
//! continues. The session owns the module, the scope arena and the
//! declarations; the tree itself is only borrowed.

mod control;
mod expr;
mod function;
mod print;
mod stmt;

use std::collections::HashMap;

use qbc_ir::{BlockId, FuncId, Module};

use crate::ast::{Block, FunctionDecl, NodeId, Program, Span, StmtKind};
use crate::context::Context;
use crate::decl::Binding;
use crate::emit::Emitter;
use crate::error::{CodegenError, CodegenErrorKind};
use crate::options::CodegenOptions;
use crate::runtime::RuntimeTable;
use crate::scope::{ScopeId, Scopes};
use crate::types::TypeTable;

pub use expr::Typed;
pub(crate) use function::Frame;

/// One code generation session, producing one module.
pub struct Codegen {
    pub(crate) module: Module,
    pub(crate) runtime: RuntimeTable,
    pub(crate) types: TypeTable,
    pub(crate) scopes: Scopes,
    pub(crate) bindings: HashMap<NodeId, Binding>,
    /// State of the function being generated.
    pub(crate) frame: Option<Frame>,
    pub(crate) options: CodegenOptions,
    global: ScopeId,
}

impl Codegen {
    pub fn new(options: CodegenOptions) -> Self {
        Self::with_types(options, TypeTable::with_builtins())
    }

    pub fn with_types(options: CodegenOptions, types: TypeTable) -> Self {
        let mut scopes = Scopes::new();
        let global = scopes.open(None);
        Codegen {
            module: Module::new(options.module_name.clone()),
            runtime: RuntimeTable::new(),
            types,
            scopes,
            bindings: HashMap::new(),
            frame: None,
            options,
            global,
        }
    }

    /// Context of the program's outermost scope.
    pub fn global_context(&self) -> Context {
        Context::global(self.global)
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub(crate) fn emitter(&mut self, func: FuncId, block: BlockId) -> Emitter<'_> {
        Emitter::new(&mut self.module, &self.runtime, func, block)
    }

    /// Compile a whole program. Function declarations are compiled in
    /// source order; the remaining top-level statements become `main`.
    /// A failing function is abandoned and compilation moves on to the
    /// next, so every failing function reports its first error.
    pub fn compile(mut self, program: Program) -> Result<Module, Vec<CodegenError>> {
        let Block { id, stmts, span } = program.body;
        let mut functions = Vec::new();
        let mut toplevel = Vec::new();
        for stmt in stmts {
            match stmt.kind {
                StmtKind::Function(decl) => functions.push(decl),
                _ => toplevel.push(stmt),
            }
        }
        if !toplevel.is_empty() {
            let body = Block { id, stmts: toplevel, span };
            functions.push(FunctionDecl::default_main(body, self.types.long()));
        }

        let ctx = self.global_context();
        let mut errors = Vec::new();
        for decl in &functions {
            if let Err(err) = self.compile_function(decl, ctx) {
                tracing::debug!(function = %decl.name, error = %err, "function abandoned");
                errors.push(err);
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        self.finish().map_err(|err| vec![err])
    }

    /// Check the finished module and hand it over.
    pub fn finish(self) -> Result<Module, CodegenError> {
        self.module
            .verify()
            .map_err(|err| CodegenErrorKind::Ir(err).at(Span::default()))?;
        Ok(self.module)
    }
}
