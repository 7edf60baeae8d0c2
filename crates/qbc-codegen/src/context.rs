// SPDX-License-Identifier: (MIT OR Apache-2.0)

use qbc_ir::{BlockId, FuncId};

use crate::ast::Span;
use crate::error::{CodegenErrorKind, CodegenResult};
use crate::scope::ScopeId;

/// Where code is being generated: function, innermost scope and insertion
/// point. Passed by value; callees hand back a new insertion point instead
/// of changing the caller's copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub function: Option<FuncId>,
    pub scope: Option<ScopeId>,
    pub block: Option<BlockId>,
}

/// A resolved [`Context`] inside a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub function: FuncId,
    pub scope: ScopeId,
    pub block: BlockId,
}

impl Context {
    /// Top level: a scope but no function.
    pub fn global(scope: ScopeId) -> Self {
        Context { function: None, scope: Some(scope), block: None }
    }

    pub fn at(self, block: BlockId) -> Self {
        Context { block: Some(block), ..self }
    }

    pub fn in_scope(self, scope: ScopeId) -> Self {
        Context { scope: Some(scope), ..self }
    }

    /// The active position, or a contract violation when code is
    /// requested outside a function body.
    pub fn position(&self, span: Span) -> CodegenResult<Position> {
        match (self.function, self.scope, self.block) {
            (Some(function), Some(scope), Some(block)) => Ok(Position { function, scope, block }),
            _ => Err(CodegenErrorKind::ContractViolation(
                "statement generated outside of a function body".to_string(),
            )
            .at(span)),
        }
    }
}
