// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Code generation errors.

use std::fmt;

use qbc_ir::IrError;
use thiserror::Error;

use crate::ast::Span;

/// A code generation error, located at the node that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct CodegenError {
    pub kind: CodegenErrorKind,
    pub span: Span,
}

impl CodegenError {
    pub fn new(kind: CodegenErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {}..{})", self.kind, self.span.start, self.span.end)
    }
}

impl std::error::Error for CodegenError {}

/// The kind of code generation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenErrorKind {
    /// A name declared twice in one scope.
    #[error("`{name}` is already defined in this scope")]
    DuplicateSymbol { name: String },

    #[error("`{name}` is not defined")]
    UndefinedSymbol { name: String },

    #[error("`{name}` is not a function")]
    NotCallable { name: String },

    #[error("cannot assign to `{name}`")]
    NotAssignable { name: String },

    #[error("`{name}` takes {expected} arguments but {found} were given")]
    ArityMismatch { name: String, expected: usize, found: usize },

    #[error("expected a value of type {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("operator `{op}` is not defined for type {ty}")]
    UnsupportedOperator { op: String, ty: String },

    #[error("cannot PRINT a value of type {ty} ({size} bytes)")]
    UnsupportedPrintArgument { ty: String, size: u32 },

    /// `RETURN expr` in a function declared without a return type.
    #[error("`{function}` has no return type but returns a value")]
    UnexpectedReturnValue { function: String },

    /// Bare `RETURN` in a function with a return type.
    #[error("`{function}` must return a value")]
    MissingReturnValue { function: String },

    /// Code generation requested in a state it cannot run in.
    #[error("internal error: {0}")]
    ContractViolation(String),

    #[error("unknown runtime function `{0}`")]
    UnknownRuntimeFunction(String),

    #[error(transparent)]
    Ir(#[from] IrError),
}

impl CodegenErrorKind {
    pub fn at(self, span: Span) -> CodegenError {
        CodegenError::new(self, span)
    }
}

pub type CodegenResult<T> = Result<T, CodegenError>;

/// Result of type-level operations, which know no source location; callers
/// attach the span of the node being generated.
pub type OpResult<T> = Result<T, CodegenErrorKind>;
