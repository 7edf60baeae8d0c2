// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! qbc native backend - qbc IR → object code via Cranelift.

mod builder;
mod module;
mod types;

pub use module::CodeGenerator;

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone)]
pub enum CodegenError {
    TypeConversionFailed(String),
    FunctionNotFound(String),
    /// The input module breaks an IR rule the backend depends on.
    InvalidIr(String),
    CraneliftError(String),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodegenError::TypeConversionFailed(msg) => write!(f, "Type conversion failed: {}", msg),
            CodegenError::FunctionNotFound(name) => write!(f, "Function not found: {}", name),
            CodegenError::InvalidIr(msg) => write!(f, "Invalid IR: {}", msg),
            CodegenError::CraneliftError(msg) => write!(f, "Cranelift error: {}", msg),
        }
    }
}

impl Error for CodegenError {}

pub type CodegenResult<T> = Result<T, CodegenError>;
