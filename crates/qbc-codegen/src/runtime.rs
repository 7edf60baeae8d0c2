// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Runtime functions the generated code calls by name.

use std::collections::HashMap;

use qbc_ir::{FuncId, IrType, Linkage, Module, Signature};

use crate::error::{CodegenErrorKind, OpResult};

pub const PRINTF: &str = "printf";
pub const PRINT: &str = "brt_print";
pub const STRING_ASSIGN: &str = "brt_string_assign";
pub const STRING_RELEASE: &str = "brt_string_release";
pub const STRING_CONCAT: &str = "brt_string_concat";
pub const STRING_COMPARE: &str = "brt_string_compare";

/// Prototypes of the C library and BASIC runtime functions.
#[derive(Debug, Clone)]
pub struct RuntimeTable {
    prototypes: HashMap<&'static str, Signature>,
}

impl RuntimeTable {
    pub fn new() -> Self {
        use IrType::*;
        let prototypes = HashMap::from([
            (PRINTF, Signature::new(vec![Ptr], I32).variadic(true)),
            // dest (0 = screen), format
            (PRINT, Signature::new(vec![I64, Ptr], Void).variadic(true)),
            // place, new value; copies
            (STRING_ASSIGN, Signature::new(vec![Ptr, Ptr], Void)),
            (STRING_RELEASE, Signature::new(vec![Ptr], Void)),
            (STRING_CONCAT, Signature::new(vec![Ptr, Ptr], Ptr)),
            // <0, 0, >0 like strcmp
            (STRING_COMPARE, Signature::new(vec![Ptr, Ptr], I32)),
        ]);
        RuntimeTable { prototypes }
    }

    pub fn prototype(&self, name: &str) -> Option<&Signature> {
        self.prototypes.get(name)
    }

    /// Import `name` into `module`. Repeated declarations reuse the first;
    /// a user function of the same name with another signature conflicts.
    pub fn declare(&self, module: &mut Module, name: &str) -> OpResult<FuncId> {
        let sig = self
            .prototype(name)
            .ok_or_else(|| CodegenErrorKind::UnknownRuntimeFunction(name.to_string()))?
            .clone();
        Ok(module.declare_function(name, Linkage::Import, sig)?)
    }
}

impl Default for RuntimeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_each_import_once() {
        let table = RuntimeTable::new();
        let mut module = Module::new("t");
        let a = table.declare(&mut module, PRINTF).unwrap();
        let b = table.declare(&mut module, PRINTF).unwrap();
        assert_eq!(a, b);
        assert_eq!(module.functions().len(), 1);
        assert!(module.function(a).sig.variadic);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let table = RuntimeTable::new();
        let mut module = Module::new("t");
        assert_eq!(
            table.declare(&mut module, "brt_missing"),
            Err(CodegenErrorKind::UnknownRuntimeFunction("brt_missing".to_string()))
        );
    }
}
