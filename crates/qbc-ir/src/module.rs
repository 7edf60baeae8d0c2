// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! IR module - functions and read-only string data.

use std::collections::HashMap;

use crate::{FuncId, Function, GlobalId, Inst, IrError, IrResult, Linkage, Signature};

/// Null-terminated read-only data (string literals, format strings).
#[derive(Debug, Clone)]
pub struct GlobalData {
    pub id: GlobalId,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    functions: Vec<Function>,
    globals: Vec<GlobalData>,
    func_names: HashMap<String, FuncId>,
    strings: HashMap<String, GlobalId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            functions: Vec::new(),
            globals: Vec::new(),
            func_names: HashMap::new(),
            strings: HashMap::new(),
        }
    }

    /// Declare a function. Re-declaring with the same signature returns the
    /// existing id; a different signature is an error.
    pub fn declare_function(&mut self, name: &str, linkage: Linkage, sig: Signature) -> IrResult<FuncId> {
        if let Some(id) = self.func_names.get(name) {
            let existing = &self.functions[id.0 as usize];
            if existing.sig != sig {
                return Err(IrError::SignatureConflict { name: name.to_string() });
            }
            return Ok(*id);
        }
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(Function::new(id, name.to_string(), linkage, sig));
        self.func_names.insert(name.to_string(), id);
        tracing::trace!(name, ?linkage, "declared function");
        Ok(id)
    }

    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.func_names.get(name).copied()
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.get_function(name).map(|id| self.function(id))
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Intern a string constant; identical contents share one global.
    pub fn intern_string(&mut self, content: &str) -> GlobalId {
        if let Some(id) = self.strings.get(content) {
            return *id;
        }
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(GlobalData {
            id,
            name: format!(".str.{}", id.0),
            content: content.to_string(),
        });
        self.strings.insert(content.to_string(), id);
        id
    }

    pub fn global(&self, id: GlobalId) -> &GlobalData {
        &self.globals[id.0 as usize]
    }

    pub fn globals(&self) -> &[GlobalData] {
        &self.globals
    }

    /// Verify every defined function and the arity of every call.
    pub fn verify(&self) -> IrResult<()> {
        for func in self.functions.iter().filter(|f| f.has_body()) {
            func.verify()?;
            for block in &func.blocks {
                for inst in &block.insts {
                    if let Inst::Call { callee, args, .. } = inst {
                        let target = self.function(*callee);
                        let expected = target.sig.params.len();
                        let ok = if target.sig.variadic {
                            args.len() >= expected
                        } else {
                            args.len() == expected
                        };
                        if !ok {
                            return Err(IrError::CallArity {
                                callee: target.name.clone(),
                                expected,
                                found: args.len(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
