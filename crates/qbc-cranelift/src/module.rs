// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Cranelift module setup and code generation orchestration.

use cranelift::prelude::*;
use cranelift_codegen::ir::GlobalValue;
use cranelift_module::{DataDescription, Linkage, Module};
use cranelift_object::{ObjectBuilder, ObjectModule};
use std::collections::HashMap;

use qbc_ir::{FuncId, GlobalId};
use crate::builder::FunctionTranslator;
use crate::types::ir_signature;
use crate::{CodegenError, CodegenResult};

pub struct CodeGenerator {
    module: ObjectModule,
    ctx: codegen::Context,
    func_ids: HashMap<String, cranelift_module::FuncId>,
    /// String literal data (content → DataId in the object module)
    string_data: HashMap<String, cranelift_module::DataId>,
    /// Cranelift IR text of each defined function, captured before compilation.
    listings: HashMap<String, String>,
}

fn linkage(linkage: qbc_ir::Linkage) -> Linkage {
    match linkage {
        qbc_ir::Linkage::Internal => Linkage::Local,
        qbc_ir::Linkage::Export => Linkage::Export,
        qbc_ir::Linkage::Import => Linkage::Import,
    }
}

impl CodeGenerator {
    pub fn new() -> CodegenResult<Self> {
        let isa_builder = cranelift_native::builder()
            .map_err(|e| CodegenError::CraneliftError(e.to_string()))?;
        let isa = isa_builder.finish(settings::Flags::new(settings::builder()))
            .map_err(|e| CodegenError::CraneliftError(e.to_string()))?;

        let builder = ObjectBuilder::new(
            isa,
            "qbc_module",
            cranelift_module::default_libcall_names(),
        ).map_err(|e| CodegenError::CraneliftError(e.to_string()))?;

        Ok(CodeGenerator {
            module: ObjectModule::new(builder),
            ctx: codegen::Context::new(),
            func_ids: HashMap::new(),
            string_data: HashMap::new(),
            listings: HashMap::new(),
        })
    }

    fn pointer_type(&self) -> Type {
        self.module.target_config().pointer_type()
    }

    /// Lower every function of `ir` into the object module.
    pub fn compile_module(&mut self, ir: &qbc_ir::Module) -> CodegenResult<()> {
        tracing::debug!(module = %ir.name, functions = ir.functions().len(), "lowering module");
        self.declare_functions(ir)?;
        self.register_strings(ir)?;
        for func in ir.functions() {
            if func.has_body() {
                self.gen_function(ir, func.id)?;
            }
        }
        Ok(())
    }

    /// Declare all functions first (for forward references).
    fn declare_functions(&mut self, ir: &qbc_ir::Module) -> CodegenResult<()> {
        let call_conv = self.module.isa().default_call_conv();
        let ptr_ty = self.pointer_type();
        for func in ir.functions() {
            let sig = ir_signature(&func.sig, call_conv, ptr_ty)?;
            let func_id = self.module
                .declare_function(&func.name, linkage(func.linkage), &sig)
                .map_err(|e| CodegenError::CraneliftError(e.to_string()))?;
            self.func_ids.insert(func.name.clone(), func_id);
        }
        Ok(())
    }

    /// One null-terminated data object per distinct string.
    fn register_strings(&mut self, ir: &qbc_ir::Module) -> CodegenResult<()> {
        for global in ir.globals() {
            if self.string_data.contains_key(&global.content) {
                continue;
            }
            let name = format!(".str.{}", self.string_data.len());
            let data_id = self.module
                .declare_data(&name, Linkage::Local, false, false)
                .map_err(|e| CodegenError::CraneliftError(e.to_string()))?;

            let mut bytes = global.content.as_bytes().to_vec();
            bytes.push(0);
            let mut desc = DataDescription::new();
            desc.define(bytes.into_boxed_slice());
            self.module
                .define_data(data_id, &desc)
                .map_err(|e| CodegenError::CraneliftError(e.to_string()))?;

            self.string_data.insert(global.content.clone(), data_id);
        }
        Ok(())
    }

    /// Generate code for a single IR function.
    fn gen_function(&mut self, ir: &qbc_ir::Module, id: FuncId) -> CodegenResult<()> {
        let func = ir.function(id);
        let clif_id = *self.func_ids.get(&func.name)
            .ok_or_else(|| CodegenError::FunctionNotFound(func.name.clone()))?;
        tracing::debug!(name = %func.name, blocks = func.blocks.len(), "lowering function");

        self.ctx.clear();
        let call_conv = self.module.isa().default_call_conv();
        let ptr_ty = self.pointer_type();
        self.ctx.func.signature = ir_signature(&func.sig, call_conv, ptr_ty)?;

        // Imports must happen before the translator borrows ctx.func.
        let mut func_refs = HashMap::new();
        for callee in ir.functions() {
            let clif_callee = self.func_ids.get(&callee.name)
                .ok_or_else(|| CodegenError::FunctionNotFound(callee.name.clone()))?;
            let func_ref = self.module.declare_func_in_func(*clif_callee, &mut self.ctx.func);
            func_refs.insert(callee.id, func_ref);
        }

        let mut string_globals: HashMap<GlobalId, GlobalValue> = HashMap::new();
        for global in ir.globals() {
            let data_id = self.string_data.get(&global.content)
                .ok_or_else(|| CodegenError::InvalidIr(format!("string {:?} was not registered", global.content)))?;
            let gv = self.module.declare_data_in_func(*data_id, &mut self.ctx.func);
            string_globals.insert(global.id, gv);
        }

        FunctionTranslator::new(
            &mut self.ctx.func,
            ir,
            func,
            &func_refs,
            &string_globals,
            ptr_ty,
            call_conv,
        )
        .build()?;

        cranelift_codegen::verify_function(&self.ctx.func, self.module.isa())
            .map_err(|e| CodegenError::CraneliftError(format!("{}: {}", func.name, e)))?;
        self.listings.insert(func.name.clone(), self.ctx.func.display().to_string());

        self.module
            .define_function(clif_id, &mut self.ctx)
            .map_err(|e| CodegenError::CraneliftError(e.to_string()))?;
        Ok(())
    }

    /// Cranelift IR of a function compiled by [`compile_module`](Self::compile_module).
    pub fn function_ir(&self, name: &str) -> Option<&str> {
        self.listings.get(name).map(String::as_str)
    }

    /// Emit the object file bytes. Consumes self because finish() takes ownership.
    pub fn finish(self) -> CodegenResult<Vec<u8>> {
        let product = self.module.finish();
        product.emit()
            .map_err(|e| CodegenError::CraneliftError(e.to_string()))
    }
}
