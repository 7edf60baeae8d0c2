// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Function definitions, prototypes and RETURN.

use std::rc::Rc;

use qbc_ir::{BlockId, FuncBuilder, FuncId, IrType, Signature, Value};

use super::Codegen;
use crate::ast::{Expr, FunctionDecl, Span};
use crate::context::{Context, Position};
use crate::decl::{ArgStorage, Binding};
use crate::error::{CodegenErrorKind, CodegenResult};
use crate::scope::ScopeId;
use crate::types::{operators_of, CallableType, TypeRef};

/// Per-function state while its body is generated.
#[derive(Debug)]
pub(crate) struct Frame {
    pub name: String,
    pub func: FuncId,
    pub ret_ty: Option<TypeRef>,
    /// Created by the first `RETURN expr`.
    pub ret_slot: Option<Value>,
    /// Shared exit block, created by the first `RETURN`.
    pub ret_block: Option<BlockId>,
    pub params: ScopeId,
    pub body: ScopeId,
}

impl Codegen {
    /// Emit a function definition, or only declare it when it has no body.
    pub fn compile_function(&mut self, decl: &FunctionDecl, ctx: Context) -> CodegenResult<()> {
        if ctx.function.is_some() || ctx.block.is_some() || self.frame.is_some() {
            return Err(CodegenErrorKind::ContractViolation(format!(
                "function `{}` generated while another function is active",
                decl.name
            ))
            .at(decl.span));
        }
        let scope = ctx.scope.ok_or_else(|| {
            CodegenErrorKind::ContractViolation(format!("function `{}` outside any scope", decl.name)).at(decl.span)
        })?;
        tracing::debug!(name = %decl.name, params = decl.params.len(), "compiling function");

        let func = self.declare_function(decl, scope)?;
        let Some(body) = &decl.body else {
            return Ok(());
        };

        let entry = FuncBuilder::define(&mut self.module, func, "entrypoint")
            .map_err(|err| CodegenErrorKind::Ir(err).at(decl.span))?
            .current_block();

        let params = self.scopes.open(Some(scope));
        for (index, param) in decl.params.iter().enumerate() {
            let index = index as u32;
            self.module.function_mut(func).set_param_name(index, &param.name);
            let binding = Binding::Argument {
                name: param.name.clone(),
                ty: param.ty.clone(),
                index,
                storage: ArgStorage::Incoming,
            };
            self.declare(params, param.id, binding, param.span)?;
        }
        // Arguments the body writes get their private copy in the entry block,
        // ahead of any loop that reads them.
        let written = body.outer_writes();
        for param in decl.params.iter().filter(|p| written.contains(&p.name)) {
            let pos = Position { function: func, scope: params, block: entry };
            self.address(param.id, pos, param.span)?;
        }
        let body_scope = self.scopes.open(Some(params));

        self.frame = Some(Frame {
            name: decl.name.clone(),
            func,
            ret_ty: decl.ret.clone(),
            ret_slot: None,
            ret_block: None,
            params,
            body: body_scope,
        });
        let ctx = Context { function: Some(func), scope: Some(body_scope), block: Some(entry) };
        let result = self
            .gen_block_body(body, ctx)
            .and_then(|end| self.finish_function(end, body.span));
        self.frame = None;
        result?;

        self.module
            .function(func)
            .verify()
            .map_err(|err| CodegenErrorKind::Ir(err).at(decl.span))?;
        tracing::debug!(name = %decl.name, "function done");
        Ok(())
    }

    /// Create the IR function and bind its name in `scope`. A definition
    /// may follow a prototype with the same signature; a second definition
    /// is a duplicate.
    fn declare_function(&mut self, decl: &FunctionDecl, scope: ScopeId) -> CodegenResult<FuncId> {
        let params = decl.params.iter().map(|p| p.ty.ir_type()).collect();
        let ret = decl.ret.as_ref().map_or(IrType::Void, |ty| ty.ir_type());
        let variadic = decl.variadic || self.options.variadic_functions;
        let sig = Signature::new(params, ret).variadic(variadic);
        let func = self
            .module
            .declare_function(&decl.name, decl.linkage, sig)
            .map_err(|err| CodegenErrorKind::Ir(err).at(decl.span))?;

        if let Some(existing) = self.scopes.lookup_local(scope, &decl.name) {
            if let Some(Binding::Function { func: prior, .. }) = self.bindings.get(&existing) {
                if *prior == func {
                    if decl.body.is_some() && self.module.function(func).has_body() {
                        return Err(CodegenErrorKind::DuplicateSymbol { name: decl.name.clone() }.at(decl.span));
                    }
                    return Ok(func);
                }
            }
        }
        let ty = Rc::new(CallableType {
            params: decl.params.iter().map(|p| p.ty.clone()).collect(),
            ret: decl.ret.clone(),
            variadic,
        });
        let binding = Binding::Function { name: decl.name.clone(), ty, func };
        self.declare(scope, decl.id, binding, decl.span)?;
        Ok(func)
    }

    /// After the body: join the return block, tear down body and parameter
    /// scopes, return.
    fn finish_function(&mut self, end: BlockId, span: Span) -> CodegenResult<()> {
        let Some(frame) = self.frame.as_ref() else {
            return Err(CodegenErrorKind::ContractViolation("no active function".to_string()).at(span));
        };
        let (func, body, params) = (frame.func, frame.body, frame.params);
        let (ret_block, ret_slot, ret_ty) = (frame.ret_block, frame.ret_slot, frame.ret_ty.clone());

        let exit = match ret_block {
            Some(ret) => {
                let mut em = self.emitter(func, end);
                em.ir.br(ret);
                em.ir.move_block_after(ret, end);
                ret
            }
            None => end,
        };
        self.leave_scope(body, func, exit, span)?;
        self.leave_scope(params, func, exit, span)?;

        let mut em = self.emitter(func, exit);
        let value = match (ret_slot, &ret_ty) {
            (Some(slot), Some(ty)) => Some(em.ir.load(ty.ir_type(), slot)),
            (None, Some(ty)) => Some(ty.default_value()),
            _ => None,
        };
        em.ir.ret(value);
        Ok(())
    }

    /// `RETURN [expr]`: store the value, leave the scopes opened inside the
    /// body and jump to the shared return block. Code after it lands in an
    /// unreachable block.
    pub(crate) fn gen_return(&mut self, value: Option<&Expr>, ctx: Context, span: Span) -> CodegenResult<BlockId> {
        let pos = ctx.position(span)?;
        let Some(frame) = self.frame.as_ref() else {
            return Err(CodegenErrorKind::ContractViolation("RETURN outside a function".to_string()).at(span));
        };
        let (name, ret_ty, body) = (frame.name.clone(), frame.ret_ty.clone(), frame.body);

        match (value, ret_ty) {
            (Some(_), None) => {
                return Err(CodegenErrorKind::UnexpectedReturnValue { function: name }.at(span));
            }
            (None, Some(_)) => {
                return Err(CodegenErrorKind::MissingReturnValue { function: name }.at(span));
            }
            (Some(expr), Some(ty)) => {
                let typed = self.gen_expr(expr, pos)?;
                let value = self.coerce(typed, &ty, pos, expr.span)?;
                let slot = self.return_slot(&ty, pos.function, pos.block, span)?;
                let mut em = self.emitter(pos.function, pos.block);
                operators_of(&ty, "=")
                    .and_then(|ops| ops.assign(&mut em, slot, value))
                    .map_err(|kind| kind.at(span))?;
            }
            (None, None) => {}
        }

        for scope in self.scopes.chain_until(pos.scope, body) {
            self.teardown_scope(scope, pos.function, pos.block, span)?;
        }

        let ret = self.return_block(pos.function, pos.block);
        let mut em = self.emitter(pos.function, pos.block);
        em.ir.br(ret);
        Ok(em.ir.create_block("after_return"))
    }

    fn return_slot(&mut self, ty: &TypeRef, func: FuncId, block: BlockId, span: Span) -> CodegenResult<Value> {
        if let Some(slot) = self.frame.as_ref().and_then(|f| f.ret_slot) {
            return Ok(slot);
        }
        let mut em = self.emitter(func, block);
        let slot = ty.allocate(&mut em.at_entry(), "retval").map_err(|kind| kind.at(span))?;
        if let Some(frame) = self.frame.as_mut() {
            frame.ret_slot = Some(slot);
        }
        Ok(slot)
    }

    fn return_block(&mut self, func: FuncId, block: BlockId) -> BlockId {
        if let Some(ret) = self.frame.as_ref().and_then(|f| f.ret_block) {
            return ret;
        }
        let ret = self.emitter(func, block).ir.create_block("ret");
        if let Some(frame) = self.frame.as_mut() {
            frame.ret_block = Some(ret);
        }
        ret
    }
}
