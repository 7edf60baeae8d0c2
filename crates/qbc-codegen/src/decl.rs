// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Declarations: what a name is bound to, and its storage.

use std::rc::Rc;

use qbc_ir::{BlockId, FuncId, Value};

use crate::ast::{DimStmt, NodeId, Span};
use crate::context::Position;
use crate::emit::Emitter;
use crate::error::{CodegenErrorKind, CodegenResult};
use crate::lower::{Codegen, Typed};
use crate::scope::ScopeId;
use crate::types::{operators_of, CallableType, TypeRef};

/// Storage of an argument. Starts as the incoming parameter and moves to
/// a private slot the first time its address is needed; never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStorage {
    Incoming,
    Private(Value),
}

#[derive(Debug, Clone)]
pub enum Binding {
    /// `DIM` variable with its stack slot.
    Variable { name: String, ty: TypeRef, storage: Value },
    /// Function parameter.
    Argument { name: String, ty: TypeRef, index: u32, storage: ArgStorage },
    Function { name: String, ty: Rc<CallableType>, func: FuncId },
}

impl Binding {
    pub fn name(&self) -> &str {
        match self {
            Binding::Variable { name, .. }
            | Binding::Argument { name, .. }
            | Binding::Function { name, .. } => name,
        }
    }

    pub fn ty(&self) -> TypeRef {
        match self {
            Binding::Variable { ty, .. } | Binding::Argument { ty, .. } => ty.clone(),
            Binding::Function { ty, .. } => {
                let ty: TypeRef = ty.clone();
                ty
            }
        }
    }
}

impl Codegen {
    /// Bind `name` in `scope` to the node `id`.
    pub(crate) fn declare(&mut self, scope: ScopeId, id: NodeId, binding: Binding, span: Span) -> CodegenResult<()> {
        self.scopes
            .register(scope, binding.name(), id)
            .map_err(|kind| kind.at(span))?;
        tracing::trace!(name = binding.name(), ?scope, "declared");
        self.bindings.insert(id, binding);
        Ok(())
    }

    pub(crate) fn resolve(&self, scope: ScopeId, name: &str, span: Span) -> CodegenResult<NodeId> {
        self.scopes
            .resolve(scope, name)
            .ok_or_else(|| CodegenErrorKind::UndefinedSymbol { name: name.to_string() }.at(span))
    }

    pub(crate) fn binding(&self, id: NodeId, span: Span) -> CodegenResult<&Binding> {
        self.bindings.get(&id).ok_or_else(|| {
            CodegenErrorKind::ContractViolation(format!("no declaration for node {}", id.0)).at(span)
        })
    }

    /// `DIM`: allocate storage and bind the name in the active scope.
    pub(crate) fn declare_variable(&mut self, id: NodeId, dim: &DimStmt, pos: Position, span: Span) -> CodegenResult<()> {
        if self.scopes.lookup_local(pos.scope, &dim.name).is_some() {
            return Err(CodegenErrorKind::DuplicateSymbol { name: dim.name.clone() }.at(span));
        }
        let mut em = Emitter::new(&mut self.module, &self.runtime, pos.function, pos.block);
        let storage = dim.ty.allocate(&mut em, &dim.name).map_err(|kind| kind.at(span))?;
        let binding = Binding::Variable { name: dim.name.clone(), ty: dim.ty.clone(), storage };
        self.declare(pos.scope, id, binding, span)
    }

    /// Address of the storage behind `id`, with its type. An argument gets
    /// its private slot here.
    pub(crate) fn address(&mut self, id: NodeId, pos: Position, span: Span) -> CodegenResult<(Value, TypeRef)> {
        match self.binding(id, span)?.clone() {
            Binding::Variable { storage, ty, .. } => Ok((storage, ty)),
            Binding::Argument { storage: ArgStorage::Private(slot), ty, .. } => Ok((slot, ty)),
            Binding::Argument { name, ty, index, storage: ArgStorage::Incoming } => {
                let slot = self.materialize_argument(&name, &ty, index, pos.function, span)?;
                if let Some(Binding::Argument { storage, .. }) = self.bindings.get_mut(&id) {
                    *storage = ArgStorage::Private(slot);
                }
                Ok((slot, ty))
            }
            Binding::Function { name, .. } => Err(CodegenErrorKind::NotAssignable { name }.at(span)),
        }
    }

    // Both instructions go to the entry block: the slot must hold the
    // incoming value on every path, not only the one that first wrote it.
    fn materialize_argument(&mut self, name: &str, ty: &TypeRef, index: u32, func: FuncId, span: Span) -> CodegenResult<Value> {
        let entry = self.module.function(func).entry_block().ok_or_else(|| {
            CodegenErrorKind::ContractViolation(format!("argument `{}` of a function without body", name)).at(span)
        })?;
        let mut em = Emitter::new(&mut self.module, &self.runtime, func, entry);
        let slot = ty.allocate(&mut em, name).map_err(|kind| kind.at(span))?;
        operators_of(ty, "=")
            .and_then(|ops| ops.assign(&mut em, slot, Value::Param(index)))
            .map_err(|kind| kind.at(span))?;
        tracing::trace!(name, "argument copied to private slot");
        Ok(slot)
    }

    /// Current value of `id`. Reading an argument never allocates.
    pub(crate) fn value(&mut self, id: NodeId, pos: Position, span: Span) -> CodegenResult<Typed> {
        let (addr, ty) = match self.binding(id, span)?.clone() {
            Binding::Variable { storage, ty, .. } => (storage, ty),
            Binding::Argument { storage: ArgStorage::Private(slot), ty, .. } => (slot, ty),
            Binding::Argument { storage: ArgStorage::Incoming, ty, index, .. } => {
                return Ok(Typed { value: Value::Param(index), ty });
            }
            Binding::Function { ty, func, .. } => {
                let ty: TypeRef = ty;
                return Ok(Typed { value: Value::Func(func), ty });
            }
        };
        let mut em = self.emitter(pos.function, pos.block);
        let value = em.ir.load(ty.ir_type(), addr);
        Ok(Typed { value, ty })
    }

    /// Destroy the declarations of `scope`, most recent first.
    pub(crate) fn teardown_scope(&mut self, scope: ScopeId, func: FuncId, block: BlockId, span: Span) -> CodegenResult<()> {
        for id in self.scopes.declarations_rev(scope) {
            let storage = match self.binding(id, span)? {
                Binding::Variable { storage, ty, .. } => Some((*storage, ty.clone())),
                Binding::Argument { storage: ArgStorage::Private(slot), ty, .. } => Some((*slot, ty.clone())),
                Binding::Argument { storage: ArgStorage::Incoming, .. } | Binding::Function { .. } => None,
            };
            if let Some((storage, ty)) = storage {
                let mut em = self.emitter(func, block);
                ty.destroy(&mut em, storage).map_err(|kind| kind.at(span))?;
            }
        }
        Ok(())
    }

    /// Tear down `scope` and empty its table. The scope is finished.
    pub(crate) fn leave_scope(&mut self, scope: ScopeId, func: FuncId, block: BlockId, span: Span) -> CodegenResult<()> {
        self.teardown_scope(scope, func, block, span)?;
        self.scopes.clear(scope);
        Ok(())
    }
}
