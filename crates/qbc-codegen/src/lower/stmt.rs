// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Statement lowering and scope blocks.

use qbc_ir::BlockId;

use super::Codegen;
use crate::ast::{Block, Expr, Stmt, StmtKind};
use crate::context::Context;
use crate::error::{CodegenErrorKind, CodegenResult};
use crate::types::operators_of;

impl Codegen {
    /// Generate one statement; returns the block where code continues.
    pub fn gen_stmt(&mut self, stmt: &Stmt, ctx: Context) -> CodegenResult<BlockId> {
        let pos = ctx.position(stmt.span)?;
        tracing::trace!(id = stmt.id.0, block = pos.block.0, "statement");
        match &stmt.kind {
            StmtKind::Empty => Ok(pos.block),
            StmtKind::Dim(dim) => {
                self.declare_variable(stmt.id, dim, pos, stmt.span)?;
                Ok(pos.block)
            }
            StmtKind::Assign { target, value } => {
                self.gen_assign(target, value, ctx, stmt)?;
                Ok(pos.block)
            }
            StmtKind::Expr(expr) => {
                self.gen_expr(expr, pos)?;
                Ok(pos.block)
            }
            StmtKind::Return(value) => self.gen_return(value.as_ref(), ctx, stmt.span),
            StmtKind::If { cond, then_block, else_block } => {
                self.gen_if(cond, then_block, else_block.as_ref(), ctx)
            }
            StmtKind::While { cond, body } => self.gen_while(cond, body, ctx),
            StmtKind::For { var, start, end, step, body } => {
                self.gen_for(var, start, end, step.as_ref(), body, ctx, stmt.span)
            }
            StmtKind::Block(block) => self.gen_scoped_block(block, ctx),
            StmtKind::Print(print) => self.gen_print(print, ctx, stmt.span),
            StmtKind::Function(decl) => Err(CodegenErrorKind::ContractViolation(format!(
                "function `{}` declared inside another function",
                decl.name
            ))
            .at(stmt.span)),
        }
    }

    fn gen_assign(&mut self, target: &str, value: &Expr, ctx: Context, stmt: &Stmt) -> CodegenResult<()> {
        let pos = ctx.position(stmt.span)?;
        let id = self.resolve(pos.scope, target, stmt.span)?;
        let (place, ty) = self.address(id, pos, stmt.span)?;
        let value_span = value.span;
        let value = self.gen_expr(value, pos)?;
        let value = self.coerce(value, &ty, pos, value_span)?;
        let mut em = self.emitter(pos.function, pos.block);
        operators_of(&ty, "=")
            .and_then(|ops| ops.assign(&mut em, place, value))
            .map_err(|kind| kind.at(stmt.span))
    }

    /// Generate `block`'s statements in the scope `ctx` names, threading
    /// the insertion point. Declarations stay alive.
    pub(crate) fn gen_block_body(&mut self, block: &Block, ctx: Context) -> CodegenResult<BlockId> {
        let mut ctx = ctx;
        for stmt in &block.stmts {
            let next = self.gen_stmt(stmt, ctx)?;
            ctx = ctx.at(next);
        }
        ctx.position(block.span).map(|pos| pos.block)
    }

    /// Generate `block` as a new child scope and tear it down at its end.
    pub(crate) fn gen_scoped_block(&mut self, block: &Block, ctx: Context) -> CodegenResult<BlockId> {
        let pos = ctx.position(block.span)?;
        let scope = self.scopes.open(Some(pos.scope));
        let end = self.gen_block_body(block, ctx.in_scope(scope))?;
        self.leave_scope(scope, pos.function, end, block.span)?;
        Ok(end)
    }
}

