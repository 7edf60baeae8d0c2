// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! IF, WHILE and FOR.

use qbc_ir::{BlockId, Value};

use super::Codegen;
use crate::ast::{Block, Expr, Span};
use crate::context::Context;
use crate::error::{CodegenErrorKind, CodegenResult};
use crate::types::{operators_of, Relation};

impl Codegen {
    /// `cond_true` always; `cond_false` only with an ELSE. Both branch to
    /// `continue`, where code goes on.
    pub(crate) fn gen_if(
        &mut self,
        cond: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
        ctx: Context,
    ) -> CodegenResult<BlockId> {
        let pos = ctx.position(cond.span)?;
        let value = self.gen_expr(cond, pos)?;
        let truth = self.truth(value, pos, cond.span)?;

        let mut em = self.emitter(pos.function, pos.block);
        let true_block = em.ir.create_block("cond_true");
        let false_block = else_block.map(|_| em.ir.create_block("cond_false"));
        let cont = em.ir.create_block("continue");
        em.ir.cond_br(truth, true_block, false_block.unwrap_or(cont));
        tracing::debug!(cond_true = true_block.0, cont = cont.0, "if");

        let then_end = self.gen_scoped_block(then_block, ctx.at(true_block))?;
        let mut em = self.emitter(pos.function, then_end);
        em.ir.br(cont);
        let mut last = then_end;

        if let (Some(block), Some(false_block)) = (else_block, false_block) {
            let else_end = self.gen_scoped_block(block, ctx.at(false_block))?;
            let mut em = self.emitter(pos.function, else_end);
            em.ir.br(cont);
            last = else_end;
        }

        self.emitter(pos.function, last).ir.move_block_after(cont, last);
        Ok(cont)
    }

    /// `while` tests, `whileloop` is the body, `whileend` follows.
    pub(crate) fn gen_while(&mut self, cond: &Expr, body: &Block, ctx: Context) -> CodegenResult<BlockId> {
        let pos = ctx.position(cond.span)?;
        let mut em = self.emitter(pos.function, pos.block);
        let test = em.ir.create_block("while");
        let loop_block = em.ir.create_block("whileloop");
        let end = em.ir.create_block("whileend");
        em.ir.br(test);
        tracing::debug!(test = test.0, end = end.0, "while");

        let test_pos = ctx.at(test).position(cond.span)?;
        let value = self.gen_expr(cond, test_pos)?;
        let truth = self.truth(value, test_pos, cond.span)?;
        self.emitter(pos.function, test).ir.cond_br(truth, loop_block, end);

        let body_end = self.gen_scoped_block(body, ctx.at(loop_block))?;
        let mut em = self.emitter(pos.function, body_end);
        em.ir.br(test);
        em.ir.move_block_after(end, body_end);
        Ok(end)
    }

    /// `FOR var = start TO end [STEP step]`. The bound and the step are
    /// evaluated on every iteration; the test is `var <= end` through the
    /// variable type's operators.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn gen_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Block,
        ctx: Context,
        span: Span,
    ) -> CodegenResult<BlockId> {
        let pos = ctx.position(span)?;
        let id = self.resolve(pos.scope, var, span)?;
        let (place, ty) = self.address(id, pos, span)?;
        let ir_ty = ty.ir_type();
        if !ir_ty.is_int() {
            return Err(CodegenErrorKind::TypeMismatch {
                expected: "a numeric loop variable".to_string(),
                found: ty.name().to_string(),
            }
            .at(span));
        }

        let first = self.gen_expr(start, pos)?;
        let first = self.coerce(first, &ty, pos, start.span)?;
        let mut em = self.emitter(pos.function, pos.block);
        let ops = operators_of(&ty, "<=").map_err(|kind| kind.at(span))?;
        ops.assign(&mut em, place, first).map_err(|kind| kind.at(span))?;

        let test = em.ir.create_block("for");
        let body_block = em.ir.create_block("forbody");
        let exit = em.ir.create_block("forend");
        em.ir.br(test);
        tracing::debug!(var, test = test.0, exit = exit.0, "for");

        let test_pos = ctx.at(test).position(span)?;
        let limit = self.gen_expr(end, test_pos)?;
        let limit = self.coerce(limit, &ty, test_pos, end.span)?;
        let mut em = self.emitter(pos.function, test);
        let current = em.ir.load(ir_ty, place);
        let going = ops
            .compare(&mut em, Relation::Le, current, limit)
            .map_err(|kind| kind.at(span))?;
        em.ir.cond_br(going, body_block, exit);

        let body_end = self.gen_scoped_block(body, ctx.at(body_block))?;
        let step_pos = ctx.at(body_end).position(span)?;
        let step = match step {
            Some(step) => {
                let value = self.gen_expr(step, step_pos)?;
                self.coerce(value, &ty, step_pos, step.span)?
            }
            None => Value::iconst(ir_ty, 1),
        };
        let mut em = self.emitter(pos.function, body_end);
        let current = em.ir.load(ir_ty, place);
        let next = ops.add(&mut em, current, step).map_err(|kind| kind.at(span))?;
        ops.assign(&mut em, place, next).map_err(|kind| kind.at(span))?;
        em.ir.br(test);
        em.ir.move_block_after(exit, body_end);
        Ok(exit)
    }
}
