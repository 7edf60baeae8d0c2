// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Expression lowering. Expressions never create blocks.

use qbc_ir::{IrType, Value};

use super::Codegen;
use crate::ast::{Expr, ExprKind, MathOp, Span};
use crate::context::Position;
use crate::decl::Binding;
use crate::error::{CodegenErrorKind, CodegenResult};
use crate::types::{operators_of, same_type, ArithOp, Relation, TypeRef};

/// An IR value together with its BASIC type.
#[derive(Debug, Clone)]
pub struct Typed {
    pub value: Value,
    pub ty: TypeRef,
}

impl Codegen {
    pub(crate) fn gen_expr(&mut self, expr: &Expr, pos: Position) -> CodegenResult<Typed> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Typed {
                value: Value::iconst(IrType::I64, *n),
                ty: self.types.long(),
            }),
            ExprKind::Str(s) => {
                let value = self.emitter(pos.function, pos.block).ir.string_ptr(s);
                Ok(Typed { value, ty: self.types.string() })
            }
            ExprKind::Name(name) => {
                let id = self.resolve(pos.scope, name, expr.span)?;
                self.value(id, pos, expr.span)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.gen_expr(lhs, pos)?;
                let rhs = self.gen_expr(rhs, pos)?;
                self.gen_binary(*op, lhs, rhs, pos, expr.span)
            }
            ExprKind::Neg(operand) => {
                let operand = self.gen_expr(operand, pos)?;
                let ty = operand.ty.clone();
                let zero = Value::iconst(ty.ir_type(), 0);
                let mut em = self.emitter(pos.function, pos.block);
                let value = operators_of(&ty, "-")
                    .and_then(|ops| ops.sub(&mut em, zero, operand.value))
                    .map_err(|kind| kind.at(expr.span))?;
                Ok(Typed { value, ty })
            }
            ExprKind::Call { callee, args } => self.gen_call(callee, args, pos, expr.span),
        }
    }

    /// Dispatch on the left operand's type. Comparisons yield a `LONG`
    /// that is -1 when true and 0 when false.
    fn gen_binary(&mut self, op: MathOp, lhs: Typed, rhs: Typed, pos: Position, span: Span) -> CodegenResult<Typed> {
        let ty = lhs.ty.clone();
        let rhs = self.coerce(rhs, &ty, pos, span)?;
        let long = self.types.long();
        let mut em = self.emitter(pos.function, pos.block);
        let ops = operators_of(&ty, op.symbol()).map_err(|kind| kind.at(span))?;
        let relation = match op {
            MathOp::Eq => Some(Relation::Eq),
            MathOp::Ne => Some(Relation::Ne),
            MathOp::Lt => Some(Relation::Lt),
            MathOp::Le => Some(Relation::Le),
            MathOp::Gt => Some(Relation::Gt),
            MathOp::Ge => Some(Relation::Ge),
            _ => None,
        };
        if let Some(rel) = relation {
            let truth = ops.compare(&mut em, rel, lhs.value, rhs).map_err(|kind| kind.at(span))?;
            let value = em.ir.int_cast(truth, long.ir_type(), true);
            return Ok(Typed { value, ty: long });
        }
        let value = match op {
            MathOp::Add => ops.add(&mut em, lhs.value, rhs),
            MathOp::Sub => ops.sub(&mut em, lhs.value, rhs),
            MathOp::Mul => ops.arith(&mut em, ArithOp::Mul, lhs.value, rhs),
            MathOp::Div => ops.arith(&mut em, ArithOp::Div, lhs.value, rhs),
            _ => ops.arith(&mut em, ArithOp::Rem, lhs.value, rhs),
        }
        .map_err(|kind| kind.at(span))?;
        Ok(Typed { value, ty })
    }

    fn gen_call(&mut self, callee: &str, args: &[Expr], pos: Position, span: Span) -> CodegenResult<Typed> {
        let id = self.resolve(pos.scope, callee, span)?;
        let (proto, func) = match self.binding(id, span)? {
            Binding::Function { ty, func, .. } => (ty.clone(), *func),
            _ => return Err(CodegenErrorKind::NotCallable { name: callee.to_string() }.at(span)),
        };
        let arity_ok = if proto.variadic {
            args.len() >= proto.params.len()
        } else {
            args.len() == proto.params.len()
        };
        if !arity_ok {
            return Err(CodegenErrorKind::ArityMismatch {
                name: callee.to_string(),
                expected: proto.params.len(),
                found: args.len(),
            }
            .at(span));
        }

        let mut values = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let typed = self.gen_expr(arg, pos)?;
            let value = match proto.params.get(i) {
                Some(param) => self.coerce(typed, param, pos, arg.span)?,
                // variadic tail is passed as is
                None => typed.value,
            };
            values.push(value);
        }

        let result = self.emitter(pos.function, pos.block).ir.call(func, values);
        match (&proto.ret, result) {
            (Some(ty), Some(value)) => Ok(Typed { value, ty: ty.clone() }),
            _ => Ok(Typed { value: Value::iconst(IrType::Void, 0), ty: self.types.void() }),
        }
    }

    /// Convert `value` to `target`. Integers of different widths convert
    /// with a signed cast; anything else must already match.
    pub(crate) fn coerce(&mut self, value: Typed, target: &TypeRef, pos: Position, span: Span) -> CodegenResult<Value> {
        if same_type(&value.ty, target) {
            return Ok(value.value);
        }
        let (from, to) = (value.ty.ir_type(), target.ir_type());
        if from.is_int() && to.is_int() {
            return Ok(self.emitter(pos.function, pos.block).ir.int_cast(value.value, to, true));
        }
        Err(CodegenErrorKind::TypeMismatch {
            expected: target.name().to_string(),
            found: value.ty.name().to_string(),
        }
        .at(span))
    }

    /// `i1` truth value of a condition: non-zero is true.
    pub(crate) fn truth(&mut self, cond: Typed, pos: Position, span: Span) -> CodegenResult<Value> {
        let ty = cond.ty.ir_type();
        if !(ty.is_int() || ty == IrType::Ptr) {
            return Err(CodegenErrorKind::TypeMismatch {
                expected: "a numeric condition".to_string(),
                found: cond.ty.name().to_string(),
            }
            .at(span));
        }
        let mut em = self.emitter(pos.function, pos.block);
        Ok(em.ir.icmp(qbc_ir::IntCC::Ne, cond.value, Value::iconst(ty, 0)))
    }
}
