// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! PRINT: build a format string from the argument types, then call the
//! C library or the BASIC runtime.

use qbc_ir::{IrType, Value};

use super::Codegen;
use crate::ast::{PrintStmt, Span};
use crate::context::Context;
use crate::error::{CodegenErrorKind, CodegenResult};
use crate::options::PrintMode;
use crate::runtime;
use crate::types::TypeRef;

/// printf conversion for one argument, followed by a tab.
fn placeholder(ty: &TypeRef) -> Result<&'static str, CodegenErrorKind> {
    match (ty.size(), ty.name()) {
        (8, "string") => Ok("%s\t"),
        (8, _) => Ok("%ld\t"),
        (4, _) => Ok("%d\t"),
        (size, name) => Err(CodegenErrorKind::UnsupportedPrintArgument { ty: name.to_string(), size }),
    }
}

impl Codegen {
    pub(crate) fn gen_print(&mut self, print: &PrintStmt, ctx: Context, span: Span) -> CodegenResult<qbc_ir::BlockId> {
        let pos = ctx.position(span)?;

        let (callee, leading) = match self.options.print_mode {
            PrintMode::Printf => (runtime::PRINTF, Vec::new()),
            PrintMode::Runtime => {
                let dest = match &print.destination {
                    Some(expr) => {
                        let typed = self.gen_expr(expr, pos)?;
                        let long = self.types.long();
                        self.coerce(typed, &long, pos, expr.span)?
                    }
                    None => Value::iconst(IrType::I64, 0),
                };
                (runtime::PRINT, vec![dest])
            }
        };

        let mut format = String::new();
        let mut args = Vec::with_capacity(print.args.len() + 2);
        for arg in &print.args {
            let typed = self.gen_expr(arg, pos)?;
            format.push_str(placeholder(&typed.ty).map_err(|kind| kind.at(arg.span))?);
            args.push(typed.value);
        }
        if print.newline {
            format.push('\n');
        }

        let mut em = self.emitter(pos.function, pos.block);
        let format = em.ir.string_ptr(&format);
        let call_args = leading.into_iter().chain(std::iter::once(format)).chain(args).collect();
        em.runtime_call(callee, call_args).map_err(|kind| kind.at(span))?;
        tracing::trace!(callee, "print");
        Ok(pos.block)
    }
}
