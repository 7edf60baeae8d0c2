// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Expression nodes.

use super::{NodeId, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    /// `MOD`
    Mod,
    /// `=`
    Eq,
    /// `<>`
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl MathOp {
    /// Source spelling, for diagnostics.
    pub fn symbol(&self) -> &'static str {
        match self {
            MathOp::Add => "+",
            MathOp::Sub => "-",
            MathOp::Mul => "*",
            MathOp::Div => "/",
            MathOp::Mod => "MOD",
            MathOp::Eq => "=",
            MathOp::Ne => "<>",
            MathOp::Lt => "<",
            MathOp::Le => "<=",
            MathOp::Gt => ">",
            MathOp::Ge => ">=",
        }
    }
}

#[derive(Debug)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug)]
pub enum ExprKind {
    /// Integer literal, typed `LONG`.
    Number(i64),
    /// String literal.
    Str(String),
    /// Reference to a variable, argument or function.
    Name(String),
    Binary {
        op: MathOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Unary minus.
    Neg(Box<Expr>),
    Call {
        callee: String,
        args: Vec<Expr>,
    },
}
