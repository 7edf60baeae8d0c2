// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Syntax tree handed over by the parser.
//!
//! Type names are already resolved: every declaration carries a shared
//! [`TypeRef`](crate::TypeRef). Nodes own their children exclusively.

mod expr;
mod stmt;

pub use expr::{Expr, ExprKind, MathOp};
pub use stmt::{Block, DimStmt, FunctionDecl, Param, PrintStmt, Program, Stmt, StmtKind};

/// Identity of a syntax node. Declarations are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id of nodes the compiler makes up itself (the implicit `main`).
    pub const SYNTHETIC: NodeId = NodeId(u32::MAX);
}

/// Byte range in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Hands out fresh node ids while a tree is being built.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}
