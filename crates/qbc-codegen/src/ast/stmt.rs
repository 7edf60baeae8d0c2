// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Statement nodes, scope blocks and function declarations.

use std::collections::HashSet;

use qbc_ir::Linkage;

use super::{Expr, NodeId, Span};
use crate::TypeRef;

#[derive(Debug)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug)]
pub enum StmtKind {
    Empty,
    /// `DIM name AS type`
    Dim(DimStmt),
    /// `name = value`
    Assign { target: String, value: Expr },
    /// Expression evaluated for its side effects (usually a call).
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    /// `FOR var = start TO end [STEP step]`
    For {
        var: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
    },
    Block(Block),
    Print(PrintStmt),
    Function(FunctionDecl),
}

#[derive(Debug)]
pub struct DimStmt {
    pub name: String,
    pub ty: TypeRef,
}

/// `PRINT [#dest,] args [;]`
#[derive(Debug)]
pub struct PrintStmt {
    pub destination: Option<Expr>,
    pub args: Vec<Expr>,
    /// False when the statement ends with a separator.
    pub newline: bool,
}

/// A scope: statements plus, during code generation, a symbol table.
#[derive(Debug)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    /// Names assigned to (including FOR variables) anywhere in the block
    /// that are not declared by a `DIM` of the block itself or of a block
    /// around the write.
    pub fn outer_writes(&self) -> HashSet<String> {
        let mut writes = HashSet::new();
        self.collect_outer_writes(&HashSet::new(), &mut writes);
        writes
    }

    fn collect_outer_writes(&self, declared: &HashSet<String>, writes: &mut HashSet<String>) {
        let mut declared = declared.clone();
        let mut write = |name: &String, declared: &HashSet<String>| {
            if !declared.contains(name) {
                writes.insert(name.clone());
            }
        };
        let mut nested = Vec::new();
        for stmt in &self.stmts {
            match &stmt.kind {
                StmtKind::Dim(dim) => {
                    declared.insert(dim.name.clone());
                }
                StmtKind::Assign { target, .. } => write(target, &declared),
                StmtKind::For { var, body, .. } => {
                    write(var, &declared);
                    nested.push((body, declared.clone()));
                }
                StmtKind::If { then_block, else_block, .. } => {
                    nested.push((then_block, declared.clone()));
                    if let Some(block) = else_block {
                        nested.push((block, declared.clone()));
                    }
                }
                StmtKind::While { body, .. } => nested.push((body, declared.clone())),
                StmtKind::Block(block) => nested.push((block, declared.clone())),
                _ => {}
            }
        }
        for (block, declared) in nested {
            block.collect_outer_writes(&declared, writes);
        }
    }
}

#[derive(Debug)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub ty: TypeRef,
    pub span: Span,
}

/// `FUNCTION`/`SUB` definition, or a prototype when `body` is `None`.
#[derive(Debug)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub name: String,
    pub linkage: Linkage,
    pub params: Vec<Param>,
    /// `None` for procedures.
    pub ret: Option<TypeRef>,
    /// C-style variadic prototype (`IMPORTC` only).
    pub variadic: bool,
    pub body: Option<Block>,
    pub span: Span,
}

impl FunctionDecl {
    /// The exported `main` that wraps a program's top-level statements.
    pub fn default_main(body: Block, long: TypeRef) -> Self {
        FunctionDecl {
            id: NodeId::SYNTHETIC,
            name: "main".to_string(),
            linkage: Linkage::Export,
            params: Vec::new(),
            ret: Some(long),
            variadic: false,
            span: body.span,
            body: Some(body),
        }
    }
}

/// Root scope block of a source file.
#[derive(Debug)]
pub struct Program {
    pub body: Block,
}
