// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Textual listing of IR modules.

use crate::*;
use std::fmt;

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::I1 => write!(f, "i1"),
            IrType::I8 => write!(f, "i8"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::Ptr => write!(f, "ptr"),
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linkage::Internal => write!(f, "internal"),
            Linkage::Export => write!(f, "export"),
            Linkage::Import => write!(f, "import"),
        }
    }
}

impl fmt::Display for IntCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntCC::Eq => "eq",
            IntCC::Ne => "ne",
            IntCC::Slt => "slt",
            IntCC::Sle => "sle",
            IntCC::Sgt => "sgt",
            IntCC::Sge => "sge",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::SRem => "srem",
        };
        write!(f, "{}", s)
    }
}

/// Listing context: operands referring to functions and globals need the module.
struct Operand<'a>(&'a Module, &'a Value);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Value::Const { ty: IrType::I1, bits } => write!(f, "{}", *bits != 0),
            Value::Const { bits, .. } => write!(f, "{}", bits),
            Value::Inst(id) => write!(f, "v{}", id.0),
            Value::Param(i) => write!(f, "%{}", i),
            Value::Slot(id) => write!(f, "slot{}", id.0),
            Value::Global(id) => write!(f, "@{}", self.0.global(*id).name),
            Value::Func(id) => write!(f, "@{}", self.0.function(*id).name),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, module: &Module, args: &[Value]) -> fmt::Result {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", Operand(module, a))?;
    }
    Ok(())
}

fn write_inst(f: &mut fmt::Formatter<'_>, module: &Module, func: &Function, inst: &Inst) -> fmt::Result {
    let op = |v| Operand(module, v);
    match inst {
        Inst::StackAlloc { slot } => {
            let data = &func.slots[slot.0 as usize];
            write!(f, "slot{} = alloca {} \"{}\"", slot.0, data.ty, data.name)
        }
        Inst::Load { dst, ty, addr } => write!(f, "v{} = load {} {}", dst.0, ty, op(addr)),
        Inst::Store { value, addr } => write!(f, "store {}, {}", op(value), op(addr)),
        Inst::IntCast { dst, value, ty, signed } => {
            let kind = if *signed { "scast" } else { "ucast" };
            write!(f, "v{} = {} {} to {}", dst.0, kind, op(value), ty)
        }
        Inst::Icmp { dst, cond, lhs, rhs } => {
            write!(f, "v{} = icmp {} {}, {}", dst.0, cond, op(lhs), op(rhs))
        }
        Inst::Binary { dst, op: bin, lhs, rhs } => {
            write!(f, "v{} = {} {}, {}", dst.0, bin, op(lhs), op(rhs))
        }
        Inst::Call { dst, callee, args } => {
            if let Some(dst) = dst {
                write!(f, "v{} = ", dst.0)?;
            }
            write!(f, "call @{}(", module.function(*callee).name)?;
            write_args(f, module, args)?;
            write!(f, ")")
        }
    }
}

fn write_terminator(f: &mut fmt::Formatter<'_>, module: &Module, func: &Function, term: &Terminator) -> fmt::Result {
    let label = |b: &BlockId| format!("{}.{}", func.block(*b).name, b.0);
    match term {
        Terminator::Br { target } => write!(f, "br {}", label(target)),
        Terminator::CondBr { cond, then_block, else_block } => write!(
            f,
            "br {}, {}, {}",
            Operand(module, cond),
            label(then_block),
            label(else_block)
        ),
        Terminator::Ret { value: Some(v) } => write!(f, "ret {}", Operand(module, v)),
        Terminator::Ret { value: None } => write!(f, "ret void"),
    }
}

fn write_function(f: &mut fmt::Formatter<'_>, module: &Module, func: &Function) -> fmt::Result {
    let keyword = if func.has_body() { "define" } else { "declare" };
    write!(f, "{} {} {} @{}(", keyword, func.linkage, func.sig.ret, func.name)?;
    for (i, ty) in func.sig.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match func.param_names.get(i).and_then(|n| n.as_deref()) {
            Some(name) => write!(f, "{} %{} \"{}\"", ty, i, name)?,
            None => write!(f, "{} %{}", ty, i)?,
        }
    }
    if func.sig.variadic {
        if !func.sig.params.is_empty() {
            write!(f, ", ")?;
        }
        write!(f, "...")?;
    }
    write!(f, ")")?;
    if !func.has_body() {
        return writeln!(f);
    }
    writeln!(f, " {{")?;
    for block in func.blocks_in_layout() {
        writeln!(f, "{}.{}:", block.name, block.id.0)?;
        for inst in &block.insts {
            write!(f, "    ")?;
            write_inst(f, module, func, inst)?;
            writeln!(f)?;
        }
        match &block.terminator {
            Some(term) => {
                write!(f, "    ")?;
                write_terminator(f, module, func, term)?;
                writeln!(f)?;
            }
            None => writeln!(f, "    <unterminated>")?,
        }
    }
    writeln!(f, "}}")
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;
        for global in self.globals() {
            writeln!(f, "@{} = {:?}", global.name, global.content)?;
        }
        for func in self.functions() {
            writeln!(f)?;
            write_function(f, self, func)?;
        }
        Ok(())
    }
}

impl Module {
    /// Listing of a single function.
    pub fn display_function(&self, id: FuncId) -> String {
        struct One<'a>(&'a Module, &'a Function);
        impl fmt::Display for One<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_function(f, self.0, self.1)
            }
        }
        One(self, self.function(id)).to_string()
    }
}
