// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Built-in BASIC types.

use qbc_ir::{BinOp, IrType, Value};

use super::{ArithOp, Operators, Relation, TypeDescriptor, TypeRef};
use crate::emit::Emitter;
use crate::error::{CodegenErrorKind, OpResult};
use crate::runtime;

/// Signed machine integer: `LONG` (64-bit) or `INTEGER` (32-bit).
#[derive(Debug, Clone)]
pub struct IntegerType {
    name: &'static str,
    ir: IrType,
}

impl IntegerType {
    pub fn long() -> Self {
        IntegerType { name: "long", ir: IrType::I64 }
    }

    pub fn integer() -> Self {
        IntegerType { name: "integer", ir: IrType::I32 }
    }
}

impl TypeDescriptor for IntegerType {
    fn name(&self) -> &str {
        self.name
    }

    fn size(&self) -> u32 {
        self.ir.bytes()
    }

    fn ir_type(&self) -> IrType {
        self.ir
    }

    fn operators(&self) -> Option<&dyn Operators> {
        Some(self)
    }
}

impl Operators for IntegerType {
    fn add(&self, em: &mut Emitter<'_>, lhs: Value, rhs: Value) -> OpResult<Value> {
        Ok(em.ir.binary(BinOp::Add, lhs, rhs))
    }

    fn sub(&self, em: &mut Emitter<'_>, lhs: Value, rhs: Value) -> OpResult<Value> {
        Ok(em.ir.binary(BinOp::Sub, lhs, rhs))
    }

    fn compare(&self, em: &mut Emitter<'_>, rel: Relation, lhs: Value, rhs: Value) -> OpResult<Value> {
        Ok(em.ir.icmp(rel.int_cc(), lhs, rhs))
    }

    fn assign(&self, em: &mut Emitter<'_>, place: Value, value: Value) -> OpResult<()> {
        em.ir.store(value, place);
        Ok(())
    }

    fn arith(&self, em: &mut Emitter<'_>, op: ArithOp, lhs: Value, rhs: Value) -> OpResult<Value> {
        let op = match op {
            ArithOp::Mul => BinOp::Mul,
            ArithOp::Div => BinOp::SDiv,
            ArithOp::Rem => BinOp::SRem,
        };
        Ok(em.ir.binary(op, lhs, rhs))
    }

    fn type_name(&self) -> &str {
        self.name
    }
}

/// `STRING`: a pointer to a runtime-managed string. Null is the empty string.
#[derive(Debug, Clone)]
pub struct StringType;

fn returned(value: Option<Value>, function: &str) -> OpResult<Value> {
    value.ok_or_else(|| CodegenErrorKind::ContractViolation(format!("`{}` returned nothing", function)))
}

impl TypeDescriptor for StringType {
    fn name(&self) -> &str {
        "string"
    }

    fn size(&self) -> u32 {
        IrType::Ptr.bytes()
    }

    fn ir_type(&self) -> IrType {
        IrType::Ptr
    }

    fn destroy(&self, em: &mut Emitter<'_>, storage: Value) -> OpResult<()> {
        let ptr = em.ir.load(IrType::Ptr, storage);
        em.runtime_call(runtime::STRING_RELEASE, vec![ptr])?;
        Ok(())
    }

    fn operators(&self) -> Option<&dyn Operators> {
        Some(self)
    }
}

impl Operators for StringType {
    fn add(&self, em: &mut Emitter<'_>, lhs: Value, rhs: Value) -> OpResult<Value> {
        let joined = em.runtime_call(runtime::STRING_CONCAT, vec![lhs, rhs])?;
        returned(joined, runtime::STRING_CONCAT)
    }

    fn sub(&self, _em: &mut Emitter<'_>, _lhs: Value, _rhs: Value) -> OpResult<Value> {
        Err(CodegenErrorKind::UnsupportedOperator { op: "-".to_string(), ty: self.name().to_string() })
    }

    fn compare(&self, em: &mut Emitter<'_>, rel: Relation, lhs: Value, rhs: Value) -> OpResult<Value> {
        let order = em.runtime_call(runtime::STRING_COMPARE, vec![lhs, rhs])?;
        let order = returned(order, runtime::STRING_COMPARE)?;
        Ok(em.ir.icmp(rel.int_cc(), order, Value::iconst(IrType::I32, 0)))
    }

    fn assign(&self, em: &mut Emitter<'_>, place: Value, value: Value) -> OpResult<()> {
        em.runtime_call(runtime::STRING_ASSIGN, vec![place, value])?;
        Ok(())
    }

    fn type_name(&self) -> &str {
        self.name()
    }
}

/// Result type of procedures. Has no storage and no operators.
#[derive(Debug, Clone)]
pub struct VoidType;

impl TypeDescriptor for VoidType {
    fn name(&self) -> &str {
        "void"
    }

    fn size(&self) -> u32 {
        0
    }

    fn ir_type(&self) -> IrType {
        IrType::Void
    }

    fn allocate(&self, _em: &mut Emitter<'_>, _hint: &str) -> OpResult<Value> {
        Err(CodegenErrorKind::TypeMismatch { expected: "a storable type".to_string(), found: "void".to_string() })
    }
}

/// Type of a function name: its prototype.
#[derive(Debug, Clone)]
pub struct CallableType {
    pub params: Vec<TypeRef>,
    pub ret: Option<TypeRef>,
    pub variadic: bool,
}

impl TypeDescriptor for CallableType {
    fn name(&self) -> &str {
        "function"
    }

    fn size(&self) -> u32 {
        IrType::Ptr.bytes()
    }

    fn ir_type(&self) -> IrType {
        IrType::Ptr
    }
}
