// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! IrType → Cranelift type translation.

use cranelift::prelude::*;
use cranelift_codegen::isa::CallConv;
use crate::{CodegenError, CodegenResult};

/// Translate an IR type. Truth values travel as `i8` holding 0 or 1.
pub fn ir_to_cranelift_type(ty: qbc_ir::IrType, ptr_ty: Type) -> CodegenResult<Type> {
    match ty {
        qbc_ir::IrType::Void => Err(CodegenError::TypeConversionFailed("void has no value type".to_string())),
        qbc_ir::IrType::I1 | qbc_ir::IrType::I8 => Ok(types::I8),
        qbc_ir::IrType::I32 => Ok(types::I32),
        qbc_ir::IrType::I64 => Ok(types::I64),
        qbc_ir::IrType::Ptr => Ok(ptr_ty),
    }
}

/// Fixed part of an IR signature. Variadic tails are added per call site.
pub fn ir_signature(sig: &qbc_ir::Signature, call_conv: CallConv, ptr_ty: Type) -> CodegenResult<Signature> {
    let mut out = Signature::new(call_conv);
    for param in &sig.params {
        out.params.push(AbiParam::new(ir_to_cranelift_type(*param, ptr_ty)?));
    }
    if sig.ret != qbc_ir::IrType::Void {
        out.returns.push(AbiParam::new(ir_to_cranelift_type(sig.ret, ptr_ty)?));
    }
    Ok(out)
}

/// log2 of the natural alignment, for stack slots.
pub fn align_shift(ty: qbc_ir::IrType) -> u8 {
    match ty.bytes() {
        0 | 1 => 0,
        2 => 1,
        4 => 2,
        _ => 3,
    }
}
