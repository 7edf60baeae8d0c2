// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! IR value types - machine-level integers and pointers only.

/// IR type of a value, a stack slot or a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    /// Truth value produced by comparisons.
    I1,
    I8,
    I32,
    I64,
    Ptr,
}

impl IrType {
    /// Width in bits. Pointers are 64-bit.
    pub fn bits(&self) -> u32 {
        match self {
            IrType::Void => 0,
            IrType::I1 => 1,
            IrType::I8 => 8,
            IrType::I32 => 32,
            IrType::I64 | IrType::Ptr => 64,
        }
    }

    /// Byte size used for stack slots.
    pub fn bytes(&self) -> u32 {
        match self {
            IrType::Void => 0,
            IrType::I1 | IrType::I8 => 1,
            IrType::I32 => 4,
            IrType::I64 | IrType::Ptr => 8,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, IrType::I1 | IrType::I8 | IrType::I32 | IrType::I64)
    }

    /// Truncate `v` to this type's width, sign-extending the result back to i64.
    pub fn wrap(&self, v: i64) -> i64 {
        match self {
            IrType::Void => 0,
            IrType::I1 => v & 1,
            IrType::I8 => v as i8 as i64,
            IrType::I32 => v as i32 as i64,
            IrType::I64 | IrType::Ptr => v,
        }
    }
}
