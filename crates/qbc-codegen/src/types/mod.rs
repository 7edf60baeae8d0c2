// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Type descriptors and operator dispatch.
//!
//! Code generation never inspects a type's representation directly: storage
//! is obtained through [`TypeDescriptor::allocate`] and every operator goes
//! through the [`Operators`] of the left operand's type.

mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use qbc_ir::{IntCC, IrType, Value};

pub use builtin::{CallableType, IntegerType, StringType, VoidType};

use crate::emit::Emitter;
use crate::error::{CodegenErrorKind, OpResult};

/// Shared handle to a type descriptor.
pub type TypeRef = Rc<dyn TypeDescriptor>;

/// Relational operator, as BASIC spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Relation {
    pub fn int_cc(self) -> IntCC {
        match self {
            Relation::Eq => IntCC::Eq,
            Relation::Ne => IntCC::Ne,
            Relation::Lt => IntCC::Slt,
            Relation::Le => IntCC::Sle,
            Relation::Gt => IntCC::Sgt,
            Relation::Ge => IntCC::Sge,
        }
    }
}

/// Operators beyond `+` and `-`; only numeric types have them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "MOD",
        }
    }
}

/// Describes one BASIC type: its machine representation, how storage for
/// it is created and destroyed, and which operators it has.
pub trait TypeDescriptor: fmt::Debug {
    fn name(&self) -> &str;

    /// Size in bytes.
    fn size(&self) -> u32;

    fn ir_type(&self) -> IrType;

    fn default_value(&self) -> Value {
        Value::iconst(self.ir_type(), 0)
    }

    /// Create storage for one variable and return its address. The slot is
    /// reserved and zeroed in the entry block, so every path through the
    /// function sees initialised storage; it is also reset where the
    /// declaration executes.
    fn allocate(&self, em: &mut Emitter<'_>, hint: &str) -> OpResult<Value> {
        let init = self.default_value();
        let slot = {
            let mut entry = em.at_entry();
            let slot = entry.ir.stack_alloc(self.ir_type(), hint);
            entry.ir.store(init, slot);
            slot
        };
        if !em.in_entry_block() {
            em.ir.store(init, slot);
        }
        Ok(slot)
    }

    /// Release whatever `storage` owns. Scalars own nothing.
    fn destroy(&self, _em: &mut Emitter<'_>, _storage: Value) -> OpResult<()> {
        Ok(())
    }

    fn operators(&self) -> Option<&dyn Operators> {
        None
    }
}

/// Operator implementations of a type. Both operands already have the
/// implementing type; `place` is an address.
pub trait Operators {
    fn add(&self, em: &mut Emitter<'_>, lhs: Value, rhs: Value) -> OpResult<Value>;

    fn sub(&self, em: &mut Emitter<'_>, lhs: Value, rhs: Value) -> OpResult<Value>;

    /// Returns an `i1` truth value.
    fn compare(&self, em: &mut Emitter<'_>, rel: Relation, lhs: Value, rhs: Value) -> OpResult<Value>;

    fn assign(&self, em: &mut Emitter<'_>, place: Value, value: Value) -> OpResult<()>;

    fn arith(&self, _em: &mut Emitter<'_>, op: ArithOp, _lhs: Value, _rhs: Value) -> OpResult<Value> {
        Err(CodegenErrorKind::UnsupportedOperator {
            op: op.symbol().to_string(),
            ty: self.type_name().to_string(),
        })
    }

    /// Name used in diagnostics.
    fn type_name(&self) -> &str;
}

/// Operators of `ty`, or an error naming the operator that was wanted.
pub fn operators_of<'t>(ty: &'t TypeRef, op: &str) -> OpResult<&'t dyn Operators> {
    ty.operators().ok_or_else(|| CodegenErrorKind::UnsupportedOperator {
        op: op.to_string(),
        ty: ty.name().to_string(),
    })
}

/// BASIC type names to descriptors.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: HashMap<String, TypeRef>,
    long: TypeRef,
    integer: TypeRef,
    string: TypeRef,
    void: TypeRef,
}

impl TypeTable {
    pub fn with_builtins() -> Self {
        let long: TypeRef = Rc::new(IntegerType::long());
        let integer: TypeRef = Rc::new(IntegerType::integer());
        let string: TypeRef = Rc::new(StringType);
        let void: TypeRef = Rc::new(VoidType);
        let types = HashMap::from([
            ("LONG".to_string(), long.clone()),
            ("INTEGER".to_string(), integer.clone()),
            ("STRING".to_string(), string.clone()),
        ]);
        TypeTable { types, long, integer, string, void }
    }

    /// Look up a type by its BASIC name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.types.get(&name.to_ascii_uppercase()).cloned()
    }

    pub fn register(&mut self, name: &str, ty: TypeRef) {
        self.types.insert(name.to_ascii_uppercase(), ty);
    }

    pub fn long(&self) -> TypeRef {
        self.long.clone()
    }

    pub fn integer(&self) -> TypeRef {
        self.integer.clone()
    }

    pub fn string(&self) -> TypeRef {
        self.string.clone()
    }

    pub fn void(&self) -> TypeRef {
        self.void.clone()
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Two descriptors denote the same type when their names agree.
pub fn same_type(a: &TypeRef, b: &TypeRef) -> bool {
    Rc::ptr_eq(a, b) || a.name() == b.name()
}
