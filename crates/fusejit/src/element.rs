//! Enumerates the scalar element types understood by the compiler core.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Logical scalar kind attached to every operand descriptor.
///
/// `Dynamic` is a placeholder meaning "not yet known"; it is compatible with
/// every concrete type and resolves toward the concrete side during
/// inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Dynamic,
    Boolean,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F16,
    Bf16,
    F32,
    F64,
}

impl ElementType {
    /// Returns the storage size in bytes, or `None` for `Dynamic`.
    pub fn size_in_bytes(self) -> Option<usize> {
        match self {
            ElementType::Dynamic => None,
            ElementType::Boolean | ElementType::I8 | ElementType::U8 => Some(1),
            ElementType::I16 | ElementType::U16 | ElementType::F16 | ElementType::Bf16 => Some(2),
            ElementType::I32 | ElementType::U32 | ElementType::F32 => Some(4),
            ElementType::I64 | ElementType::U64 | ElementType::F64 => Some(8),
        }
    }

    pub fn is_dynamic(self) -> bool {
        self == ElementType::Dynamic
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            ElementType::F16 | ElementType::Bf16 | ElementType::F32 | ElementType::F64
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ElementType::I8
                | ElementType::U8
                | ElementType::I16
                | ElementType::U16
                | ElementType::I32
                | ElementType::U32
                | ElementType::I64
                | ElementType::U64
        )
    }

    /// Arithmetic operators accept any numeric type; booleans are rejected.
    pub fn is_numeric(self) -> bool {
        self.is_float() || self.is_integer()
    }

    /// Two element types are compatible when identical or either is dynamic.
    pub fn compatible(self, other: ElementType) -> bool {
        self == other || self.is_dynamic() || other.is_dynamic()
    }

    /// Merges two element types, resolving `Dynamic` toward the concrete
    /// side. Reports the offending argument indices on mismatch.
    pub fn merge(
        self,
        other: ElementType,
        lhs_index: usize,
        rhs_index: usize,
    ) -> Result<ElementType, ValidationError> {
        match (self, other) {
            (a, b) if a == b => Ok(a),
            (ElementType::Dynamic, b) => Ok(b),
            (a, ElementType::Dynamic) => Ok(a),
            (a, b) => Err(ValidationError::ElementTypeMismatch {
                first: lhs_index,
                second: rhs_index,
                cause: format!("argument {lhs_index} and {rhs_index} element types must match, got {a:?} vs {b:?}"),
            }),
        }
    }

    /// Produces a stable tag used by the binary dump container.
    pub fn tag(self) -> u8 {
        match self {
            ElementType::Dynamic => 0xFE,
            ElementType::Boolean => 0,
            ElementType::I8 => 1,
            ElementType::U8 => 2,
            ElementType::I16 => 3,
            ElementType::U16 => 4,
            ElementType::I32 => 5,
            ElementType::U32 => 6,
            ElementType::I64 => 7,
            ElementType::U64 => 8,
            ElementType::F16 => 9,
            ElementType::Bf16 => 10,
            ElementType::F32 => 11,
            ElementType::F64 => 12,
        }
    }

    /// Reconstructs an `ElementType` from its serialized tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ElementType::Boolean),
            1 => Some(ElementType::I8),
            2 => Some(ElementType::U8),
            3 => Some(ElementType::I16),
            4 => Some(ElementType::U16),
            5 => Some(ElementType::I32),
            6 => Some(ElementType::U32),
            7 => Some(ElementType::I64),
            8 => Some(ElementType::U64),
            9 => Some(ElementType::F16),
            10 => Some(ElementType::Bf16),
            11 => Some(ElementType::F32),
            12 => Some(ElementType::F64),
            0xFE => Some(ElementType::Dynamic),
            _ => None,
        }
    }

    /// Short uppercase name used by the text dump header, e.g. `FP32`.
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Dynamic => "DYN",
            ElementType::Boolean => "BOOL",
            ElementType::I8 => "I8",
            ElementType::U8 => "U8",
            ElementType::I16 => "I16",
            ElementType::U16 => "U16",
            ElementType::I32 => "I32",
            ElementType::U32 => "U32",
            ElementType::I64 => "I64",
            ElementType::U64 => "U64",
            ElementType::F16 => "FP16",
            ElementType::Bf16 => "BF16",
            ElementType::F32 => "FP32",
            ElementType::F64 => "FP64",
        }
    }
}
