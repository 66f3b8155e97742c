//! Target instruction-set tiers and their register-file capabilities.

use serde::{Deserialize, Serialize};

/// Vector capability level of the target processor.
///
/// The tier fixes the vector width, the architectural register counts, and
/// which composite operations (blend, fused multiply-add) are native rather
/// than emulated with extra scratch registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsaLevel {
    /// 128-bit vectors, 16 vector registers, no native blend/fma.
    Baseline128,
    /// 256-bit vectors, 16 vector registers, native blend and fma.
    Wide256,
    /// 512-bit vectors, 32 vector registers, native blend and fma.
    Wide512,
}

impl IsaLevel {
    pub fn vector_bytes(self) -> usize {
        match self {
            IsaLevel::Baseline128 => 16,
            IsaLevel::Wide256 => 32,
            IsaLevel::Wide512 => 64,
        }
    }

    /// Number of f32 lanes per vector register.
    pub fn lanes_f32(self) -> usize {
        self.vector_bytes() / 4
    }

    pub fn vector_registers(self) -> usize {
        match self {
            IsaLevel::Baseline128 | IsaLevel::Wide256 => 16,
            IsaLevel::Wide512 => 32,
        }
    }

    /// Addressable general-purpose registers available to a kernel for
    /// buffer pointers, the constant-table base, and emitter scratch.
    pub fn general_registers(self) -> usize {
        8
    }

    /// Blend and fused multiply-add exist as single instructions on the
    /// wide tiers; the baseline tier emulates them with logical ops.
    pub fn has_native_blend(self) -> bool {
        !matches!(self, IsaLevel::Baseline128)
    }

    pub fn has_native_fma(self) -> bool {
        !matches!(self, IsaLevel::Baseline128)
    }

    pub fn name(self) -> &'static str {
        match self {
            IsaLevel::Baseline128 => "baseline128",
            IsaLevel::Wide256 => "wide256",
            IsaLevel::Wide512 => "wide512",
        }
    }
}
