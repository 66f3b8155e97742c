//! Per-operator code emitters and their dispatch registry.
//!
//! Each primitive operator kind has one emitter. An emitter declares its
//! resource needs up front (auxiliary vector registers for the target tier,
//! constant-table entries) and, given allocated registers, appends the
//! instructions that compute its result. All emitters work internally in
//! f32; boolean values use the canonical `0.0` / `1.0` representation with
//! `0x3f800000` as the "true" bit pattern.

mod arithmetic;
mod classify;
mod comparison;
mod logical;
mod select;

use std::collections::HashMap;

use fusejit::{ElementType, OpKind};
use once_cell::sync::Lazy;

use crate::code::{Assembler, BinOp, Gpr, Instr, UnOp, VecReg};
use crate::error::{CompileError, CompileResult};
use crate::isa::IsaLevel;
use crate::table::ConstantTable;

/// One operator's code generator.
pub trait Emitter: Send + Sync {
    /// Number of input operand registers the emitter consumes.
    fn inputs_len(&self) -> usize;

    /// Extra vector registers needed beyond inputs and output. May differ
    /// per tier when a composite instruction has to be emulated.
    fn aux_vecs(&self, isa: IsaLevel) -> usize;

    /// Extra general-purpose registers beyond the shared pointer and
    /// constant-table registers. Zero for every current emitter.
    fn aux_gprs(&self) -> usize {
        0
    }

    /// Interns every constant-table entry this emitter reads at runtime.
    fn register_table_entries(&self, table: &mut ConstantTable);

    /// Input element types this emitter can lower.
    fn supported_precisions(&self) -> &'static [ElementType] {
        &[ElementType::F32]
    }

    /// Appends the operator's instructions. The planner guarantees `ctx`
    /// carries exactly `inputs_len()` inputs and `aux_vecs()` scratch
    /// registers, and that every table entry was interned beforehand.
    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()>;
}

/// Register bindings and the code buffer handed to one emitter invocation.
pub struct EmitCtx<'a> {
    pub asm: &'a mut Assembler,
    pub isa: IsaLevel,
    pub inputs: &'a [VecReg],
    pub dst: VecReg,
    pub aux: &'a [VecReg],
    /// Base register holding the constant-table pointer, if any emitter in
    /// the kernel uses the table.
    pub table_base: Option<Gpr>,
    pub table: &'a ConstantTable,
}

impl EmitCtx<'_> {
    pub fn bin(&mut self, op: BinOp, dst: VecReg, a: VecReg, b: VecReg) {
        self.asm.push(Instr::Bin { op, dst, a, b });
    }

    pub fn un(&mut self, op: UnOp, dst: VecReg, a: VecReg) {
        self.asm.push(Instr::Un { op, dst, a });
    }

    pub fn mov(&mut self, dst: VecReg, src: VecReg) {
        if dst != src {
            self.asm.push(Instr::MovVec { dst, src });
        }
    }

    /// Splats an interned table constant into `dst`. Fails if the pattern
    /// was never interned or no table base was reserved; both are broken
    /// planner contracts, not runtime conditions.
    pub fn broadcast(&mut self, dst: VecReg, pattern: u32) -> CompileResult<()> {
        let offset = self.table.offset_of(pattern).ok_or_else(|| {
            CompileError::Internal(format!(
                "constant pattern {pattern:#010x} was not interned during resource collection"
            ))
        })?;
        let table = self.table_base.ok_or_else(|| {
            CompileError::Internal(
                "kernel uses table constants but no table base was reserved".to_string(),
            )
        })?;
        self.asm.push(Instr::BroadcastConst {
            dst,
            table,
            offset,
        });
        Ok(())
    }

    /// `dst = (a & mask) | (b & !mask)`. Native on wide tiers; on the
    /// baseline tier expands to three logical ops through `scratch`, which
    /// must not alias `a`, `b`, or `mask`.
    pub fn blend(&mut self, dst: VecReg, a: VecReg, b: VecReg, mask: VecReg, scratch: VecReg) {
        if self.isa.has_native_blend() {
            self.asm.push(Instr::Blend { dst, a, b, mask });
        } else {
            self.bin(BinOp::And, scratch, a, mask);
            self.bin(BinOp::AndNot, dst, mask, b);
            self.bin(BinOp::Or, dst, dst, scratch);
        }
    }
}

type EmitterFactory = fn(&OpKind) -> Box<dyn Emitter>;

/// Dispatch table keyed by operator name, built once at first use.
static REGISTRY: Lazy<HashMap<&'static str, EmitterFactory>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, EmitterFactory> = HashMap::new();
    arithmetic::register(&mut map);
    comparison::register(&mut map);
    logical::register(&mut map);
    classify::register(&mut map);
    select::register(&mut map);
    map
});

/// Looks up the emitter for an operator kind.
pub fn emitter_for(kind: &OpKind) -> Option<Box<dyn Emitter>> {
    REGISTRY.get(kind.name()).map(|factory| factory(kind))
}
