//! Kernel compilation entry point and the immutable artifact it produces.

use fusejit::{ElementType, FusedSubgraph};
use serde::{Deserialize, Serialize};

use crate::code::Gpr;
use crate::error::CompileResult;
use crate::isa::IsaLevel;
use crate::planner;
use crate::table::TableEntry;

pub const KERNEL_ARTIFACT_VERSION: u32 = 1;

/// A compiled fused kernel: encoded instructions plus the metadata the
/// execution engine needs to invoke it. Immutable once produced.
///
/// The engine binds one buffer pointer per entry in `bindings`, points the
/// table register at `constant_bytes`, and invokes the body once per vector
/// block, advancing the buffer pointers between blocks. Boolean operands
/// use the canonical f32 `0.0` / `1.0` in-memory representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelArtifact {
    pub artifact_version: u32,
    pub isa: IsaLevel,
    /// Encoded instruction words, 8 bytes each.
    pub code: Vec<u8>,
    pub bindings: OperandBindings,
    /// Layout of the resident constant table, slot order.
    pub constant_table: Vec<TableEntry>,
    /// The table contents, ready to be mapped at the table base pointer.
    pub constant_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperandBindings {
    pub inputs: Vec<OperandBinding>,
    pub output: OperandBinding,
}

/// Which pointer register carries a buffer argument, the element type
/// stored there, and how the kernel consumes the buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperandBinding {
    pub pointer: Gpr,
    pub element: ElementType,
    pub layout: OperandLayout,
}

/// How a bound buffer is read per vector block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandLayout {
    /// One full vector of elements per block; the engine advances the
    /// pointer between blocks.
    Vector,
    /// A single scalar splat across all lanes; the pointer never advances.
    ScalarSplat,
}

/// Compiles a validated fused subgraph for one instruction-set tier.
pub fn compile(subgraph: &FusedSubgraph, isa: IsaLevel) -> CompileResult<KernelArtifact> {
    let plan = planner::plan(subgraph, isa)?;
    let inputs = subgraph
        .inputs()
        .iter()
        .zip(plan.input_pointers.iter().zip(&plan.input_layouts))
        .map(|(desc, (&pointer, &layout))| OperandBinding {
            pointer,
            element: desc.element,
            layout,
        })
        .collect();
    let constant_bytes = plan.table.to_bytes();
    Ok(KernelArtifact {
        artifact_version: KERNEL_ARTIFACT_VERSION,
        isa,
        code: plan.code,
        bindings: OperandBindings {
            inputs,
            output: OperandBinding {
                pointer: plan.output_pointer,
                element: plan.output_element,
                layout: OperandLayout::Vector,
            },
        },
        constant_table: plan.table.into_entries(),
        constant_bytes,
    })
}
