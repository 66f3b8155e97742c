//! SIMD JIT backend for the fused-kernel compiler.
//!
//! Takes a validated [`fusejit::FusedSubgraph`] plus a target
//! [`IsaLevel`] and lowers it into a [`KernelArtifact`]: a buffer of fixed
//! width vector instructions, operand-to-register bindings, and the
//! deduplicated constant table the kernel expects resident. Compilation is
//! pure and synchronous; distinct subgraphs may be compiled from parallel
//! threads since the emitter registry is built read-only on first use.

pub mod code;
pub mod emitters;
pub mod error;
pub mod isa;
pub mod kernel;
mod planner;
pub mod table;

pub use code::{decode, Assembler, BinOp, Gpr, Instr, UnOp, VecReg};
pub use emitters::{emitter_for, EmitCtx, Emitter};
pub use error::{CompileError, CompileResult};
pub use isa::IsaLevel;
pub use kernel::{
    compile, KernelArtifact, OperandBinding, OperandBindings, OperandLayout,
    KERNEL_ARTIFACT_VERSION,
};
pub use table::{ConstantTable, TableEntry};
