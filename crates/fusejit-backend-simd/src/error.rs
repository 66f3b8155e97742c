//! Compilation errors raised while lowering a fused subgraph.

use fusejit::{ElementType, ValidationError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    /// The fused sequence needs more registers than the target tier has.
    /// There is no spill path; the caller falls back to non-fused execution.
    #[error("out of {resource} registers: need {needed}, tier provides {available}")]
    ResourceExhaustion {
        resource: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("operator {op} has no lowering for element type {element}")]
    UnsupportedPrecision { op: &'static str, element: String },

    /// The kernel body reads whole vectors per input; shapes that would
    /// need a strided broadcast cannot be laid out.
    #[error(
        "input {input} with shape {shape} cannot broadcast to result shape {result}: \
         only equal extents and scalar operands have a kernel layout"
    )]
    UnsupportedBroadcast {
        input: usize,
        shape: String,
        result: String,
    },

    #[error("cannot compile an empty fused subgraph")]
    EmptySubgraph,

    /// A broken planner/emitter contract. Never caused by user input.
    #[error("internal compiler error: {0}")]
    Internal(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CompileError {
    pub fn unsupported_precision(op: &'static str, element: ElementType) -> Self {
        CompileError::UnsupportedPrecision {
            op,
            element: element.name().to_string(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
