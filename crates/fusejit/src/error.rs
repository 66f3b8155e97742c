//! Validation errors raised synchronously during graph construction.

use thiserror::Error;

/// Failure detected while validating or inferring an operator instance.
///
/// Every variant names the offending argument index(es) so callers can point
/// back at the graph node that was built incorrectly. Nothing here is
/// retried; these are programming or model errors surfaced to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("argument shapes are inconsistent: {cause}")]
    ShapeMismatch {
        first: usize,
        second: usize,
        cause: String,
    },

    #[error("{cause}")]
    ElementTypeMismatch {
        first: usize,
        second: usize,
        cause: String,
    },

    #[error("operator {op} expects {expected} inputs, got {actual}")]
    ArityMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("operator {op} argument {arg} references an operand that is not yet defined")]
    UndefinedOperand { op: &'static str, arg: usize },
}

impl ValidationError {
    pub fn shape_mismatch(first: usize, second: usize, cause: impl Into<String>) -> Self {
        ValidationError::ShapeMismatch {
            first,
            second,
            cause: cause.into(),
        }
    }

    pub fn element_type_mismatch(first: usize, second: usize, cause: impl Into<String>) -> Self {
        ValidationError::ElementTypeMismatch {
            first,
            second,
            cause: cause.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
