//! Primitive operator kinds and the operator-instance graph node.

use serde::{Deserialize, Serialize};

use crate::broadcast::BroadcastRule;
use crate::element::ElementType;
use crate::error::ValidationResult;
use crate::infer;
use crate::shape::PartialShape;

/// Element type plus shape for one operand edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperandDescriptor {
    pub element: ElementType,
    pub shape: PartialShape,
}

impl OperandDescriptor {
    pub fn new(element: ElementType, shape: PartialShape) -> Self {
        OperandDescriptor { element, shape }
    }
}

/// Every primitive operator the kernel compiler can lower.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OpKind {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorMod,
    Mod,
    Maximum,
    Minimum,
    SquaredDifference,
    Power,
    /// `(scale * x + shift) ^ power` with attributes fixed at graph build.
    PowerStatic {
        power: f32,
        scale: f32,
        shift: f32,
    },
    /// Fused `a * b + c`.
    MulAdd,
    Prelu,
    // Unary arithmetic
    Floor,
    Ceiling,
    Negative,
    Sqrt,
    Erf,
    SoftSign,
    // Comparison (output is boolean-typed)
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    // Logical (boolean in, boolean out)
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    LogicalNot,
    // Floating-point classification (float in, boolean out)
    IsFinite,
    IsInf {
        detect_negative: bool,
        detect_positive: bool,
    },
    IsNan,
    // Conditional select: (condition, then, else)
    Select,
}

/// Validation family sharing arity and element-type rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpFamily {
    Arithmetic,
    UnaryArithmetic,
    Comparison,
    Logical,
    Classification,
    Select,
}

impl OpKind {
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Subtract => "subtract",
            OpKind::Multiply => "multiply",
            OpKind::Divide => "divide",
            OpKind::FloorMod => "floor_mod",
            OpKind::Mod => "mod",
            OpKind::Maximum => "maximum",
            OpKind::Minimum => "minimum",
            OpKind::SquaredDifference => "squared_difference",
            OpKind::Power => "power",
            OpKind::PowerStatic { .. } => "power_static",
            OpKind::MulAdd => "mul_add",
            OpKind::Prelu => "prelu",
            OpKind::Floor => "floor",
            OpKind::Ceiling => "ceiling",
            OpKind::Negative => "negative",
            OpKind::Sqrt => "sqrt",
            OpKind::Erf => "erf",
            OpKind::SoftSign => "soft_sign",
            OpKind::Equal => "equal",
            OpKind::NotEqual => "not_equal",
            OpKind::Greater => "greater",
            OpKind::GreaterEqual => "greater_equal",
            OpKind::Less => "less",
            OpKind::LessEqual => "less_equal",
            OpKind::LogicalAnd => "logical_and",
            OpKind::LogicalOr => "logical_or",
            OpKind::LogicalXor => "logical_xor",
            OpKind::LogicalNot => "logical_not",
            OpKind::IsFinite => "is_finite",
            OpKind::IsInf { .. } => "is_inf",
            OpKind::IsNan => "is_nan",
            OpKind::Select => "select",
        }
    }

    pub fn family(&self) -> OpFamily {
        match self {
            OpKind::Add
            | OpKind::Subtract
            | OpKind::Multiply
            | OpKind::Divide
            | OpKind::FloorMod
            | OpKind::Mod
            | OpKind::Maximum
            | OpKind::Minimum
            | OpKind::SquaredDifference
            | OpKind::Power
            | OpKind::MulAdd
            | OpKind::Prelu => OpFamily::Arithmetic,
            OpKind::PowerStatic { .. }
            | OpKind::Floor
            | OpKind::Ceiling
            | OpKind::Negative
            | OpKind::Sqrt
            | OpKind::Erf
            | OpKind::SoftSign => OpFamily::UnaryArithmetic,
            OpKind::Equal
            | OpKind::NotEqual
            | OpKind::Greater
            | OpKind::GreaterEqual
            | OpKind::Less
            | OpKind::LessEqual => OpFamily::Comparison,
            OpKind::LogicalAnd | OpKind::LogicalOr | OpKind::LogicalXor | OpKind::LogicalNot => {
                OpFamily::Logical
            }
            OpKind::IsFinite | OpKind::IsInf { .. } | OpKind::IsNan => OpFamily::Classification,
            OpKind::Select => OpFamily::Select,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            OpKind::PowerStatic { .. }
            | OpKind::Floor
            | OpKind::Ceiling
            | OpKind::Negative
            | OpKind::Sqrt
            | OpKind::Erf
            | OpKind::SoftSign
            | OpKind::LogicalNot
            | OpKind::IsFinite
            | OpKind::IsInf { .. }
            | OpKind::IsNan => 1,
            OpKind::MulAdd | OpKind::Select => 3,
            _ => 2,
        }
    }
}

/// A graph node: operator kind, per-input descriptors, broadcast policy,
/// and the inferred output descriptor once validation has run.
///
/// The output descriptor only ever moves from dynamic toward more specific
/// within an inference pass; re-running inference after inputs were refined
/// refines the output accordingly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorInstance {
    kind: OpKind,
    broadcast: BroadcastRule,
    inputs: Vec<OperandDescriptor>,
    output: Option<OperandDescriptor>,
}

impl OperatorInstance {
    pub fn new(kind: OpKind, broadcast: BroadcastRule, inputs: Vec<OperandDescriptor>) -> Self {
        OperatorInstance {
            kind,
            broadcast,
            inputs,
            output: None,
        }
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn broadcast(&self) -> BroadcastRule {
        self.broadcast
    }

    pub fn inputs(&self) -> &[OperandDescriptor] {
        &self.inputs
    }

    /// The inferred output, if `validate_and_infer` has succeeded.
    pub fn output(&self) -> Option<&OperandDescriptor> {
        self.output.as_ref()
    }

    /// Runs the operator's validation and shape/type inference, storing and
    /// returning the output descriptor. Fails synchronously on any arity,
    /// element-type, or shape inconsistency.
    pub fn validate_and_infer(&mut self) -> ValidationResult<&OperandDescriptor> {
        let out = infer::infer(&self.kind, &self.inputs, self.broadcast)?;
        Ok(self.output.insert(out))
    }
}
