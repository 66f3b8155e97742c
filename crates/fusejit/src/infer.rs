//! The single shape/type inference entry point.

use crate::broadcast::{self, BroadcastRule};
use crate::element::ElementType;
use crate::error::{ValidationError, ValidationResult};
use crate::op::{OpFamily, OpKind, OperandDescriptor};
use crate::shape::PartialShape;

/// Computes the output descriptor for one operator application, or fails
/// with the offending argument index(es) and cause.
pub fn infer(
    kind: &OpKind,
    inputs: &[OperandDescriptor],
    rule: BroadcastRule,
) -> ValidationResult<OperandDescriptor> {
    let expected = kind.arity();
    if inputs.len() != expected {
        return Err(ValidationError::ArityMismatch {
            op: kind.name(),
            expected,
            actual: inputs.len(),
        });
    }

    match kind.family() {
        OpFamily::Arithmetic => {
            let element = merge_numeric(inputs)?;
            let shape = merge_input_shapes(inputs, rule)?;
            Ok(OperandDescriptor::new(element, shape))
        }
        OpFamily::UnaryArithmetic => {
            let element = require_numeric(0, inputs[0].element)?;
            Ok(OperandDescriptor::new(element, inputs[0].shape.clone()))
        }
        OpFamily::Comparison => {
            merge_numeric(inputs)?;
            let shape = merge_input_shapes(inputs, rule)?;
            Ok(OperandDescriptor::new(ElementType::Boolean, shape))
        }
        OpFamily::Logical => {
            for (idx, input) in inputs.iter().enumerate() {
                require_boolean(idx, input.element)?;
            }
            let shape = merge_input_shapes(inputs, rule)?;
            Ok(OperandDescriptor::new(ElementType::Boolean, shape))
        }
        OpFamily::Classification => {
            let element = inputs[0].element;
            if !element.is_float() && !element.is_dynamic() {
                return Err(ValidationError::element_type_mismatch(
                    0,
                    0,
                    format!(
                        "argument 0 must have a floating-point element type, got {}",
                        element.name()
                    ),
                ));
            }
            Ok(OperandDescriptor::new(
                ElementType::Boolean,
                inputs[0].shape.clone(),
            ))
        }
        OpFamily::Select => {
            require_boolean(0, inputs[0].element)?;
            let element = inputs[1].element.merge(inputs[2].element, 1, 2)?;
            let shape = merge_input_shapes(inputs, rule)?;
            Ok(OperandDescriptor::new(element, shape))
        }
    }
}

fn merge_input_shapes(
    inputs: &[OperandDescriptor],
    rule: BroadcastRule,
) -> ValidationResult<PartialShape> {
    let shapes: Vec<PartialShape> = inputs.iter().map(|i| i.shape.clone()).collect();
    broadcast::merge_shapes(&shapes, rule)
}

/// Folds all input element types into one, rejecting booleans.
fn merge_numeric(inputs: &[OperandDescriptor]) -> ValidationResult<ElementType> {
    let mut element = require_numeric(0, inputs[0].element)?;
    for (idx, input) in inputs.iter().enumerate().skip(1) {
        require_numeric(idx, input.element)?;
        element = element.merge(input.element, idx - 1, idx)?;
    }
    Ok(element)
}

fn require_numeric(idx: usize, element: ElementType) -> ValidationResult<ElementType> {
    if element.is_numeric() || element.is_dynamic() {
        Ok(element)
    } else {
        Err(ValidationError::element_type_mismatch(
            idx,
            idx,
            format!(
                "argument {idx} must have a numeric element type, got {}",
                element.name()
            ),
        ))
    }
}

fn require_boolean(idx: usize, element: ElementType) -> ValidationResult<()> {
    if element == ElementType::Boolean || element.is_dynamic() {
        Ok(())
    } else {
        Err(ValidationError::element_type_mismatch(
            idx,
            idx,
            format!(
                "argument {idx} must have boolean element type, got {}",
                element.name()
            ),
        ))
    }
}
