//! Fused subgraphs: the validated operator sequences handed to a backend.

use serde::{Deserialize, Serialize};

use crate::broadcast::BroadcastRule;
use crate::error::{ValidationError, ValidationResult};
use crate::infer;
use crate::op::{OpKind, OperandDescriptor};

/// Where an operator argument comes from: an external subgraph input or the
/// output of an earlier node in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandRef {
    Input(usize),
    Node(usize),
}

/// One operator application inside a fused chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedNode {
    pub kind: OpKind,
    pub broadcast: BroadcastRule,
    pub args: Vec<OperandRef>,
    /// Output descriptor, inferred when the node was appended.
    pub output: OperandDescriptor,
}

/// An ordered operator sequence forming a DAG over external inputs and
/// earlier node outputs. Nodes are validated and type-inferred as they are
/// appended, so a constructed subgraph is always internally consistent.
///
/// The subgraph is exclusively owned by the compilation unit that lowers it;
/// nothing here is shared or mutated after construction finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedSubgraph {
    inputs: Vec<OperandDescriptor>,
    nodes: Vec<FusedNode>,
}

impl FusedSubgraph {
    pub fn new(inputs: Vec<OperandDescriptor>) -> Self {
        FusedSubgraph {
            inputs,
            nodes: Vec::new(),
        }
    }

    pub fn inputs(&self) -> &[OperandDescriptor] {
        &self.inputs
    }

    pub fn nodes(&self) -> &[FusedNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Descriptor of any operand reference; fails if the reference points at
    /// an input or node that does not exist.
    pub fn descriptor(&self, r: OperandRef) -> Option<&OperandDescriptor> {
        match r {
            OperandRef::Input(i) => self.inputs.get(i),
            OperandRef::Node(i) => self.nodes.get(i).map(|n| &n.output),
        }
    }

    /// Descriptor of the subgraph result: the last node's output.
    pub fn result(&self) -> Option<&OperandDescriptor> {
        self.nodes.last().map(|n| &n.output)
    }

    /// Appends an operator, checking that every argument references an
    /// already-defined operand and running shape/type inference for it.
    /// Returns a reference to the new node's output.
    pub fn push(
        &mut self,
        kind: OpKind,
        broadcast: BroadcastRule,
        args: Vec<OperandRef>,
    ) -> ValidationResult<OperandRef> {
        let mut arg_descs = Vec::with_capacity(args.len());
        for (pos, &arg) in args.iter().enumerate() {
            let defined = match arg {
                OperandRef::Input(i) => i < self.inputs.len(),
                // Only earlier nodes may be referenced, keeping the
                // sequence a valid topological order.
                OperandRef::Node(i) => i < self.nodes.len(),
            };
            if !defined {
                return Err(ValidationError::UndefinedOperand {
                    op: kind.name(),
                    arg: pos,
                });
            }
            if let Some(desc) = self.descriptor(arg) {
                arg_descs.push(desc.clone());
            }
        }
        let output = infer::infer(&kind, &arg_descs, broadcast)?;
        let index = self.nodes.len();
        self.nodes.push(FusedNode {
            kind,
            broadcast,
            args,
            output,
        });
        Ok(OperandRef::Node(index))
    }
}
