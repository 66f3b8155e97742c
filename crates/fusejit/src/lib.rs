//! Core model for the fused-kernel compiler.
//!
//! This crate holds everything a backend needs before code generation:
//! scalar element types, partially known shapes with labeled dimensions,
//! broadcast merging, per-operator validation and shape/type inference,
//! and the fused-subgraph structure handed to a kernel backend. All of it
//! is pure, reentrant computation over immutable value types; callers own
//! threading policy.

pub mod broadcast;
pub mod dimension;
pub mod element;
pub mod error;
pub mod infer;
pub mod io;
pub mod op;
pub mod shape;
pub mod subgraph;

pub use broadcast::{merge_shapes, BroadcastRule};
pub use dimension::{DimLabel, Dimension};
pub use element::ElementType;
pub use error::{ValidationError, ValidationResult};
pub use infer::infer;
pub use op::{OpFamily, OpKind, OperandDescriptor, OperatorInstance};
pub use shape::PartialShape;
pub use subgraph::{FusedNode, FusedSubgraph, OperandRef};
