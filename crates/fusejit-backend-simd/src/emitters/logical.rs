//! Emitters for boolean logical operators.
//!
//! Inputs are already in the canonical `0.0` / `1.0` representation (the
//! core validates that logical operands are boolean-typed), so conjunction
//! and friends reduce to bitwise ops on identical bit patterns.

use std::collections::HashMap;

use fusejit::{ElementType, OpKind};

use crate::code::BinOp;
use crate::error::CompileResult;
use crate::isa::IsaLevel;
use crate::table::{ConstantTable, PATTERN_ONE};

use super::{EmitCtx, Emitter};

pub(super) fn register(map: &mut HashMap<&'static str, fn(&OpKind) -> Box<dyn Emitter>>) {
    map.insert("logical_and", |_| Box::new(LogicalBinary { op: BinOp::And }));
    map.insert("logical_or", |_| Box::new(LogicalBinary { op: BinOp::Or }));
    map.insert("logical_xor", |_| Box::new(LogicalBinary { op: BinOp::Xor }));
    map.insert("logical_not", |_| Box::new(LogicalNot));
}

struct LogicalBinary {
    op: BinOp,
}

impl Emitter for LogicalBinary {
    fn inputs_len(&self) -> usize {
        2
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        0
    }

    fn register_table_entries(&self, _table: &mut ConstantTable) {}

    fn supported_precisions(&self) -> &'static [ElementType] {
        &[ElementType::Boolean]
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let (a, b) = (ctx.inputs[0], ctx.inputs[1]);
        ctx.bin(self.op, ctx.dst, a, b);
        Ok(())
    }
}

/// `!x` as `x xor 1.0` over canonical boolean values.
struct LogicalNot;

impl Emitter for LogicalNot {
    fn inputs_len(&self) -> usize {
        1
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        1
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        table.intern("one", PATTERN_ONE);
    }

    fn supported_precisions(&self) -> &'static [ElementType] {
        &[ElementType::Boolean]
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let x = ctx.inputs[0];
        let (dst, one) = (ctx.dst, ctx.aux[0]);
        ctx.broadcast(one, PATTERN_ONE)?;
        ctx.bin(BinOp::Xor, dst, x, one);
        Ok(())
    }
}
