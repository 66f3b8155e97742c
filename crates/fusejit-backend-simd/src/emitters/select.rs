//! Emitter for the three-input conditional select.

use std::collections::HashMap;

use fusejit::{ElementType, OpKind};

use crate::code::BinOp;
use crate::error::CompileResult;
use crate::isa::IsaLevel;
use crate::table::{ConstantTable, PATTERN_ONE};

use super::{EmitCtx, Emitter};

pub(super) fn register(map: &mut HashMap<&'static str, fn(&OpKind) -> Box<dyn Emitter>>) {
    map.insert("select", |_| Box::new(Select));
}

/// `cond ? then : else`. The canonical boolean condition is widened to an
/// all-ones lane mask, then blended; the blend is native on wide tiers and
/// emulated on the baseline tier.
struct Select;

impl Emitter for Select {
    fn inputs_len(&self) -> usize {
        3
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        2
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        table.intern("one", PATTERN_ONE);
    }

    fn supported_precisions(&self) -> &'static [ElementType] {
        &[ElementType::Boolean, ElementType::F32]
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let (cond, then_v, else_v) = (ctx.inputs[0], ctx.inputs[1], ctx.inputs[2]);
        let dst = ctx.dst;
        let (scratch, mask) = (ctx.aux[0], ctx.aux[1]);
        ctx.broadcast(scratch, PATTERN_ONE)?;
        ctx.bin(BinOp::CmpEq, mask, cond, scratch);
        ctx.blend(dst, then_v, else_v, mask, scratch);
        Ok(())
    }
}
