//! Emitters for comparison operators.
//!
//! Comparisons produce the canonical boolean representation: f32 `1.0`
//! (bit pattern `0x3f800000`) for true and `0.0` for false, derived from
//! the hardware's all-ones lane mask.

use std::collections::HashMap;

use fusejit::OpKind;

use crate::code::BinOp;
use crate::error::CompileResult;
use crate::isa::IsaLevel;
use crate::table::{ConstantTable, PATTERN_ONE};

use super::{EmitCtx, Emitter};

pub(super) fn register(map: &mut HashMap<&'static str, fn(&OpKind) -> Box<dyn Emitter>>) {
    map.insert("equal", |_| Box::new(Comparison::new(BinOp::CmpEq, false, false)));
    map.insert("not_equal", |_| Box::new(Comparison::new(BinOp::CmpEq, false, true)));
    map.insert("less", |_| Box::new(Comparison::new(BinOp::CmpLt, false, false)));
    map.insert("less_equal", |_| Box::new(Comparison::new(BinOp::CmpLe, false, false)));
    map.insert("greater", |_| Box::new(Comparison::new(BinOp::CmpLt, true, false)));
    map.insert("greater_equal", |_| Box::new(Comparison::new(BinOp::CmpLe, true, false)));
}

/// One comparison lowered onto the three native compare instructions:
/// `greater`/`greater_equal` swap operands, `not_equal` inverts the mask.
struct Comparison {
    cmp: BinOp,
    swap: bool,
    invert: bool,
}

impl Comparison {
    fn new(cmp: BinOp, swap: bool, invert: bool) -> Self {
        Comparison { cmp, swap, invert }
    }
}

impl Emitter for Comparison {
    fn inputs_len(&self) -> usize {
        2
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        2
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        table.intern("one", PATTERN_ONE);
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let (mut a, mut b) = (ctx.inputs[0], ctx.inputs[1]);
        if self.swap {
            std::mem::swap(&mut a, &mut b);
        }
        let dst = ctx.dst;
        let (mask, one) = (ctx.aux[0], ctx.aux[1]);
        ctx.bin(self.cmp, mask, a, b);
        ctx.broadcast(one, PATTERN_ONE)?;
        if self.invert {
            ctx.bin(BinOp::AndNot, dst, mask, one);
        } else {
            ctx.bin(BinOp::And, dst, mask, one);
        }
        Ok(())
    }
}
