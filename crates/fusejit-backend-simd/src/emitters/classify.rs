//! Emitters for floating-point classification operators.

use std::collections::HashMap;

use fusejit::OpKind;

use crate::code::BinOp;
use crate::error::CompileResult;
use crate::isa::IsaLevel;
use crate::table::{
    ConstantTable, PATTERN_ABS_MASK, PATTERN_NEG_INF, PATTERN_ONE, PATTERN_POS_INF, PATTERN_ZERO,
};

use super::{EmitCtx, Emitter};

pub(super) fn register(map: &mut HashMap<&'static str, fn(&OpKind) -> Box<dyn Emitter>>) {
    map.insert("is_finite", |_| Box::new(IsFinite));
    map.insert("is_nan", |_| Box::new(IsNan));
    map.insert("is_inf", |kind| match *kind {
        OpKind::IsInf {
            detect_negative,
            detect_positive,
        } => Box::new(IsInf {
            detect_negative,
            detect_positive,
        }),
        // The registry is keyed by name, so this arm is unreachable.
        _ => Box::new(IsInf {
            detect_negative: true,
            detect_positive: true,
        }),
    });
}

/// `|x| < inf`. NaN compares false against everything, so it is correctly
/// classified as non-finite.
struct IsFinite;

impl Emitter for IsFinite {
    fn inputs_len(&self) -> usize {
        1
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        2
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        table.intern("abs_mask", PATTERN_ABS_MASK);
        table.intern("pos_inf", PATTERN_POS_INF);
        table.intern("one", PATTERN_ONE);
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let x = ctx.inputs[0];
        let dst = ctx.dst;
        let (mask, t) = (ctx.aux[0], ctx.aux[1]);
        ctx.broadcast(mask, PATTERN_ABS_MASK)?;
        ctx.bin(BinOp::And, mask, x, mask);
        ctx.broadcast(t, PATTERN_POS_INF)?;
        ctx.bin(BinOp::CmpLt, mask, mask, t);
        ctx.broadcast(t, PATTERN_ONE)?;
        ctx.bin(BinOp::And, dst, mask, t);
        Ok(())
    }
}

/// Infinity detection with selectable signs, matching the operator's
/// `detect_negative` / `detect_positive` attributes.
struct IsInf {
    detect_negative: bool,
    detect_positive: bool,
}

impl Emitter for IsInf {
    fn inputs_len(&self) -> usize {
        1
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        2
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        match (self.detect_negative, self.detect_positive) {
            (true, true) => {
                table.intern("abs_mask", PATTERN_ABS_MASK);
                table.intern("pos_inf", PATTERN_POS_INF);
                table.intern("one", PATTERN_ONE);
            }
            (false, true) => {
                table.intern("pos_inf", PATTERN_POS_INF);
                table.intern("one", PATTERN_ONE);
            }
            (true, false) => {
                table.intern("neg_inf", PATTERN_NEG_INF);
                table.intern("one", PATTERN_ONE);
            }
            (false, false) => {
                table.intern("zero", PATTERN_ZERO);
            }
        }
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let x = ctx.inputs[0];
        let dst = ctx.dst;
        let (mask, t) = (ctx.aux[0], ctx.aux[1]);
        match (self.detect_negative, self.detect_positive) {
            (false, false) => {
                // Nothing to detect: the result is constant false.
                ctx.broadcast(dst, PATTERN_ZERO)?;
                return Ok(());
            }
            (true, true) => {
                ctx.broadcast(mask, PATTERN_ABS_MASK)?;
                ctx.bin(BinOp::And, mask, x, mask);
                ctx.broadcast(t, PATTERN_POS_INF)?;
                ctx.bin(BinOp::CmpEq, mask, mask, t);
            }
            (false, true) => {
                ctx.broadcast(t, PATTERN_POS_INF)?;
                ctx.bin(BinOp::CmpEq, mask, x, t);
            }
            (true, false) => {
                ctx.broadcast(t, PATTERN_NEG_INF)?;
                ctx.bin(BinOp::CmpEq, mask, x, t);
            }
        }
        ctx.broadcast(t, PATTERN_ONE)?;
        ctx.bin(BinOp::And, dst, mask, t);
        Ok(())
    }
}

/// `x != x` is the defining property of NaN.
struct IsNan;

impl Emitter for IsNan {
    fn inputs_len(&self) -> usize {
        1
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        2
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        table.intern("one", PATTERN_ONE);
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let x = ctx.inputs[0];
        let dst = ctx.dst;
        let (mask, one) = (ctx.aux[0], ctx.aux[1]);
        ctx.bin(BinOp::CmpEq, mask, x, x);
        ctx.broadcast(one, PATTERN_ONE)?;
        ctx.bin(BinOp::AndNot, dst, mask, one);
        Ok(())
    }
}
