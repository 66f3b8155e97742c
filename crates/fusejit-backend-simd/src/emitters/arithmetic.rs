//! Emitters for arithmetic and transcendental operators.

use std::collections::HashMap;

use fusejit::OpKind;

use crate::code::{BinOp, UnOp};
use crate::error::CompileResult;
use crate::isa::IsaLevel;
use crate::table::{ConstantTable, PATTERN_ABS_MASK, PATTERN_ONE, PATTERN_SIGN_MASK, PATTERN_ZERO};

use super::{EmitCtx, Emitter};

pub(super) fn register(map: &mut HashMap<&'static str, fn(&OpKind) -> Box<dyn Emitter>>) {
    map.insert("add", |_| Box::new(BinaryArith { op: BinOp::Add }));
    map.insert("subtract", |_| Box::new(BinaryArith { op: BinOp::Sub }));
    map.insert("multiply", |_| Box::new(BinaryArith { op: BinOp::Mul }));
    map.insert("divide", |_| Box::new(BinaryArith { op: BinOp::Div }));
    map.insert("maximum", |_| Box::new(BinaryArith { op: BinOp::Max }));
    map.insert("minimum", |_| Box::new(BinaryArith { op: BinOp::Min }));
    map.insert("squared_difference", |_| Box::new(SquaredDifference));
    map.insert("mul_add", |_| Box::new(MulAdd));
    map.insert("floor_mod", |_| Box::new(Remainder { floor: true }));
    map.insert("mod", |_| Box::new(Remainder { floor: false }));
    map.insert("power", |_| Box::new(PowerDynamic));
    map.insert("power_static", |kind| match *kind {
        OpKind::PowerStatic {
            power,
            scale,
            shift,
        } => Box::new(PowerStatic {
            power,
            scale,
            shift,
        }),
        // The registry is keyed by name, so this arm is unreachable.
        _ => Box::new(PowerStatic {
            power: 1.0,
            scale: 1.0,
            shift: 0.0,
        }),
    });
    map.insert("floor", |_| Box::new(Unary { op: UnOp::Floor }));
    map.insert("ceiling", |_| Box::new(Unary { op: UnOp::Ceil }));
    map.insert("sqrt", |_| Box::new(Unary { op: UnOp::Sqrt }));
    map.insert("negative", |_| Box::new(Negative));
    map.insert("erf", |_| Box::new(Erf));
    map.insert("soft_sign", |_| Box::new(SoftSign));
    map.insert("prelu", |_| Box::new(Prelu));
}

/// Single-instruction binary arithmetic: no scratch, no constants.
struct BinaryArith {
    op: BinOp,
}

impl Emitter for BinaryArith {
    fn inputs_len(&self) -> usize {
        2
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        0
    }

    fn register_table_entries(&self, _table: &mut ConstantTable) {}

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let (a, b) = (ctx.inputs[0], ctx.inputs[1]);
        ctx.bin(self.op, ctx.dst, a, b);
        Ok(())
    }
}

struct SquaredDifference;

impl Emitter for SquaredDifference {
    fn inputs_len(&self) -> usize {
        2
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        0
    }

    fn register_table_entries(&self, _table: &mut ConstantTable) {}

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let (a, b) = (ctx.inputs[0], ctx.inputs[1]);
        let dst = ctx.dst;
        ctx.bin(BinOp::Sub, dst, a, b);
        ctx.bin(BinOp::Mul, dst, dst, dst);
        Ok(())
    }
}

/// Fused `a * b + c`. The wide tiers use the native fma; the baseline tier
/// stages the product through scratch.
struct MulAdd;

impl Emitter for MulAdd {
    fn inputs_len(&self) -> usize {
        3
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        1
    }

    fn register_table_entries(&self, _table: &mut ConstantTable) {}

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let (a, b, c) = (ctx.inputs[0], ctx.inputs[1], ctx.inputs[2]);
        let (dst, t) = (ctx.dst, ctx.aux[0]);
        if ctx.isa.has_native_fma() {
            ctx.mov(t, c);
            ctx.asm.push(crate::code::Instr::Fma { dst: t, a, b });
            ctx.mov(dst, t);
        } else {
            ctx.bin(BinOp::Mul, t, a, b);
            ctx.bin(BinOp::Add, dst, t, c);
        }
        Ok(())
    }
}

/// `a - round(a / b) * b`, rounding toward negative infinity (`floor_mod`)
/// or toward zero (`mod`).
struct Remainder {
    floor: bool,
}

impl Emitter for Remainder {
    fn inputs_len(&self) -> usize {
        2
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        1
    }

    fn register_table_entries(&self, _table: &mut ConstantTable) {}

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let (a, b) = (ctx.inputs[0], ctx.inputs[1]);
        let (dst, t) = (ctx.dst, ctx.aux[0]);
        ctx.bin(BinOp::Div, t, a, b);
        let round = if self.floor { UnOp::Floor } else { UnOp::Trunc };
        ctx.un(round, t, t);
        ctx.bin(BinOp::Mul, t, t, b);
        ctx.bin(BinOp::Sub, dst, a, t);
        Ok(())
    }
}

/// `a ^ b` via `exp(b * ln(a))`.
struct PowerDynamic;

impl Emitter for PowerDynamic {
    fn inputs_len(&self) -> usize {
        2
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        1
    }

    fn register_table_entries(&self, _table: &mut ConstantTable) {}

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let (a, b) = (ctx.inputs[0], ctx.inputs[1]);
        let (dst, t) = (ctx.dst, ctx.aux[0]);
        ctx.un(UnOp::Ln, t, a);
        ctx.bin(BinOp::Mul, t, t, b);
        ctx.un(UnOp::Exp, dst, t);
        Ok(())
    }
}

/// `(scale * x + shift) ^ power` with attributes baked into the constant
/// table. Power values 1, 2 and 0.5 skip the exp/ln path.
struct PowerStatic {
    power: f32,
    scale: f32,
    shift: f32,
}

impl PowerStatic {
    fn has_affine(&self) -> bool {
        self.scale != 1.0 || self.shift != 0.0
    }
}

impl Emitter for PowerStatic {
    fn inputs_len(&self) -> usize {
        1
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        1
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        if self.has_affine() {
            table.intern("power_scale", self.scale.to_bits());
            table.intern("power_shift", self.shift.to_bits());
        }
        if self.power != 1.0 && self.power != 2.0 && self.power != 0.5 {
            table.intern("power_exponent", self.power.to_bits());
        }
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let x = ctx.inputs[0];
        let (dst, t) = (ctx.dst, ctx.aux[0]);
        // t = scale * x + shift, or just x when the affine part is trivial.
        if self.has_affine() {
            ctx.broadcast(t, self.scale.to_bits())?;
            ctx.bin(BinOp::Mul, t, t, x);
            ctx.broadcast(dst, self.shift.to_bits())?;
            ctx.bin(BinOp::Add, t, t, dst);
        } else {
            ctx.mov(t, x);
        }
        match self.power {
            p if p == 1.0 => ctx.mov(dst, t),
            p if p == 2.0 => ctx.bin(BinOp::Mul, dst, t, t),
            p if p == 0.5 => ctx.un(UnOp::Sqrt, dst, t),
            _ => {
                ctx.un(UnOp::Ln, t, t);
                ctx.broadcast(dst, self.power.to_bits())?;
                ctx.bin(BinOp::Mul, t, t, dst);
                ctx.un(UnOp::Exp, dst, t);
            }
        }
        Ok(())
    }
}

/// Single-instruction unary arithmetic.
struct Unary {
    op: UnOp,
}

impl Emitter for Unary {
    fn inputs_len(&self) -> usize {
        1
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        0
    }

    fn register_table_entries(&self, _table: &mut ConstantTable) {}

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let a = ctx.inputs[0];
        ctx.un(self.op, ctx.dst, a);
        Ok(())
    }
}

/// Negation by flipping the sign bit.
struct Negative;

impl Emitter for Negative {
    fn inputs_len(&self) -> usize {
        1
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        1
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        table.intern("sign_mask", PATTERN_SIGN_MASK);
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let x = ctx.inputs[0];
        let (dst, t) = (ctx.dst, ctx.aux[0]);
        ctx.broadcast(t, PATTERN_SIGN_MASK)?;
        ctx.bin(BinOp::Xor, dst, x, t);
        Ok(())
    }
}

// Abramowitz & Stegun 7.1.26 coefficients.
const ERF_P: f32 = 0.327_591_1;
const ERF_A1: f32 = 0.254_829_592;
const ERF_A2: f32 = -0.284_496_736;
const ERF_A3: f32 = 1.421_413_741;
const ERF_A4: f32 = -1.453_152_027;
const ERF_A5: f32 = 1.061_405_429;

/// Gauss error function via the A&S rational polynomial over `|x|`, with
/// the sign of `x` restored at the end.
struct Erf;

impl Emitter for Erf {
    fn inputs_len(&self) -> usize {
        1
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        4
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        table.intern("abs_mask", PATTERN_ABS_MASK);
        table.intern("sign_mask", PATTERN_SIGN_MASK);
        table.intern("one", PATTERN_ONE);
        table.intern("erf_p", ERF_P.to_bits());
        table.intern("erf_a1", ERF_A1.to_bits());
        table.intern("erf_a2", ERF_A2.to_bits());
        table.intern("erf_a3", ERF_A3.to_bits());
        table.intern("erf_a4", ERF_A4.to_bits());
        table.intern("erf_a5", ERF_A5.to_bits());
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let x = ctx.inputs[0];
        let dst = ctx.dst;
        let (ax, t, poly, tmp) = (ctx.aux[0], ctx.aux[1], ctx.aux[2], ctx.aux[3]);

        // ax = |x|
        ctx.broadcast(ax, PATTERN_ABS_MASK)?;
        ctx.bin(BinOp::And, ax, x, ax);
        // t = 1 / (1 + p * |x|)
        ctx.broadcast(t, ERF_P.to_bits())?;
        ctx.bin(BinOp::Mul, t, t, ax);
        ctx.broadcast(tmp, PATTERN_ONE)?;
        ctx.bin(BinOp::Add, t, t, tmp);
        ctx.bin(BinOp::Div, t, tmp, t);
        // poly = ((((a5 t + a4) t + a3) t + a2) t + a1) t
        ctx.broadcast(poly, ERF_A5.to_bits())?;
        for coeff in [ERF_A4, ERF_A3, ERF_A2, ERF_A1] {
            ctx.bin(BinOp::Mul, poly, poly, t);
            ctx.broadcast(tmp, coeff.to_bits())?;
            ctx.bin(BinOp::Add, poly, poly, tmp);
        }
        ctx.bin(BinOp::Mul, poly, poly, t);
        // tmp = exp(-x^2)
        ctx.bin(BinOp::Mul, tmp, x, x);
        ctx.broadcast(ax, PATTERN_SIGN_MASK)?;
        ctx.bin(BinOp::Xor, tmp, tmp, ax);
        ctx.un(UnOp::Exp, tmp, tmp);
        // poly = 1 - poly * exp(-x^2)
        ctx.bin(BinOp::Mul, poly, poly, tmp);
        ctx.broadcast(tmp, PATTERN_ONE)?;
        ctx.bin(BinOp::Sub, poly, tmp, poly);
        // restore the sign of x
        ctx.bin(BinOp::And, ax, x, ax);
        ctx.bin(BinOp::Or, dst, poly, ax);
        Ok(())
    }
}

/// `x / (1 + |x|)`.
struct SoftSign;

impl Emitter for SoftSign {
    fn inputs_len(&self) -> usize {
        1
    }

    fn aux_vecs(&self, _isa: IsaLevel) -> usize {
        2
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        table.intern("abs_mask", PATTERN_ABS_MASK);
        table.intern("one", PATTERN_ONE);
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let x = ctx.inputs[0];
        let dst = ctx.dst;
        let (ax, one) = (ctx.aux[0], ctx.aux[1]);
        ctx.broadcast(ax, PATTERN_ABS_MASK)?;
        ctx.bin(BinOp::And, ax, x, ax);
        ctx.broadcast(one, PATTERN_ONE)?;
        ctx.bin(BinOp::Add, ax, ax, one);
        ctx.bin(BinOp::Div, dst, x, ax);
        Ok(())
    }
}

/// `x >= 0 ? x : slope * x`, slope given per element by the second input.
struct Prelu;

impl Emitter for Prelu {
    fn inputs_len(&self) -> usize {
        2
    }

    fn aux_vecs(&self, isa: IsaLevel) -> usize {
        if isa.has_native_blend() {
            2
        } else {
            3
        }
    }

    fn register_table_entries(&self, table: &mut ConstantTable) {
        table.intern("zero", PATTERN_ZERO);
    }

    fn emit(&self, ctx: &mut EmitCtx<'_>) -> CompileResult<()> {
        let (x, slope) = (ctx.inputs[0], ctx.inputs[1]);
        let dst = ctx.dst;
        let (mask, prod) = (ctx.aux[0], ctx.aux[1]);
        let scratch = if ctx.isa.has_native_blend() {
            prod
        } else {
            ctx.aux[2]
        };
        // mask lanes where x < 0
        ctx.broadcast(mask, PATTERN_ZERO)?;
        ctx.bin(BinOp::CmpLt, mask, x, mask);
        ctx.bin(BinOp::Mul, prod, x, slope);
        ctx.blend(dst, prod, x, mask, scratch);
        Ok(())
    }
}
