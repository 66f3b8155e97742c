//! The virtual vector instruction set and its fixed-width encoding.
//!
//! Every instruction encodes to one 8-byte little-endian word:
//! `[opcode, dst, a, b, imm:u32]`. Field use per opcode is documented on
//! [`Instr`]. The execution engine interprets or translates these words;
//! the compiler here only has to produce them deterministically.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INSTRUCTION_BYTES: usize = 8;

/// Vector register index within the tier's register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VecReg(pub u8);

/// General-purpose register index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gpr(pub u8);

/// Two-operand vector ALU operations. Comparisons write an all-ones lane
/// mask on true, all-zeros on false. `AndNot` computes `!a & b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    CmpEq,
    CmpLt,
    CmpLe,
    And,
    AndNot,
    Or,
    Xor,
}

/// One-operand vector operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Sqrt,
    Floor,
    Ceil,
    Trunc,
    Exp,
    Ln,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// `dst = *(base + offset)`, one full vector.
    LoadVec { dst: VecReg, base: Gpr, offset: u32 },
    /// Broadcast the single 32-bit scalar at `*base` into every lane.
    LoadSplat { dst: VecReg, base: Gpr },
    /// `*(base + offset) = src`, one full vector.
    StoreVec { src: VecReg, base: Gpr, offset: u32 },
    /// Broadcast one 32-bit table entry at `table + offset` into all lanes.
    BroadcastConst { dst: VecReg, table: Gpr, offset: u32 },
    MovVec { dst: VecReg, src: VecReg },
    /// Loads the constant-table pointer from the kernel argument block.
    LoadTableBase { dst: Gpr },
    Bin { op: BinOp, dst: VecReg, a: VecReg, b: VecReg },
    Un { op: UnOp, dst: VecReg, a: VecReg },
    /// `dst += a * b`. Only emitted on tiers with native fma.
    Fma { dst: VecReg, a: VecReg, b: VecReg },
    /// `dst = (a & mask) | (b & !mask)`, bitwise per lane. Only emitted on
    /// tiers with native blend.
    Blend { dst: VecReg, a: VecReg, b: VecReg, mask: VecReg },
}

impl BinOp {
    fn code(self) -> u8 {
        match self {
            BinOp::Add => 0x10,
            BinOp::Sub => 0x11,
            BinOp::Mul => 0x12,
            BinOp::Div => 0x13,
            BinOp::Min => 0x14,
            BinOp::Max => 0x15,
            BinOp::CmpEq => 0x20,
            BinOp::CmpLt => 0x21,
            BinOp::CmpLe => 0x22,
            BinOp::And => 0x30,
            BinOp::AndNot => 0x31,
            BinOp::Or => 0x32,
            BinOp::Xor => 0x33,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x10 => BinOp::Add,
            0x11 => BinOp::Sub,
            0x12 => BinOp::Mul,
            0x13 => BinOp::Div,
            0x14 => BinOp::Min,
            0x15 => BinOp::Max,
            0x20 => BinOp::CmpEq,
            0x21 => BinOp::CmpLt,
            0x22 => BinOp::CmpLe,
            0x30 => BinOp::And,
            0x31 => BinOp::AndNot,
            0x32 => BinOp::Or,
            0x33 => BinOp::Xor,
            _ => return None,
        })
    }
}

impl UnOp {
    fn code(self) -> u8 {
        match self {
            UnOp::Sqrt => 0x16,
            UnOp::Floor => 0x17,
            UnOp::Ceil => 0x18,
            UnOp::Trunc => 0x19,
            UnOp::Exp => 0x1A,
            UnOp::Ln => 0x1B,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x16 => UnOp::Sqrt,
            0x17 => UnOp::Floor,
            0x18 => UnOp::Ceil,
            0x19 => UnOp::Trunc,
            0x1A => UnOp::Exp,
            0x1B => UnOp::Ln,
            _ => return None,
        })
    }
}

const OP_LOAD_VEC: u8 = 0x01;
const OP_STORE_VEC: u8 = 0x02;
const OP_BROADCAST_CONST: u8 = 0x03;
const OP_MOV_VEC: u8 = 0x04;
const OP_LOAD_TABLE_BASE: u8 = 0x05;
const OP_LOAD_SPLAT: u8 = 0x06;
const OP_FMA: u8 = 0x2F;
const OP_BLEND: u8 = 0x3F;

/// Appends encoded instructions into a growing code buffer.
#[derive(Debug, Default)]
pub struct Assembler {
    buf: Vec<u8>,
}

impl Assembler {
    pub fn new() -> Self {
        Assembler::default()
    }

    pub fn push(&mut self, instr: Instr) {
        let word = encode(instr);
        self.buf.extend_from_slice(&word);
    }

    pub fn len(&self) -> usize {
        self.buf.len() / INSTRUCTION_BYTES
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

fn encode(instr: Instr) -> [u8; INSTRUCTION_BYTES] {
    let (opcode, dst, a, b, imm) = match instr {
        Instr::LoadVec { dst, base, offset } => (OP_LOAD_VEC, dst.0, base.0, 0, offset),
        Instr::LoadSplat { dst, base } => (OP_LOAD_SPLAT, dst.0, base.0, 0, 0),
        Instr::StoreVec { src, base, offset } => (OP_STORE_VEC, base.0, src.0, 0, offset),
        Instr::BroadcastConst { dst, table, offset } => {
            (OP_BROADCAST_CONST, dst.0, table.0, 0, offset)
        }
        Instr::MovVec { dst, src } => (OP_MOV_VEC, dst.0, src.0, 0, 0),
        Instr::LoadTableBase { dst } => (OP_LOAD_TABLE_BASE, dst.0, 0, 0, 0),
        Instr::Bin { op, dst, a, b } => (op.code(), dst.0, a.0, b.0, 0),
        Instr::Un { op, dst, a } => (op.code(), dst.0, a.0, 0, 0),
        Instr::Fma { dst, a, b } => (OP_FMA, dst.0, a.0, b.0, 0),
        Instr::Blend { dst, a, b, mask } => (OP_BLEND, dst.0, a.0, b.0, mask.0 as u32),
    };
    let mut word = [0u8; INSTRUCTION_BYTES];
    word[0] = opcode;
    word[1] = dst;
    word[2] = a;
    word[3] = b;
    word[4..8].copy_from_slice(&imm.to_le_bytes());
    word
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("code length {0} is not a multiple of the instruction width")]
    TruncatedWord(usize),
    #[error("unknown opcode {0:#04x} at instruction {1}")]
    UnknownOpcode(u8, usize),
}

/// Decodes a code buffer back into instructions, for tests and tooling.
pub fn decode(code: &[u8]) -> Result<Vec<Instr>, DecodeError> {
    if code.len() % INSTRUCTION_BYTES != 0 {
        return Err(DecodeError::TruncatedWord(code.len()));
    }
    let mut out = Vec::with_capacity(code.len() / INSTRUCTION_BYTES);
    for (pos, word) in code.chunks_exact(INSTRUCTION_BYTES).enumerate() {
        let (opcode, dst, a, b) = (word[0], word[1], word[2], word[3]);
        let imm = u32::from_le_bytes([word[4], word[5], word[6], word[7]]);
        let instr = match opcode {
            OP_LOAD_VEC => Instr::LoadVec {
                dst: VecReg(dst),
                base: Gpr(a),
                offset: imm,
            },
            OP_STORE_VEC => Instr::StoreVec {
                src: VecReg(a),
                base: Gpr(dst),
                offset: imm,
            },
            OP_BROADCAST_CONST => Instr::BroadcastConst {
                dst: VecReg(dst),
                table: Gpr(a),
                offset: imm,
            },
            OP_MOV_VEC => Instr::MovVec {
                dst: VecReg(dst),
                src: VecReg(a),
            },
            OP_LOAD_TABLE_BASE => Instr::LoadTableBase { dst: Gpr(dst) },
            OP_LOAD_SPLAT => Instr::LoadSplat {
                dst: VecReg(dst),
                base: Gpr(a),
            },
            OP_FMA => Instr::Fma {
                dst: VecReg(dst),
                a: VecReg(a),
                b: VecReg(b),
            },
            OP_BLEND => Instr::Blend {
                dst: VecReg(dst),
                a: VecReg(a),
                b: VecReg(b),
                mask: VecReg(imm as u8),
            },
            code => {
                if let Some(op) = BinOp::from_code(code) {
                    Instr::Bin {
                        op,
                        dst: VecReg(dst),
                        a: VecReg(a),
                        b: VecReg(b),
                    }
                } else if let Some(op) = UnOp::from_code(code) {
                    Instr::Un {
                        op,
                        dst: VecReg(dst),
                        a: VecReg(a),
                    }
                } else {
                    return Err(DecodeError::UnknownOpcode(code, pos));
                }
            }
        };
        out.push(instr);
    }
    Ok(out)
}
