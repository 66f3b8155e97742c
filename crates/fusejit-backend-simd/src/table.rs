//! The per-kernel constant table: named 32-bit patterns shared by emitters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Bit pattern of f32 `1.0`, the canonical "true" value produced by
/// comparison and logical emitters.
pub const PATTERN_ONE: u32 = 0x3f80_0000;
pub const PATTERN_ZERO: u32 = 0x0000_0000;
pub const PATTERN_SIGN_MASK: u32 = 0x8000_0000;
pub const PATTERN_ABS_MASK: u32 = 0x7fff_ffff;
pub const PATTERN_POS_INF: u32 = 0x7f80_0000;
pub const PATTERN_NEG_INF: u32 = 0xff80_0000;

/// Collects every 32-bit constant the kernel's emitters need resident.
///
/// Entries are deduplicated by bit pattern, so emitters requesting the same
/// value share one slot. Each slot is 4 bytes; `BroadcastConst` splats the
/// slot across all vector lanes at runtime.
#[derive(Debug, Default)]
pub struct ConstantTable {
    entries: Vec<TableEntry>,
    by_pattern: HashMap<u32, usize>,
}

/// One resident constant: its first requester's name, the bit pattern, and
/// the byte offset inside the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    pub pattern: u32,
    pub offset: u32,
}

impl ConstantTable {
    pub fn new() -> Self {
        ConstantTable::default()
    }

    /// Registers a constant, returning its byte offset. A pattern already
    /// present keeps its original slot and name.
    pub fn intern(&mut self, name: &str, pattern: u32) -> u32 {
        if let Some(&index) = self.by_pattern.get(&pattern) {
            return self.entries[index].offset;
        }
        let index = self.entries.len();
        let offset = (index * 4) as u32;
        self.entries.push(TableEntry {
            name: name.to_string(),
            pattern,
            offset,
        });
        self.by_pattern.insert(pattern, index);
        offset
    }

    /// Byte offset of an already-interned pattern.
    pub fn offset_of(&self, pattern: u32) -> Option<u32> {
        self.by_pattern
            .get(&pattern)
            .map(|&index| self.entries[index].offset)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn byte_len(&self) -> usize {
        self.entries.len() * 4
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    /// The table contents as raw little-endian bytes, in slot order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        for entry in &self.entries {
            bytes.extend_from_slice(&entry.pattern.to_le_bytes());
        }
        bytes
    }

    pub fn into_entries(self) -> Vec<TableEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_patterns_share_a_slot() {
        let mut table = ConstantTable::new();
        let a = table.intern("one", PATTERN_ONE);
        let b = table.intern("true_value", PATTERN_ONE);
        let c = table.intern("sign_mask", PATTERN_SIGN_MASK);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].name, "one");
    }

    #[test]
    fn offsets_advance_by_four_bytes() {
        let mut table = ConstantTable::new();
        assert_eq!(table.intern("zero", PATTERN_ZERO), 0);
        assert_eq!(table.intern("one", PATTERN_ONE), 4);
        assert_eq!(table.intern("abs", PATTERN_ABS_MASK), 8);
        assert_eq!(table.byte_len(), 12);
    }

    #[test]
    fn bytes_are_little_endian_slots() {
        let mut table = ConstantTable::new();
        table.intern("one", PATTERN_ONE);
        assert_eq!(table.to_bytes(), vec![0x00, 0x00, 0x80, 0x3f]);
    }
}
