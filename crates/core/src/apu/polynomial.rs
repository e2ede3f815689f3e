//! Polynomial (LFSR) tables for POKEY noise gating and the RANDOM register.
//!
//! POKEY clocks four free-running polynomial counters at the chip clock. Rather
//! than stepping each shift register every tick, the full sequences are
//! precomputed once and the chip only keeps an index into each table, advanced
//! by however many ticks have elapsed.
//!
//! All tables come from the same recurrence, seeded from 0:
//!
//! ```text
//! x' = ((x << left) + (x >> right) + add) & mask
//! ```
//!
//! With the parameters below each recurrence has period `2^bits - 1`, visiting
//! that many distinct states before returning to the seed.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Parameters of one polynomial recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfsrSpec {
    pub bits: u32,
    pub left: u32,
    pub right: u32,
    pub add: u32,
}

pub const POLY4: LfsrSpec = LfsrSpec {
    bits: 4,
    left: 3,
    right: 1,
    add: 0x00004,
};

pub const POLY5: LfsrSpec = LfsrSpec {
    bits: 5,
    left: 3,
    right: 2,
    add: 0x00008,
};

pub const POLY9: LfsrSpec = LfsrSpec {
    bits: 9,
    left: 7,
    right: 2,
    add: 0x00080,
};

pub const POLY17: LfsrSpec = LfsrSpec {
    bits: 17,
    left: 7,
    right: 10,
    add: 0x18000,
};

impl LfsrSpec {
    /// Sequence length, `2^bits - 1`.
    pub const fn len(&self) -> usize {
        (1usize << self.bits) - 1
    }

    pub const fn mask(&self) -> u32 {
        (1u32 << self.bits) - 1
    }

    /// Next state of the recurrence.
    pub fn next(&self, x: u32) -> u32 {
        ((x << self.left) + (x >> self.right) + self.add) & self.mask()
    }

    /// One full period of states, starting from the zero seed.
    pub fn states(&self) -> impl Iterator<Item = u32> + '_ {
        std::iter::successors(Some(0u32), move |&x| Some(self.next(x))).take(self.len())
    }
}

/// A precomputed polynomial sequence, one byte per step.
#[derive(Debug, Clone)]
pub struct PolyTable {
    values: Vec<u8>,
}

impl PolyTable {
    /// Gating table: bit 0 of each state.
    pub fn build(spec: &LfsrSpec) -> Self {
        Self {
            values: spec.states().map(|x| (x & 1) as u8).collect(),
        }
    }

    /// RANDOM register table: bits 0..7 of the 9-bit sequence, bits 6..13 of
    /// the 17-bit one.
    pub fn build_random(spec: &LfsrSpec) -> Self {
        let shift = if spec.bits == 17 { 6 } else { 0 };
        Self {
            values: spec.states().map(|x| (x >> shift) as u8).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: u32) -> u8 {
        debug_assert!((index as usize) < self.values.len(), "poly index {index} out of range");
        self.values[index as usize]
    }

    pub fn bit(&self, index: u32) -> bool {
        self.get(index) & 1 != 0
    }
}

/// Every table a chip needs. Immutable, so all chips share one copy.
#[derive(Debug)]
pub struct PolyTables {
    pub poly4: PolyTable,
    pub poly5: PolyTable,
    pub poly9: PolyTable,
    pub poly17: PolyTable,
    pub rand9: PolyTable,
    pub rand17: PolyTable,
}

impl PolyTables {
    fn build() -> Self {
        Self {
            poly4: PolyTable::build(&POLY4),
            poly5: PolyTable::build(&POLY5),
            poly9: PolyTable::build(&POLY9),
            poly17: PolyTable::build(&POLY17),
            rand9: PolyTable::build_random(&POLY9),
            rand17: PolyTable::build_random(&POLY17),
        }
    }

    /// Shared tables, built on first use.
    pub fn get() -> &'static PolyTables {
        static TABLES: OnceLock<PolyTables> = OnceLock::new();
        TABLES.get_or_init(Self::build)
    }
}

/// Advance a table index by `ticks`, wrapping at the table length.
pub fn advance_index(index: u32, ticks: u64, spec: &LfsrSpec) -> u32 {
    ((index as u64 + ticks) % spec.len() as u64) as u32
}

/// Free-running table indices shared by all four channels.
///
/// Elapsed ticks accumulate in `pending` and are folded into the indices only
/// when a channel actually samples them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyCounters {
    pub p4: u32,
    pub p5: u32,
    pub p9: u32,
    pub p17: u32,
    pub pending: u64,
}

impl PolyCounters {
    pub fn elapse(&mut self, ticks: u64) {
        self.pending += ticks;
    }

    /// Fold pending ticks into the indices.
    pub fn catch_up(&mut self) {
        if self.pending == 0 {
            return;
        }
        self.p4 = advance_index(self.p4, self.pending, &POLY4);
        self.p5 = advance_index(self.p5, self.pending, &POLY5);
        self.p9 = advance_index(self.p9, self.pending, &POLY9);
        self.p17 = advance_index(self.p17, self.pending, &POLY17);
        self.pending = 0;
    }

    /// STIMER restarts the polynomial phase accounting.
    pub fn clear_pending(&mut self) {
        self.pending = 0;
    }
}
