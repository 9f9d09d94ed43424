//! Bitboard implementation for fast win-line checks

use super::{Move, GRID, TOTAL_CELLS};

/// Mask of all nine cells of one local board
pub const LOCAL_MASK: u16 = 0x1FF;

/// Bitboard over the 81 cells. Bit `board * 9 + cell` is set when occupied,
/// so each local board is a contiguous 9-bit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bitboard {
    bits: u128,
}

impl Bitboard {
    /// Create empty bitboard
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    #[inline]
    pub fn set(&mut self, mv: Move) {
        self.bits |= 1u128 << mv.to_index();
    }

    #[inline]
    pub fn get(&self, mv: Move) -> bool {
        (self.bits >> mv.to_index()) & 1 == 1
    }

    /// 9-bit occupancy mask of one local board
    #[inline]
    pub fn local(&self, board: usize) -> u16 {
        debug_assert!(board < GRID);
        ((self.bits >> (board * GRID)) as u16) & LOCAL_MASK
    }

    /// Count total set bits (popcount)
    #[inline]
    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }

    #[inline]
    pub(crate) fn union(self, other: Bitboard) -> Bitboard {
        Bitboard {
            bits: self.bits | other.bits,
        }
    }

    /// Iterate over occupied cells in index order
    pub fn iter_ones(&self) -> BitboardIter {
        BitboardIter { bits: self.bits }
    }
}

/// Iterator over set bits in a Bitboard
pub struct BitboardIter {
    bits: u128,
}

impl Iterator for BitboardIter {
    type Item = Move;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            return None;
        }
        let idx = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        debug_assert!(idx < TOTAL_CELLS);
        Some(Move::from_index(idx))
    }
}
