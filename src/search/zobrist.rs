//! Zobrist hashing for position identification
//!
//! One process-wide table, built once from a fixed seed and read-only
//! afterwards. Incremental updates on move application match full
//! recomputation.
//!
//! # Example
//!
//! ```
//! use uttt::board::{GameState, Move};
//! use uttt::search::ZOBRIST;
//!
//! let state = GameState::new();
//! let hash1 = ZOBRIST.hash(&state);
//!
//! let mv = Move::new(4, 4);
//! let next = state.apply(mv).unwrap();
//!
//! // Incremental update is equivalent to full recomputation
//! assert_eq!(ZOBRIST.update_move(hash1, &state, &next, mv), ZOBRIST.hash(&next));
//! ```

use once_cell::sync::Lazy;

use crate::board::{GameState, Mark, Move, GRID, TOTAL_CELLS};

/// Process-wide Zobrist keys.
pub static ZOBRIST: Lazy<ZobristTable> = Lazy::new(ZobristTable::new);

/// Zobrist hash table for position hashing.
///
/// XOR of one key per occupied (cell, mark), one key for the forced board
/// (nine boards plus `Any`), and a constant when X is to move.
pub struct ZobristTable {
    /// Keys per cell: [mark][cell]
    cells: [[u64; TOTAL_CELLS]; 2],
    /// Keys for the active-board selector; index 9 is `Any`
    active: [u64; GRID + 1],
    /// XORed when X is to move
    x_to_move: u64,
    /// Folded in by searches scoring for a given mark
    perspective: [u64; 2],
}

impl ZobristTable {
    /// Build the table with a fixed-seed LCG, so hashes are reproducible
    /// across runs.
    #[must_use]
    pub fn new() -> Self {
        // Constants from Knuth's MMIX LCG
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next_rand = || {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            // Mix the high bits down; plain LCG low bits are weak
            let mut z = seed;
            z = (z ^ (z >> 31)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z ^ (z >> 29)
        };

        let mut cells = [[0u64; TOTAL_CELLS]; 2];
        for i in 0..TOTAL_CELLS {
            cells[0][i] = next_rand();
            cells[1][i] = next_rand();
        }
        let mut active = [0u64; GRID + 1];
        for key in active.iter_mut() {
            *key = next_rand();
        }
        let x_to_move = next_rand();
        let perspective = [next_rand(), next_rand()];

        Self {
            cells,
            active,
            x_to_move,
            perspective,
        }
    }

    /// Compute the full hash of a state.
    #[must_use]
    pub fn hash(&self, state: &GameState) -> u64 {
        let mut h = 0u64;
        for mark in [Mark::X, Mark::O] {
            for mv in state.marks(mark).iter_ones() {
                h ^= self.cells[mark.index()][mv.to_index()];
            }
        }
        h ^= self.active_key(state.active_board());
        if state.side_to_move() == Mark::X {
            h ^= self.x_to_move;
        }
        h
    }

    /// Incrementally update `hash` of `parent` to the hash of `child`, where
    /// `child` is `parent` with `mv` applied.
    #[inline]
    #[must_use]
    pub fn update_move(&self, hash: u64, parent: &GameState, child: &GameState, mv: Move) -> u64 {
        let mover = parent.side_to_move();
        hash ^ self.cells[mover.index()][mv.to_index()]
            ^ self.active_key(parent.active_board())
            ^ self.active_key(child.active_board())
            ^ self.x_to_move
    }

    /// Key separating entries scored for different perspectives.
    #[inline]
    #[must_use]
    pub fn perspective_key(&self, mark: Mark) -> u64 {
        self.perspective[mark.index()]
    }

    #[inline]
    fn active_key(&self, active: Option<usize>) -> u64 {
        self.active[active.unwrap_or(GRID)]
    }
}

impl Default for ZobristTable {
    fn default() -> Self {
        Self::new()
    }
}
