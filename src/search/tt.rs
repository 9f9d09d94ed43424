//! Transposition table for caching search results
//!
//! A bounded, lock-free table shared by every search worker. Entries are a
//! best-effort cache: eviction, collisions and torn writes all read back as
//! a miss, never as an error.
//!
//! # Example
//!
//! ```
//! use uttt::search::{AtomicTT, EntryType};
//!
//! let tt = AtomicTT::new(1); // 1 MB
//!
//! // Store a search result
//! let hash = 0x123456789ABCDEF0;
//! tt.store(hash, 5, 100, EntryType::Exact, 0);
//!
//! // A search needing depth 5 or less may use it
//! assert_eq!(tt.probe(hash, 5, -1000, 1000, 0), Some(100));
//! // A deeper requirement ignores it
//! assert_eq!(tt.probe(hash, 6, -1000, 1000, 0), None);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crate::eval::Score;

/// How a stored score relates to the true value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Exact score - the search completed inside its window
    Exact,
    /// Lower bound - score >= stored value (beta cutoff)
    LowerBound,
    /// Upper bound - score <= stored value (failed low)
    UpperBound,
}

/// Table usage statistics
#[derive(Debug, Clone, Copy)]
pub struct TTStats {
    /// Total number of slots
    pub size: usize,
    /// Estimated number of used slots
    pub used: usize,
    /// Usage percentage (0-100)
    pub usage_percent: u8,
}

/// Pack an entry into a u64 for atomic storage.
///
/// Layout (31 bits used):
/// ```text
/// bits [0..7]   depth (u8)                           8 bits
/// bits [8..28]  score (i32 → u21: +1_048_576)        21 bits
/// bits [29..30] entry_type (0=Exact,1=LB,2=UB)        2 bits
/// ```
fn pack_entry(depth: u8, score: i32, entry_type: EntryType) -> u64 {
    let clamped = score.clamp(-1_048_575, 1_048_575);
    let s = (clamped as i64 + 1_048_576) as u64 & 0x1F_FFFF;
    let t = match entry_type {
        EntryType::Exact => 0u64,
        EntryType::LowerBound => 1u64,
        EntryType::UpperBound => 2u64,
    };
    depth as u64 | (s << 8) | (t << 29)
}

/// Unpack a u64 back into entry fields.
fn unpack_entry(data: u64) -> (u8, i32, EntryType) {
    let depth = (data & 0xFF) as u8;
    let score = (((data >> 8) & 0x1F_FFFF) as i64 - 1_048_576) as i32;
    let entry_type = match (data >> 29) & 0x3 {
        0 => EntryType::Exact,
        1 => EntryType::LowerBound,
        _ => EntryType::UpperBound,
    };
    (depth, score, entry_type)
}

/// Forced-result scores are stored relative to the node, not the root,
/// so an entry stays valid when reached from a different root.
#[inline]
fn score_to_tt(score: i32, ply: u32) -> i32 {
    if score >= Score::WIN_THRESHOLD {
        score + ply as i32
    } else if score <= -Score::WIN_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

#[inline]
fn score_from_tt(score: i32, ply: u32) -> i32 {
    if score >= Score::WIN_THRESHOLD {
        score - ply as i32
    } else if score <= -Score::WIN_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

/// Lock-free transposition table.
///
/// Uses the XOR trick (Hyatt 1994): each slot stores `(key, data)` where
/// `key = hash ^ data`. On probe, validity is checked via `key ^ data == hash`.
/// Torn reads (partial writes from concurrent threads) fail the check and
/// are treated as cache misses.
///
/// All methods take `&self`, so the table is shared through an `Arc`.
pub struct AtomicTT {
    keys: Vec<AtomicU64>,
    data: Vec<AtomicU64>,
    size: usize,
}

impl AtomicTT {
    /// Create a new table with the given size in megabytes.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        // Each slot = 2 x AtomicU64 = 16 bytes
        let slot_size = 16usize;
        let size = ((size_mb * 1024 * 1024) / slot_size).max(1024);

        let mut keys = Vec::with_capacity(size);
        let mut data = Vec::with_capacity(size);
        for _ in 0..size {
            keys.push(AtomicU64::new(0));
            data.push(AtomicU64::new(0));
        }

        Self { keys, data, size }
    }

    #[inline]
    fn slot(&self, hash: u64) -> usize {
        (hash % self.size as u64) as usize
    }

    /// Probe for a usable score.
    ///
    /// Returns `Some(score)` only if the entry was searched at least `depth`
    /// plies deep and its bound settles the `(alpha, beta)` window. `ply` is
    /// the current distance from the root.
    #[must_use]
    pub fn probe(&self, hash: u64, depth: u8, alpha: i32, beta: i32, ply: u32) -> Option<i32> {
        let idx = self.slot(hash);
        let key = self.keys[idx].load(Ordering::Relaxed);
        let raw_data = self.data[idx].load(Ordering::Relaxed);

        if key == 0 && raw_data == 0 {
            return None;
        }
        // XOR verification: torn read or other position → miss
        if key ^ raw_data != hash {
            return None;
        }

        let (entry_depth, stored, entry_type) = unpack_entry(raw_data);
        if entry_depth < depth {
            return None;
        }
        let score = score_from_tt(stored, ply);
        match entry_type {
            EntryType::Exact => Some(score),
            EntryType::LowerBound if score >= beta => Some(score),
            EntryType::UpperBound if score <= alpha => Some(score),
            _ => None,
        }
    }

    /// Store a result.
    ///
    /// Depth-preferred replacement: a slot holding another position is only
    /// overwritten by an equal-or-deeper result; the same position is always
    /// refreshed.
    pub fn store(&self, hash: u64, depth: u8, score: i32, entry_type: EntryType, ply: u32) {
        let idx = self.slot(hash);

        let existing_data = self.data[idx].load(Ordering::Relaxed);
        let existing_key = self.keys[idx].load(Ordering::Relaxed);
        if existing_data != 0 || existing_key != 0 {
            let existing_hash = existing_key ^ existing_data;
            if existing_hash != hash {
                let (existing_depth, _, _) = unpack_entry(existing_data);
                if depth < existing_depth {
                    return;
                }
            }
        }

        let packed = pack_entry(depth, score_to_tt(score, ply), entry_type);
        let key = hash ^ packed;
        // Data first, then key: a concurrent reader sees either the old pair
        // or a mismatch.
        self.data[idx].store(packed, Ordering::Relaxed);
        self.keys[idx].store(key, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        for i in 0..self.size {
            self.keys[i].store(0, Ordering::Relaxed);
            self.data[i].store(0, Ordering::Relaxed);
        }
    }

    /// Approximate usage statistics (sampled on large tables).
    #[must_use]
    pub fn stats(&self) -> TTStats {
        let step = if self.size > 65536 { 64 } else { 1 };
        let mut used = 0usize;
        let mut sampled = 0usize;
        let mut i = 0;
        while i < self.size {
            sampled += 1;
            let k = self.keys[i].load(Ordering::Relaxed);
            let d = self.data[i].load(Ordering::Relaxed);
            if k != 0 || d != 0 {
                used += 1;
            }
            i += step;
        }
        let estimated_used = if step > 1 {
            used * self.size / sampled
        } else {
            used
        };
        TTStats {
            size: self.size,
            used: estimated_used,
            usage_percent: (estimated_used as f64 / self.size as f64 * 100.0) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_tt_store_probe_exact() {
        let tt = AtomicTT::new(1);
        let hash = 0x123456789ABCDEF0;
        tt.store(hash, 5, 100, EntryType::Exact, 0);
        assert_eq!(tt.probe(hash, 5, -1000, 1000, 0), Some(100));
        assert_eq!(tt.probe(hash, 3, -1000, 1000, 0), Some(100));
    }

    #[test]
    fn test_tt_depth_requirement() {
        let tt = AtomicTT::new(1);
        let hash = 0x123456789ABCDEF0;
        tt.store(hash, 3, 100, EntryType::Exact, 0);
        // Shallower entries are ignored
        assert_eq!(tt.probe(hash, 5, -1000, 1000, 0), None);
    }

    #[test]
    fn test_tt_bounds() {
        let tt = AtomicTT::new(1);
        let lower = 0x1111_2222_3333_4444;
        let upper = 0x5555_6666_7777_8888;
        tt.store(lower, 5, 200, EntryType::LowerBound, 0);
        tt.store(upper, 5, 50, EntryType::UpperBound, 0);

        assert_eq!(tt.probe(lower, 5, -1000, 150, 0), Some(200));
        assert_eq!(tt.probe(lower, 5, -1000, 300, 0), None);
        assert_eq!(tt.probe(upper, 5, 100, 1000, 0), Some(50));
        assert_eq!(tt.probe(upper, 5, 0, 1000, 0), None);
    }

    #[test]
    fn test_tt_hash_mismatch() {
        let tt = AtomicTT::new(1);
        tt.store(0x123456789ABCDEF0, 5, 100, EntryType::Exact, 0);
        assert_eq!(tt.probe(0x0FEDCBA987654321, 5, -1000, 1000, 0), None);
    }

    #[test]
    fn test_tt_replacement_prefers_depth() {
        let tt = AtomicTT::new(1);
        let size = tt.size as u64;
        let a = 7u64;
        let b = 7u64 + size; // same slot, different position

        tt.store(a, 6, 10, EntryType::Exact, 0);
        tt.store(b, 4, 20, EntryType::Exact, 0);
        assert_eq!(tt.probe(a, 6, -1000, 1000, 0), Some(10));
        assert_eq!(tt.probe(b, 1, -1000, 1000, 0), None);

        tt.store(b, 6, 30, EntryType::Exact, 0);
        assert_eq!(tt.probe(b, 6, -1000, 1000, 0), Some(30));
        assert_eq!(tt.probe(a, 1, -1000, 1000, 0), None);
    }

    #[test]
    fn test_tt_win_scores_relative_to_node() {
        let tt = AtomicTT::new(1);
        let hash = 42;
        // Found at ply 3 as a win 2 plies further on
        let score = Score::WIN - 5;
        tt.store(hash, 4, score, EntryType::Exact, 3);
        // Same node reached at ply 1 from another root: the win is 2 plies closer
        assert_eq!(tt.probe(hash, 4, -Score::INF, Score::INF, 1), Some(Score::WIN - 3));
        assert_eq!(tt.probe(hash, 4, -Score::INF, Score::INF, 3), Some(score));
    }

    #[test]
    fn test_tt_negative_scores_and_clear() {
        let tt = AtomicTT::new(1);
        tt.store(99, 2, -12_345, EntryType::Exact, 0);
        assert_eq!(tt.probe(99, 2, -100_000, 100_000, 0), Some(-12_345));
        tt.clear();
        assert_eq!(tt.probe(99, 2, -100_000, 100_000, 0), None);
        assert_eq!(tt.stats().used, 0);
    }

    #[test]
    fn test_tt_concurrent_access() {
        let tt = Arc::new(AtomicTT::new(1));
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let tt = Arc::clone(&tt);
                std::thread::spawn(move || {
                    for i in 0..10_000u64 {
                        let hash = (i * 4 + t) | 1 << 40;
                        tt.store(hash, 3, (i % 1000) as i32, EntryType::Exact, 0);
                        if let Some(score) = tt.probe(hash, 3, -1000, 1000, 0) {
                            assert_eq!(score, (i % 1000) as i32);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(tt.stats().used > 0);
    }
}
