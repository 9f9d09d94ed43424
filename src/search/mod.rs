//! Search module for Ultimate Tic-Tac-Toe
//!
//! Contains:
//! - Zobrist hashing for position identification
//! - Lock-free transposition table shared by all workers
//! - Move ordering with shared killer and history tables
//! - Parallel alpha-beta search with iterative deepening
//! - Background pondering on predicted opponent replies

pub mod alphabeta;
pub mod ordering;
pub mod ponder;
pub mod tt;
pub mod zobrist;

pub use alphabeta::{SearchLimits, SearchResult, Searcher};
pub use ordering::MoveOrderer;
pub use ponder::{Ponderer, PonderingResult};
pub use tt::{AtomicTT, EntryType, TTStats};
pub use zobrist::{ZobristTable, ZOBRIST};
