//! Ultimate Tic-Tac-Toe AI engine
//!
//! A time-bounded game-tree search engine for Ultimate Tic-Tac-Toe:
//! - Nine 3x3 local boards nested in a 3x3 meta-board
//! - The cell just played picks the local board the opponent must play next
//! - A closed (won or drawn) board sends the opponent anywhere
//! - Three won local boards in a meta-line win the game; drawn boards never
//!   count towards a line
//!
//! # Architecture
//!
//! The engine is organized into several modules:
//! - [`board`]: Game state with bitboards, move notation
//! - [`rules`]: Win-line detection on both board levels
//! - [`eval`]: Pluggable position evaluation
//! - [`search`]: Hashing, transposition table, move ordering, parallel
//!   alpha-beta and pondering
//! - [`engine`]: Engine facade integrating search and pondering
//! - [`agent`]: Game-session bookkeeping at the coordinator boundary
//!
//! # Quick Start
//!
//! ```
//! use uttt::{AIEngine, EngineConfig, GameState, Move};
//!
//! let config = EngineConfig {
//!     time_limit_ms: 200,
//!     max_depth: 4,
//!     ..EngineConfig::default()
//! };
//! let mut engine = AIEngine::with_config(config).unwrap();
//!
//! // X opens in the center of the center board; the AI answers as O
//! let state = GameState::new().apply("E5".parse::<Move>().unwrap()).unwrap();
//! if let Some(mv) = engine.get_move(&state) {
//!     // O is forced into the center board
//!     assert_eq!(mv.board, 4);
//!     println!("AI plays {}", mv);
//! }
//! ```
//!
//! # Search
//!
//! Every move request runs iterative-deepening alpha-beta under a wall-clock
//! deadline:
//! 1. Root moves fan out across a fixed worker pool
//! 2. A depth counts only if every root move finished before the deadline
//! 3. A forced win or an exhausted tree stops deepening early
//! 4. Pondered results for the actual position are resumed, not repeated

pub mod agent;
pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod rules;
pub mod search;

// Re-export commonly used types for convenience
pub use agent::Agent;
pub use board::{GameState, Mark, Move, Outcome, TOTAL_CELLS};
pub use config::{EngineConfig, EvalWeights, FeedCodes, PonderConfig};
pub use engine::{AIEngine, MoveResult, SearchType};
pub use error::{EngineError, Result};
