//! Main AI Engine integrating search and pondering
//!
//! The engine owns one [`Searcher`] (worker pool, transposition table and
//! ordering tables) and one [`Ponderer`] sharing it. Every move request:
//!
//! 1. **Stop pondering**: cancel background work, waiting a short grace period
//! 2. **Ponder lookup**: reuse the cached result for the actual position
//! 3. **Search**: iterative deepening until the deadline, resuming past a hit
//! 4. **Validate**: the chosen move is checked against the rules before return
//!
//! # Example
//!
//! ```
//! use uttt::{AIEngine, EngineConfig, GameState};
//!
//! let config = EngineConfig {
//!     time_limit_ms: 200,
//!     max_depth: 4,
//!     ..EngineConfig::default()
//! };
//! let mut engine = AIEngine::with_config(config).unwrap();
//! let state = GameState::new();
//!
//! let result = engine.get_move_with_stats(&state).unwrap();
//! println!("Best move: {}", result.best_move);
//! println!("Search type: {:?}", result.search_type);
//! println!("Time: {}ms", result.time_ms);
//! ```

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::board::{GameState, Move};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::search::{PonderingResult, Ponderer, SearchLimits, SearchResult, Searcher, TTStats};

/// How the returned move was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// Regular iterative-deepening search
    Searched,
    /// Search resumed from a pondered result for this exact position
    PonderHit,
    /// No depth completed in time; first ordered legal move
    Fallback,
}

/// Result of a move search with detailed statistics.
#[derive(Debug, Clone)]
pub struct MoveResult {
    /// The move to play
    pub best_move: Move,
    /// Every move tied for the best score
    pub best_moves: Vec<Move>,
    /// Score from the mover's perspective
    pub score: i32,
    /// Deepest completed depth
    pub depth: u8,
    pub search_type: SearchType,
    /// Time taken in milliseconds
    pub time_ms: u64,
    /// Number of nodes searched
    pub nodes: u64,
}

impl MoveResult {
    #[inline]
    fn from_search(result: SearchResult, best_move: Move, search_type: SearchType, time_ms: u64) -> Self {
        Self {
            best_move,
            best_moves: result.best_moves,
            score: result.score,
            depth: result.depth,
            search_type,
            time_ms,
            nodes: result.nodes,
        }
    }
}

/// Main AI Engine for Ultimate Tic-Tac-Toe.
///
/// # Configuration
///
/// Everything comes from [`EngineConfig`]:
/// - Time limit per move
/// - Start and maximum search depth
/// - Transposition table size and worker count
/// - Pondering and evaluation weights
pub struct AIEngine {
    config: EngineConfig,
    searcher: Searcher,
    ponderer: Ponderer,
}

impl AIEngine {
    /// Create an engine with the default configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use uttt::AIEngine;
    ///
    /// let engine = AIEngine::new().unwrap();
    /// assert_eq!(engine.config().time_limit_ms, 2800);
    /// ```
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with a custom configuration. The configuration is
    /// validated first.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let searcher = Searcher::new(&config)?;
        let ponderer = Ponderer::new(searcher.clone(), &config);
        Ok(Self {
            config,
            searcher,
            ponderer,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the best move for the side to move, or `None` if the position
    /// has no legal move.
    pub fn get_move(&mut self, state: &GameState) -> Option<Move> {
        self.get_move_with_stats(state).ok().map(|r| r.best_move)
    }

    /// Get the best move with detailed search statistics.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoLegalMoves`] when the position is terminal.
    pub fn get_move_with_stats(&mut self, state: &GameState) -> Result<MoveResult> {
        self.get_move_excluding(state, &[])
    }

    /// Like [`get_move_with_stats`](Self::get_move_with_stats), but never
    /// returns one of `excluded` (moves the caller already had rejected).
    pub fn get_move_excluding(&mut self, state: &GameState, excluded: &[Move]) -> Result<MoveResult> {
        let start = Instant::now();
        self.ponderer.stop();
        let hit: Option<PonderingResult> = self.ponderer.take(state);

        let candidates: Vec<Move> = state
            .legal_moves()
            .into_iter()
            .filter(|mv| !excluded.contains(mv))
            .collect();
        let Some(&first_legal) = candidates.first() else {
            return Err(EngineError::NoLegalMoves);
        };

        let limits = SearchLimits::new(self.config.start_depth, self.config.max_depth)
            .with_deadline(start + self.config.time_limit())
            .excluding(excluded);
        let seed = hit.as_ref().map(|h| &h.result);
        let result = self.searcher.search_from(state, &limits, seed, |_| {});

        let search_type = if result.depth == 0 {
            SearchType::Fallback
        } else if hit.is_some() {
            SearchType::PonderHit
        } else {
            SearchType::Searched
        };

        let best_move = match result.best_move() {
            Some(mv) if candidates.contains(&mv) => mv,
            other => {
                warn!(?other, fallback = %first_legal, "search returned no usable move");
                first_legal
            }
        };

        let time_ms = start.elapsed().as_millis() as u64;
        info!(
            mv = %best_move,
            score = result.score,
            depth = result.depth,
            search_type = ?search_type,
            nodes = result.nodes,
            time_ms,
            "move chosen"
        );
        Ok(MoveResult::from_search(result, best_move, search_type, time_ms))
    }

    /// Ponder the opponent's likely replies to `state` until the next
    /// move request.
    pub fn start_pondering(&mut self, state: &GameState) {
        self.ponderer.start(state);
    }

    /// Stop pondering, waiting at most the configured grace period.
    pub fn stop_pondering(&mut self) {
        self.ponderer.stop();
    }

    pub fn is_pondering(&self) -> bool {
        self.ponderer.is_running()
    }

    /// Forget everything learned in the current game.
    pub fn new_game(&mut self) {
        self.ponderer.stop();
        self.ponderer.take(&GameState::new());
        self.searcher.clear_tt();
        self.searcher.clear_history();
    }

    /// Transposition table statistics.
    pub fn tt_stats(&self) -> TTStats {
        self.searcher.tt_stats()
    }

    /// Wait up to `timeout` for pondering to finish on its own.
    pub fn wait_pondering(&mut self, timeout: Duration) -> bool {
        self.ponderer.wait(timeout)
    }
}
