//! Engine configuration
//!
//! Every tunable lives here, heuristic weights included, so alternative
//! evaluators are configuration data rather than separate code paths.
//! Configurations load from JSON; missing fields take their defaults.
//!
//! ```
//! use uttt::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "time_limit_ms": 500, "ponder": { "candidates": 2 } }"#).unwrap();
//! assert_eq!(config.time_limit_ms, 500);
//! assert_eq!(config.ponder.candidates, 2);
//! assert_eq!(config.max_depth, 15);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock budget per move
    pub time_limit_ms: u64,
    /// First iterative-deepening depth
    pub start_depth: u8,
    /// Iterative-deepening cap
    pub max_depth: u8,
    /// Transposition table size in megabytes
    pub tt_size_mb: usize,
    /// Worker pool size, 0 = hardware concurrency
    pub threads: usize,
    pub ponder: PonderConfig,
    pub feed: FeedCodes,
    pub weights: EvalWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 2800,
            start_depth: 4,
            max_depth: 15,
            tt_size_mb: 32,
            threads: 0,
            ponder: PonderConfig::default(),
            feed: FeedCodes::default(),
            weights: EvalWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_limit_ms == 0 {
            return Err(EngineError::InvalidConfig("time_limit_ms must be positive".into()));
        }
        if self.start_depth == 0 || self.start_depth > self.max_depth {
            return Err(EngineError::InvalidConfig(format!(
                "start_depth {} must be in 1..={}",
                self.start_depth, self.max_depth
            )));
        }
        if self.ponder.max_depth == 0 {
            return Err(EngineError::InvalidConfig("ponder.max_depth must be positive".into()));
        }
        if self.feed.x == 0 || self.feed.o == 0 || self.feed.x == self.feed.o {
            return Err(EngineError::InvalidConfig(
                "feed codes must be distinct and nonzero".into(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    /// Worker count, resolving 0 to the available hardware concurrency.
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

/// Background search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PonderConfig {
    pub enabled: bool,
    /// Number of predicted opponent replies searched in the background
    pub candidates: usize,
    /// Depth cap for background searches
    pub max_depth: u8,
    /// How long a foreground request waits for ponder work to wind down
    pub grace_ms: u64,
}

impl Default for PonderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            candidates: 3,
            max_depth: 7,
            grace_ms: 100,
        }
    }
}

impl PonderConfig {
    #[inline]
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// Integer codes used by the initialization feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedCodes {
    pub x: i32,
    pub o: i32,
}

impl Default for FeedCodes {
    fn default() -> Self {
        Self { x: 4, o: 2 }
    }
}

/// Heuristic weights for `HeuristicEvaluator`.
///
/// 3x3 tables are flattened row-major (index = board or cell number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    /// Value of owning a local board, scaled by `meta_weights`
    pub local_win: i32,
    /// Meta-position weights: center > corner > edge
    pub meta_weights: [i32; 9],
    /// Intra-board cell weights
    pub cell_weights: [i32; 9],
    /// Multiplier for own cells
    pub own_cell: i32,
    /// Multiplier for opponent cells
    pub opponent_cell: i32,
    /// Two-in-line with an empty third inside a local board
    pub local_two_attack: i32,
    pub local_two_defense: i32,
    /// Two won boards in line with the third still open
    pub meta_two_attack: i32,
    pub meta_two_defense: i32,
    /// One won board with the other two of its line open
    pub meta_one_attack: i32,
    pub meta_one_defense: i32,
    /// Diagonal line multipliers in percent
    pub local_diagonal_pct: i32,
    pub meta_diagonal_pct: i32,
    /// Sending the opponent into a board they can win at once
    pub redirect_winnable: i32,
    /// Sending the opponent to a closed board (free choice)
    pub redirect_any: i32,
    /// Sending the opponent into a board the mover dominates
    pub redirect_favoured: i32,
    /// Bonus per extra threat once a side has two or more in one board
    pub fork_bonus: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            local_win: 500,
            meta_weights: [3, 2, 3, 2, 4, 2, 3, 2, 3],
            cell_weights: [3, 1, 3, 1, 5, 1, 3, 1, 3],
            own_cell: 3,
            opponent_cell: 4,
            local_two_attack: 100,
            local_two_defense: 150,
            meta_two_attack: 1000,
            meta_two_defense: 1200,
            meta_one_attack: 75,
            meta_one_defense: 100,
            local_diagonal_pct: 120,
            meta_diagonal_pct: 150,
            redirect_winnable: 150,
            redirect_any: 60,
            redirect_favoured: 40,
            fork_bonus: 50,
        }
    }
}
