//! Evaluation module for Ultimate Tic-Tac-Toe positions
//!
//! This module provides the pluggable [`Evaluator`] contract and the default
//! weighted heuristic. The evaluation considers:
//! - Won local boards and meta-board lines
//! - Cell occupancy and two-in-line threats inside open boards
//! - Redirect consequences of the last move

pub mod heuristic;
pub mod patterns;

pub use heuristic::{Evaluator, HeuristicEvaluator};
pub use patterns::{count_threats, is_forced_loss, is_forced_win, terminal_score, LineThreats, Score};
