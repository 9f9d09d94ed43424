//! Score constants and line-pattern counting
//!
//! Terminal scores dominate every heuristic score: the evaluator rejects
//! anything at or beyond `Score::WIN_THRESHOLD` for a non-terminal state.

use crate::board::{GameState, Mark};
use crate::rules::{is_diagonal, WIN_LINES};

/// Score constants shared by the evaluator and the search
pub struct Score;

impl Score {
    /// Meta-board win, before ply adjustment
    pub const WIN: i32 = 1_000_000;
    /// Any score at or beyond this magnitude is a forced result
    pub const WIN_THRESHOLD: i32 = Self::WIN - 1_000;
    /// Alpha-beta window bound
    pub const INF: i32 = Self::WIN + 1;
    pub const DRAW: i32 = 0;
    /// Substituted when an evaluator fails
    pub const NEUTRAL: i32 = 0;
}

/// True when `score` proves a win for the side it is reported for.
#[inline]
pub fn is_forced_win(score: i32) -> bool {
    score >= Score::WIN_THRESHOLD
}

/// True when `score` proves a loss.
#[inline]
pub fn is_forced_loss(score: i32) -> bool {
    score <= -Score::WIN_THRESHOLD
}

/// Score of a terminal state for `perspective`, or `None` if play continues.
///
/// `ply` is the distance from the search root, so shorter wins and longer
/// losses score better.
#[inline]
pub fn terminal_score(state: &GameState, perspective: Mark, ply: u32) -> Option<i32> {
    let ply = ply.min(Score::WIN as u32 - Score::WIN_THRESHOLD as u32 - 1) as i32;
    match state.winner() {
        Some(mark) if mark == perspective => Some(Score::WIN - ply),
        Some(_) => Some(-Score::WIN + ply),
        None if state.is_terminal() => Some(Score::DRAW),
        None => None,
    }
}

/// Two-in-line threats of one side inside a 3x3 grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineThreats {
    /// Lines with two owned cells and an empty third
    pub count: i32,
    /// Same lines, weighted: diagonals count `diagonal_pct` percent
    pub weighted_pct: i32,
}

/// Count lines where `own` holds two cells and the third is not in `blocked`.
#[inline]
pub fn count_threats(own: u16, blocked: u16, diagonal_pct: i32) -> LineThreats {
    let mut threats = LineThreats::default();
    for &line in &WIN_LINES {
        if (own & line).count_ones() == 2 && (blocked & line) == 0 {
            threats.count += 1;
            threats.weighted_pct += if is_diagonal(line) { diagonal_pct } else { 100 };
        }
    }
    threats
}
