//! Heuristic evaluation of Ultimate Tic-Tac-Toe positions
//!
//! The score is a weighted sum of:
//! - Local-board ownership, weighted by meta-position (center > corner > edge)
//! - Cell occupancy inside open boards, weighted by intra-board position
//! - Two-in-line threats on both levels, defense weighted above attack
//! - The consequence of the last redirect (where the opponent was sent)
//!
//! All weights come from [`EvalWeights`].

use crate::board::{GameState, Mark, GRID, TOTAL_CELLS};
use crate::config::EvalWeights;
use crate::error::{EngineError, Result};
use crate::rules::{closed_mask, completing_cells, is_diagonal, owned_mask, WIN_LINES};

use super::patterns::{count_threats, Score};

/// Pluggable position evaluator.
///
/// Implementations must be pure and cheap: the search calls them at every
/// depth-exhausted node from several worker threads at once. A returned
/// error makes the search fall back to [`Score::NEUTRAL`] for that node.
pub trait Evaluator: Send + Sync {
    /// Score `state` from `perspective`'s point of view. Positive is good for
    /// `perspective`.
    fn evaluate(&self, state: &GameState, perspective: Mark) -> Result<i32>;
}

/// Weighted-sum evaluator driven by [`EvalWeights`].
#[derive(Debug, Clone, Default)]
pub struct HeuristicEvaluator {
    weights: EvalWeights,
}

impl HeuristicEvaluator {
    pub fn new(weights: EvalWeights) -> Self {
        Self { weights }
    }

    /// Ownership of closed boards plus material and threats inside open ones.
    fn local_boards(&self, state: &GameState, me: Mark) -> i64 {
        let w = &self.weights;
        let opp = me.opponent();
        let mut total = 0i64;

        for b in 0..GRID {
            let board_weight = w.meta_weights[b] as i64;
            let outcome = state.outcome(b);
            if let Some(owner) = outcome.owner() {
                let sign = if owner == me { 1 } else { -1 };
                total += sign * (w.local_win as i64) * board_weight;
                continue;
            }
            if !outcome.is_open() {
                continue;
            }

            let mine = state.local_mask(b, me);
            let theirs = state.local_mask(b, opp);
            total += self.local_score(mine, theirs) * board_weight;
        }
        total
    }

    /// Score of one open local board for the owner of `mine`.
    fn local_score(&self, mine: u16, theirs: u16) -> i64 {
        let w = &self.weights;
        let mut score = 0i64;

        for c in 0..GRID {
            let bit = 1u16 << c;
            let cell_weight = w.cell_weights[c] as i64;
            if mine & bit != 0 {
                score += cell_weight * w.own_cell as i64;
            } else if theirs & bit != 0 {
                score -= cell_weight * w.opponent_cell as i64;
            }
        }

        let attack = count_threats(mine, theirs, w.local_diagonal_pct);
        let defense = count_threats(theirs, mine, w.local_diagonal_pct);
        score += (w.local_two_attack as i64) * (attack.weighted_pct as i64) / 100;
        score -= (w.local_two_defense as i64) * (defense.weighted_pct as i64) / 100;

        if attack.count >= 2 {
            score += (w.fork_bonus as i64) * (attack.count as i64);
        }
        if defense.count >= 2 {
            score -= (w.fork_bonus as i64) * (defense.count as i64);
        }
        score
    }

    /// Lines of won boards on the meta-board that can still be completed.
    fn meta_lines(&self, state: &GameState, me: Mark) -> i64 {
        let w = &self.weights;
        let outcomes = state.outcomes();
        let mine = owned_mask(outcomes, me);
        let theirs = owned_mask(outcomes, me.opponent());
        let open = !closed_mask(outcomes);
        let mut total = 0i64;

        for &line in &WIN_LINES {
            let pct = (if is_diagonal(line) { w.meta_diagonal_pct } else { 100 }) as i64;
            let m = (mine & line).count_ones();
            let t = (theirs & line).count_ones();
            let o = (open & line).count_ones();
            if t == 0 {
                match (m, o) {
                    (2, 1) => total += w.meta_two_attack as i64 * pct / 100,
                    (1, 2) => total += w.meta_one_attack as i64 * pct / 100,
                    _ => {}
                }
            }
            if m == 0 {
                match (t, o) {
                    (2, 1) => total -= w.meta_two_defense as i64 * pct / 100,
                    (1, 2) => total -= w.meta_one_defense as i64 * pct / 100,
                    _ => {}
                }
            }
        }
        total
    }

    /// Where the last move sent the side to move, from the mover's view.
    ///
    /// Penalizes sending the opponent into a board they can win at once or
    /// to a free choice; rewards sending them into a board the mover leads.
    /// A fed or built position has no last move and no redirect term.
    fn redirect(&self, state: &GameState, me: Mark) -> i64 {
        let w = &self.weights;
        if state.last_move().is_none() {
            return 0;
        }
        let victim = state.side_to_move();
        let mover = victim.opponent();

        let term = match state.active_board() {
            None => -(w.redirect_any as i64),
            Some(b) => {
                let occupied = state.occupied_local(b);
                let victim_mask = state.local_mask(b, victim);
                let mover_mask = state.local_mask(b, mover);
                if completing_cells(victim_mask, occupied) != 0 {
                    -(w.redirect_winnable as i64) * w.meta_weights[b] as i64
                } else if self.local_score(mover_mask, victim_mask) > 0 {
                    w.redirect_favoured as i64
                } else {
                    0
                }
            }
        };
        if mover == me {
            term
        } else {
            -term
        }
    }
}

impl Evaluator for HeuristicEvaluator {
    fn evaluate(&self, state: &GameState, perspective: Mark) -> Result<i32> {
        if state.is_terminal() {
            let filled = TOTAL_CELLS as i32 - state.empty_count() as i32;
            return Ok(match state.winner() {
                Some(mark) if mark == perspective => Score::WIN - filled,
                Some(_) => -Score::WIN + filled,
                None => Score::DRAW,
            });
        }

        let total = self.local_boards(state, perspective)
            + self.meta_lines(state, perspective)
            + self.redirect(state, perspective);

        match i32::try_from(total) {
            Ok(score) if score.abs() < Score::WIN_THRESHOLD => Ok(score),
            _ => Err(EngineError::Evaluator {
                reason: format!("heuristic score {} outside the non-terminal range", total),
            }),
        }
    }
}
