//! Move ordering heuristics
//!
//! Ordering only changes how much the search prunes, never the value it
//! returns. Priority, highest first:
//!
//! 1. Moves completing a meta win-line
//! 2. Moves taking the cell the opponent needs to complete one
//! 3. Moves winning a local board
//! 4. Moves on strategic local boards (center, then corners)
//! 5. Moves on strategic cells (center, then corners)
//! 6. Killer moves recorded for this ply
//! 7. History weight (cell + mark)
//!
//! Remaining ties are broken by a small random jitter.
//!
//! Killer and history tables are plain atomics shared by every worker and
//! kept across searches. Concurrent updates may lose an increment or
//! interleave killer slots; the tables stay usable either way.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use rand::Rng;

use crate::board::{GameState, Mark, Move, TOTAL_CELLS};
use crate::rules::{closed_mask, completing_cells, owned_mask};

/// Deepest ply with its own killer slots
pub const MAX_PLY: usize = TOTAL_CELLS + 1;

/// Killer moves remembered per ply
pub const KILLER_SLOTS: usize = 2;

/// Exclusive upper bound of the tie-break jitter
const JITTER: u8 = 4;

const NO_MOVE: u8 = u8::MAX;

/// Sort key, compared lexicographically (higher first)
type Priority = (bool, bool, bool, u8, u8, u8, u32, u8);

/// Rank of a position in a 3x3 grid: center 2, corners 1, edges 0
#[inline]
fn strategic_rank(index: u8) -> u8 {
    match index {
        4 => 2,
        0 | 2 | 6 | 8 => 1,
        _ => 0,
    }
}

/// Shared move-ordering state.
pub struct MoveOrderer {
    /// Killer moves per ply, most recent first (`NO_MOVE` = empty)
    killers: Vec<[AtomicU8; KILLER_SLOTS]>,
    /// History weight per [mark][cell]
    history: [Vec<AtomicU32>; 2],
}

impl MoveOrderer {
    pub fn new() -> Self {
        Self {
            killers: (0..MAX_PLY)
                .map(|_| std::array::from_fn(|_| AtomicU8::new(NO_MOVE)))
                .collect(),
            history: [
                (0..TOTAL_CELLS).map(|_| AtomicU32::new(0)).collect(),
                (0..TOTAL_CELLS).map(|_| AtomicU32::new(0)).collect(),
            ],
        }
    }

    /// Reorder `moves` in place, best first. The set of moves is unchanged.
    pub fn sort_moves(&self, moves: &mut [Move], state: &GameState, side: Mark, ply: usize) {
        if moves.len() < 2 {
            return;
        }
        let opp = side.opponent();
        let outcomes = state.outcomes();
        let closed = closed_mask(outcomes);
        let my_meta = completing_cells(owned_mask(outcomes, side), closed);
        let opp_meta = completing_cells(owned_mask(outcomes, opp), closed);
        let killers = self.killers(ply);
        let mut rng = rand::thread_rng();

        moves.sort_by_cached_key(|&mv| {
            let board = mv.board as usize;
            let cell_bit = 1u16 << mv.cell;
            let occupied = state.occupied_local(board);
            let wins_local =
                completing_cells(state.local_mask(board, side), occupied) & cell_bit != 0;
            let opp_wins_local =
                completing_cells(state.local_mask(board, opp), occupied) & cell_bit != 0;
            let board_bit = 1u16 << board;

            let killer_rank = killers
                .iter()
                .position(|&k| k == Some(mv))
                .map_or(0, |slot| (KILLER_SLOTS - slot) as u8);

            let key: Priority = (
                wins_local && my_meta & board_bit != 0,
                opp_wins_local && opp_meta & board_bit != 0,
                wins_local,
                strategic_rank(mv.board),
                strategic_rank(mv.cell),
                killer_rank,
                self.history_score(mv, side),
                rng.gen_range(0..JITTER),
            );
            Reverse(key)
        });
    }

    /// Record a move that caused a cutoff at `ply` after searching `depth`.
    pub fn record_cutoff(&self, mv: Move, side: Mark, ply: usize, depth: u8) {
        if let Some(slots) = self.killers.get(ply) {
            let encoded = mv.to_index() as u8;
            let first = slots[0].load(Ordering::Relaxed);
            if first != encoded {
                for i in (1..KILLER_SLOTS).rev() {
                    let prev = slots[i - 1].load(Ordering::Relaxed);
                    slots[i].store(prev, Ordering::Relaxed);
                }
                slots[0].store(encoded, Ordering::Relaxed);
            }
        }
        self.history[side.index()][mv.to_index()].fetch_add(depth as u32, Ordering::Relaxed);
    }

    /// Killer moves for `ply`, most recent first.
    pub fn killers(&self, ply: usize) -> [Option<Move>; KILLER_SLOTS] {
        let mut out = [None; KILLER_SLOTS];
        if let Some(slots) = self.killers.get(ply) {
            for (dst, slot) in out.iter_mut().zip(slots.iter()) {
                let raw = slot.load(Ordering::Relaxed);
                if (raw as usize) < TOTAL_CELLS {
                    *dst = Some(Move::from_index(raw as usize));
                }
            }
        }
        out
    }

    #[inline]
    pub fn history_score(&self, mv: Move, side: Mark) -> u32 {
        self.history[side.index()][mv.to_index()].load(Ordering::Relaxed)
    }

    /// Forget all killers and history (new game).
    pub fn clear(&self) {
        for slots in &self.killers {
            for slot in slots {
                slot.store(NO_MOVE, Ordering::Relaxed);
            }
        }
        for table in &self.history {
            for entry in table {
                entry.store(0, Ordering::Relaxed);
            }
        }
    }
}

impl Default for MoveOrderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_winning_move_first() {
        // X owns boards 0 and 4; in board 8, cell 2 wins the board and the game
        let mut cells = [[Mark::Empty; 9]; 9];
        cells[0] = [Mark::X, Mark::X, Mark::X, Mark::O, Mark::O, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty];
        cells[4] = [Mark::X, Mark::X, Mark::X, Mark::O, Mark::O, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty];
        cells[8] = [Mark::X, Mark::X, Mark::Empty, Mark::O, Mark::O, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty];
        cells[5][0] = Mark::O;
        cells[5][1] = Mark::O;
        let state = GameState::from_cells(&cells).with_active_board(Some(8));

        let orderer = MoveOrderer::new();
        let mut moves = state.legal_moves();
        orderer.sort_moves(&mut moves, &state, Mark::X, 0);
        assert_eq!(moves[0], Move::new(8, 2));
    }

    #[test]
    fn test_block_before_local_win() {
        // O threatens the game through board 8 cell 5; X can win board 6 elsewhere
        let mut cells = [[Mark::Empty; 9]; 9];
        cells[2] = [Mark::O, Mark::O, Mark::O, Mark::X, Mark::X, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty];
        cells[5] = [Mark::O, Mark::O, Mark::O, Mark::X, Mark::X, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty];
        cells[8] = [Mark::Empty, Mark::Empty, Mark::O, Mark::X, Mark::Empty, Mark::O, Mark::Empty, Mark::Empty, Mark::Empty];
        cells[6] = [Mark::X, Mark::X, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty];
        let state = GameState::from_cells(&cells).with_side_to_move(Mark::X);

        let orderer = MoveOrderer::new();
        let mut moves = state.legal_moves();
        orderer.sort_moves(&mut moves, &state, Mark::X, 0);
        // Cell 8 of board 8 completes O's column 2-5-8
        assert_eq!(moves[0], Move::new(8, 8));
        assert_eq!(moves[1], Move::new(6, 2));
    }

    #[test]
    fn test_strategic_boards_then_cells() {
        let state = GameState::new();
        let orderer = MoveOrderer::new();
        let mut moves = state.legal_moves();
        orderer.sort_moves(&mut moves, &state, Mark::X, 0);
        assert_eq!(moves[0], Move::new(4, 4));
        // Next come the corners of the center board
        for mv in &moves[1..5] {
            assert_eq!(mv.board, 4);
            assert!([0, 2, 6, 8].contains(&mv.cell));
        }
    }

    #[test]
    fn test_killers_most_recent_first() {
        let orderer = MoveOrderer::new();
        let a = Move::new(1, 1);
        let b = Move::new(3, 5);
        let c = Move::new(7, 7);
        orderer.record_cutoff(a, Mark::X, 2, 3);
        orderer.record_cutoff(b, Mark::X, 2, 3);
        assert_eq!(orderer.killers(2), [Some(b), Some(a)]);
        // Re-recording the newest does not duplicate it
        orderer.record_cutoff(b, Mark::X, 2, 3);
        assert_eq!(orderer.killers(2), [Some(b), Some(a)]);
        orderer.record_cutoff(c, Mark::X, 2, 3);
        assert_eq!(orderer.killers(2), [Some(c), Some(b)]);
        assert_eq!(orderer.killers(3), [None, None]);
    }

    #[test]
    fn test_history_credits_depth() {
        let orderer = MoveOrderer::new();
        let mv = Move::new(2, 2);
        orderer.record_cutoff(mv, Mark::O, 1, 4);
        orderer.record_cutoff(mv, Mark::O, 5, 2);
        assert_eq!(orderer.history_score(mv, Mark::O), 6);
        assert_eq!(orderer.history_score(mv, Mark::X), 0);
        orderer.clear();
        assert_eq!(orderer.history_score(mv, Mark::O), 0);
        assert_eq!(orderer.killers(1), [None, None]);
    }

    #[test]
    fn test_killer_outranks_history() {
        // Edge cells of an edge board: no strategic difference between them
        let state = GameState::new().apply(Move::new(4, 1)).unwrap();
        assert_eq!(state.active_board(), Some(1));
        let orderer = MoveOrderer::new();
        let killer = Move::new(1, 3);
        let hist = Move::new(1, 5);
        orderer.record_cutoff(hist, Mark::O, 9, 50);
        orderer.record_cutoff(killer, Mark::O, 1, 1);

        let mut moves = state.legal_moves();
        orderer.sort_moves(&mut moves, &state, Mark::O, 1);
        let pos = |m: Move| moves.iter().position(|&x| x == m).unwrap();
        // The center of board 1 still leads on cell rank
        assert_eq!(moves[0], Move::new(1, 4));
        assert!(pos(killer) < pos(hist));
    }

    proptest! {
        #[test]
        fn prop_sort_is_permutation(choices in prop::collection::vec(0usize..81, 0..40), ply in 0usize..20) {
            let mut state = GameState::new();
            for choice in choices {
                let moves = state.legal_moves();
                if moves.is_empty() {
                    break;
                }
                state = state.apply(moves[choice % moves.len()]).unwrap();
            }
            let orderer = MoveOrderer::new();
            let original = state.legal_moves();
            let mut sorted = original.clone();
            orderer.sort_moves(&mut sorted, &state, state.side_to_move(), ply);
            let mut a: Vec<usize> = original.iter().map(|m| m.to_index()).collect();
            let mut b: Vec<usize> = sorted.iter().map(|m| m.to_index()).collect();
            a.sort_unstable();
            b.sort_unstable();
            prop_assert_eq!(a, b);
        }
    }
}
