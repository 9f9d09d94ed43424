//! Game state with local-board outcomes and the forced-redirect selector

use std::fmt;

use super::bitboard::{Bitboard, LOCAL_MASK};
use super::{Mark, Move, Outcome, GRID, TOTAL_CELLS};
use crate::config::FeedCodes;
use crate::error::{EngineError, Result};
use crate::rules::{closed_mask, local_outcome, meta_winner};

/// Immutable-per-node game state.
///
/// `apply` returns a fresh copy, so every search branch owns its own
/// snapshot and siblings never alias. The type is `Copy` (a few dozen bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameState {
    /// X marks bitboard
    x: Bitboard,
    /// O marks bitboard
    o: Bitboard,
    /// Outcome of each local board; never reverts once closed
    outcomes: [Outcome; GRID],
    /// Board the side to move is forced into, `None` = any open board
    active: Option<u8>,
    side_to_move: Mark,
    /// Move that produced this state; `None` for built or fed positions
    last_move: Option<Move>,
}

impl GameState {
    /// Empty board, X to move, any board playable.
    pub fn new() -> Self {
        Self {
            x: Bitboard::new(),
            o: Bitboard::new(),
            outcomes: [Outcome::Open; GRID],
            active: None,
            side_to_move: Mark::X,
            last_move: None,
        }
    }

    /// Build a state from the 81-integer initialization feed.
    ///
    /// The feed is row-major over the 9x9 grid (row 0 at the top), `0` for
    /// empty and `codes.x` / `codes.o` for the marks. The active board is
    /// `Any`; the side to move is X unless X has more marks than O.
    pub fn from_feed(feed: &[i32], codes: &FeedCodes) -> Result<Self> {
        if feed.len() != TOTAL_CELLS {
            return Err(EngineError::InitFeed {
                reason: format!("expected {} values, got {}", TOTAL_CELLS, feed.len()),
            });
        }
        let mut cells = [[Mark::Empty; GRID]; GRID];
        for (i, &value) in feed.iter().enumerate() {
            let mv = Move::from_row_col(i / GRID, i % GRID);
            let mark = if value == 0 {
                Mark::Empty
            } else if value == codes.x {
                Mark::X
            } else if value == codes.o {
                Mark::O
            } else {
                return Err(EngineError::InitFeed {
                    reason: format!("unknown cell code {} at position {}", value, i),
                });
            };
            cells[mv.board as usize][mv.cell as usize] = mark;
        }
        Ok(Self::from_cells(&cells))
    }

    /// Build a state from marks indexed `[board][cell]`.
    ///
    /// Outcomes are recomputed from the cells, the active board is `Any`.
    pub fn from_cells(cells: &[[Mark; GRID]; GRID]) -> Self {
        let mut state = Self::new();
        for (b, board) in cells.iter().enumerate() {
            for (c, &mark) in board.iter().enumerate() {
                let mv = Move::new(b as u8, c as u8);
                match mark {
                    Mark::X => state.x.set(mv),
                    Mark::O => state.o.set(mv),
                    Mark::Empty => {}
                }
            }
        }
        for b in 0..GRID {
            state.outcomes[b] = local_outcome(state.x.local(b), state.o.local(b));
        }
        state.side_to_move = if state.x.count() > state.o.count() {
            Mark::O
        } else {
            Mark::X
        };
        state
    }

    /// Return a copy forced into `board`. A closed board (or `None`) means `Any`.
    #[must_use]
    pub fn with_active_board(mut self, board: Option<usize>) -> Self {
        self.active = board
            .filter(|&b| b < GRID && self.outcomes[b].is_open())
            .map(|b| b as u8);
        self
    }

    /// Return a copy with the given side to move.
    #[must_use]
    pub fn with_side_to_move(mut self, mark: Mark) -> Self {
        if mark != Mark::Empty {
            self.side_to_move = mark;
        }
        self
    }

    #[inline]
    pub fn get(&self, mv: Move) -> Mark {
        if self.x.get(mv) {
            Mark::X
        } else if self.o.get(mv) {
            Mark::O
        } else {
            Mark::Empty
        }
    }

    #[inline]
    pub fn is_empty(&self, mv: Move) -> bool {
        !self.x.get(mv) && !self.o.get(mv)
    }

    #[inline]
    pub fn outcome(&self, board: usize) -> Outcome {
        self.outcomes[board]
    }

    #[inline]
    pub fn outcomes(&self) -> &[Outcome; GRID] {
        &self.outcomes
    }

    /// Board the side to move must play in, `None` when any open board is allowed.
    #[inline]
    pub fn active_board(&self) -> Option<usize> {
        self.active.map(|b| b as usize)
    }

    #[inline]
    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    #[inline]
    pub fn side_to_move(&self) -> Mark {
        self.side_to_move
    }

    /// Bitboard of one mark's cells
    #[inline]
    pub fn marks(&self, mark: Mark) -> Bitboard {
        match mark {
            Mark::X => self.x,
            Mark::O => self.o,
            Mark::Empty => Bitboard::new(),
        }
    }

    /// 9-bit occupancy of `mark` inside one local board
    #[inline]
    pub fn local_mask(&self, board: usize, mark: Mark) -> u16 {
        self.marks(mark).local(board)
    }

    /// 9-bit mask of occupied cells inside one local board
    #[inline]
    pub fn occupied_local(&self, board: usize) -> u16 {
        self.x.local(board) | self.o.local(board)
    }

    /// Number of empty cells left on the whole grid
    #[inline]
    pub fn empty_count(&self) -> u32 {
        TOTAL_CELLS as u32 - self.x.union(self.o).count()
    }

    /// Winner of the meta-board. Drawn boards never form part of a line.
    #[inline]
    pub fn winner(&self) -> Option<Mark> {
        meta_winner(&self.outcomes)
    }

    /// True once a mark owns a meta line or every local board is closed.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        closed_mask(&self.outcomes) == LOCAL_MASK || self.winner().is_some()
    }

    /// Legal moves, ordered by local board then cell.
    ///
    /// Inside the forced board if it is open, otherwise in every open board.
    /// Empty once the game is decided.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(TOTAL_CELLS);
        if self.winner().is_some() {
            return moves;
        }
        match self.active {
            Some(b) if self.outcomes[b as usize].is_open() => {
                self.push_board_moves(b as usize, &mut moves);
            }
            _ => {
                for b in 0..GRID {
                    if self.outcomes[b].is_open() {
                        self.push_board_moves(b, &mut moves);
                    }
                }
            }
        }
        moves
    }

    fn push_board_moves(&self, board: usize, moves: &mut Vec<Move>) {
        let mut empty = !self.occupied_local(board) & LOCAL_MASK;
        while empty != 0 {
            let cell = empty.trailing_zeros() as u8;
            empty &= empty - 1;
            moves.push(Move::new(board as u8, cell));
        }
    }

    /// Check a move against the current (pre-move) state.
    pub fn check_move(&self, mv: Move) -> Result<()> {
        let reject = |reason: &str| {
            Err(EngineError::InvalidMove {
                mv,
                reason: reason.to_string(),
            })
        };
        if mv.board as usize >= GRID || mv.cell as usize >= GRID {
            return reject("out of range");
        }
        if self.winner().is_some() {
            return reject("game is already decided");
        }
        if !self.is_empty(mv) {
            return reject("cell is occupied");
        }
        if !self.outcomes[mv.board as usize].is_open() {
            return reject("local board is closed");
        }
        if let Some(active) = self.active {
            if active != mv.board && self.outcomes[active as usize].is_open() {
                return reject("move is outside the forced board");
            }
        }
        Ok(())
    }

    #[inline]
    pub fn is_legal(&self, mv: Move) -> bool {
        self.check_move(mv).is_ok()
    }

    /// Apply a move for the side to move, returning the new state.
    ///
    /// Illegal moves are rejected with `EngineError::InvalidMove` and `self`
    /// is left as it was.
    pub fn apply(&self, mv: Move) -> Result<GameState> {
        self.check_move(mv)?;
        Ok(self.play(mv))
    }

    /// Apply a move known to be legal (taken from `legal_moves`).
    #[inline]
    pub(crate) fn play(&self, mv: Move) -> GameState {
        debug_assert!(self.is_legal(mv), "illegal move {:?}", mv);
        let mut next = *self;
        let board = mv.board as usize;
        match self.side_to_move {
            Mark::O => next.o.set(mv),
            _ => next.x.set(mv),
        }
        if next.outcomes[board].is_open() {
            next.outcomes[board] = local_outcome(next.x.local(board), next.o.local(board));
        }
        let target = mv.cell as usize;
        next.active = if next.outcomes[target].is_open() {
            Some(mv.cell)
        } else {
            None
        };
        next.side_to_move = self.side_to_move.opponent();
        next.last_move = Some(mv);
        next
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameState {
    /// 9x9 grid with the notation labels, row 9 at the top.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..GRID {
            if row > 0 && row % 3 == 0 {
                writeln!(f, "  ------+-------+------")?;
            }
            write!(f, "{} ", GRID - row)?;
            for col in 0..GRID {
                if col > 0 && col % 3 == 0 {
                    write!(f, "| ")?;
                }
                let ch = match self.get(Move::from_row_col(row, col)) {
                    Mark::X => 'X',
                    Mark::O => 'O',
                    Mark::Empty => '.',
                };
                write!(f, "{} ", ch)?;
            }
            writeln!(f)?;
        }
        write!(f, "  A B C   D E F   G H I")
    }
}
