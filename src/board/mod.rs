//! Board representation for Ultimate Tic-Tac-Toe
//!
//! Nine 3x3 local boards nested inside a 3x3 meta-board. Cells are addressed
//! by `(board, cell)` pairs, both in `0..9`, row-major inside their grid.

pub mod bitboard;
pub mod board;


use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

// Re-exports
pub use bitboard::Bitboard;
pub use board::GameState;

/// Number of local boards (and cells per local board)
pub const GRID: usize = 9;
pub const TOTAL_CELLS: usize = GRID * GRID; // 81

/// Notation sentinel meaning "no previous move, you open the game".
pub const OPENING_SENTINEL: &str = "A0";

/// Player marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    Empty,
    X,
    O,
}

impl Mark {
    /// Get opponent mark
    #[inline]
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
            Mark::Empty => Mark::Empty,
        }
    }

    /// Index into per-player tables (X = 0, O = 1)
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Mark::O => 1,
            _ => 0,
        }
    }
}

/// Outcome of a local board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Open,
    X,
    O,
    Drawn,
}

impl Outcome {
    #[inline]
    pub fn is_open(self) -> bool {
        self == Outcome::Open
    }

    /// Mark that won this board, if any. `Drawn` has no owner.
    #[inline]
    pub fn owner(self) -> Option<Mark> {
        match self {
            Outcome::X => Some(Mark::X),
            Outcome::O => Some(Mark::O),
            Outcome::Open | Outcome::Drawn => None,
        }
    }
}

/// A move: local board index and cell index inside that board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub board: u8,
    pub cell: u8,
}

impl Move {
    #[inline]
    pub fn new(board: u8, cell: u8) -> Self {
        debug_assert!(board < GRID as u8 && cell < GRID as u8);
        Self { board, cell }
    }

    /// Flat bit index (`board * 9 + cell`)
    #[inline]
    pub fn to_index(self) -> usize {
        self.board as usize * GRID + self.cell as usize
    }

    #[inline]
    pub fn from_index(idx: usize) -> Self {
        Self {
            board: (idx / GRID) as u8,
            cell: (idx % GRID) as u8,
        }
    }

    /// Convert from global (row, col) on the 9x9 grid, row 0 at the top.
    #[inline]
    pub fn from_row_col(row: usize, col: usize) -> Self {
        debug_assert!(row < GRID && col < GRID);
        Self {
            board: ((row / 3) * 3 + col / 3) as u8,
            cell: ((row % 3) * 3 + col % 3) as u8,
        }
    }

    /// Global (row, col) on the 9x9 grid, row 0 at the top.
    #[inline]
    pub fn row_col(self) -> (usize, usize) {
        let (b, c) = (self.board as usize, self.cell as usize);
        ((b / 3) * 3 + c / 3, (b % 3) * 3 + c % 3)
    }

    /// Parse 2-character notation, e.g. `"E5"`.
    ///
    /// The column letter runs `A..I` left to right; the row digit runs
    /// `1..9` bottom to top. Returns `Ok(None)` for the opening sentinel `A0`.
    pub fn parse_notation(s: &str) -> Result<Option<Move>, EngineError> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(OPENING_SENTINEL) {
            return Ok(None);
        }
        let bad = || EngineError::Notation {
            input: s.to_string(),
        };
        let mut chars = s.chars();
        let (col_ch, row_ch) = match (chars.next(), chars.next(), chars.next()) {
            (Some(c), Some(r), None) => (c.to_ascii_uppercase(), r),
            _ => return Err(bad()),
        };
        if !('A'..='I').contains(&col_ch) || !('1'..='9').contains(&row_ch) {
            return Err(bad());
        }
        let col = col_ch as usize - 'A' as usize;
        let row = '9' as usize - row_ch as usize;
        Ok(Some(Move::from_row_col(row, col)))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (row, col) = self.row_col();
        write!(f, "{}{}", (b'A' + col as u8) as char, (b'9' - row as u8) as char)
    }
}

impl FromStr for Move {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::parse_notation(s)?.ok_or_else(|| EngineError::Notation {
            input: s.to_string(),
        })
    }
}
