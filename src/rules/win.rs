//! Win-line checking for local boards and the meta-board
//!
//! Both levels are 3x3 grids, so the same eight line masks serve for a
//! local board's cells and for the meta-board's outcomes. Bit `i` of a mask
//! is cell (or board) `i`, row-major.

use crate::board::{Mark, Outcome};

/// The eight 3-in-a-row lines: 3 rows, 3 columns, 2 diagonals
pub const WIN_LINES: [u16; 8] = [
    0b000_000_111, // Row 0
    0b000_111_000, // Row 1
    0b111_000_000, // Row 2
    0b001_001_001, // Col 0
    0b010_010_010, // Col 1
    0b100_100_100, // Col 2
    0b100_010_001, // Diagonal 0-4-8
    0b001_010_100, // Diagonal 2-4-6
];

/// Returns true for the two diagonal lines
#[inline]
pub fn is_diagonal(line: u16) -> bool {
    line == WIN_LINES[6] || line == WIN_LINES[7]
}

/// Check whether `mask` contains a complete line.
///
/// Lines are tried in `WIN_LINES` order; the first satisfied one wins.
#[inline]
pub fn has_line(mask: u16) -> bool {
    WIN_LINES.iter().any(|&line| mask & line == line)
}

/// Cells that would complete a line for the owner of `own`.
///
/// A cell qualifies when it is empty (not in `blocked`) and the other two
/// cells of some line are in `own`.
#[inline]
pub fn completing_cells(own: u16, blocked: u16) -> u16 {
    let mut cells = 0u16;
    for &line in &WIN_LINES {
        let have = own & line;
        if have.count_ones() == 2 {
            let missing = line & !have;
            if missing & blocked == 0 {
                cells |= missing;
            }
        }
    }
    cells
}

/// Outcome of a local board from the two marks' 9-bit occupancy masks.
///
/// X is checked before O; a position reached by legal play never has both.
#[inline]
pub fn local_outcome(x: u16, o: u16) -> Outcome {
    if has_line(x) {
        Outcome::X
    } else if has_line(o) {
        Outcome::O
    } else if (x | o) & 0x1FF == 0x1FF {
        Outcome::Drawn
    } else {
        Outcome::Open
    }
}

/// 9-bit mask of the boards owned by `mark`. Drawn boards belong to no one.
#[inline]
pub fn owned_mask(outcomes: &[Outcome; 9], mark: Mark) -> u16 {
    outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| o.owner() == Some(mark))
        .fold(0u16, |acc, (i, _)| acc | (1 << i))
}

/// 9-bit mask of boards that are no longer open (won or drawn).
#[inline]
pub fn closed_mask(outcomes: &[Outcome; 9]) -> u16 {
    outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.is_open())
        .fold(0u16, |acc, (i, _)| acc | (1 << i))
}

/// Winner of the meta-board, if any mark owns a complete line of boards.
pub fn meta_winner(outcomes: &[Outcome; 9]) -> Option<Mark> {
    [Mark::X, Mark::O]
        .into_iter()
        .find(|&mark| has_line(owned_mask(outcomes, mark)))
}
