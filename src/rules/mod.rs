//! Game rules for Ultimate Tic-Tac-Toe
//!
//! Win lines are shared by both levels of the game:
//! - A local board is won by 3-in-a-row of cells, drawn when full without one
//! - The game is won by 3-in-a-row of won local boards (drawn boards never count)

pub mod win;

// Re-exports for convenient access
pub use win::{
    closed_mask, completing_cells, has_line, is_diagonal, local_outcome, meta_winner,
    owned_mask, WIN_LINES,
};
