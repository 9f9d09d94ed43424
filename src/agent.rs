//! Game-session agent at the collaborator boundary
//!
//! Tracks the authoritative [`GameState`] of one game, turns the opponent's
//! move notation into our answer, and handles the coordinator's
//! "invalid move, try again" and game-over signals. Transport is left to the
//! caller.

use tracing::{debug, info, warn};

use crate::board::{GameState, Mark, Move};
use crate::engine::AIEngine;
use crate::error::{EngineError, Result};

/// The last answer given, kept until the opponent replies.
#[derive(Debug, Clone)]
struct Pending {
    /// State before our answer was applied
    before: GameState,
    /// Every answer given for `before`, last one last
    answered: Vec<Move>,
}

pub struct Agent {
    engine: AIEngine,
    state: GameState,
    mark: Mark,
    pending: Option<Pending>,
}

impl Agent {
    pub fn new(engine: AIEngine) -> Self {
        Self {
            engine,
            state: GameState::new(),
            mark: Mark::X,
            pending: None,
        }
    }

    /// Begin a game playing `mark`, from the empty board or from a feed of 81
    /// cell codes.
    pub fn start(&mut self, mark: Mark, feed: Option<&[i32]>) -> Result<()> {
        let state = match feed {
            Some(feed) => GameState::from_feed(feed, &self.engine.config().feed)?,
            None => GameState::new(),
        };
        self.engine.new_game();
        self.state = state;
        self.mark = mark;
        self.pending = None;
        info!(?mark, empty = state.empty_count(), "game started");
        Ok(())
    }

    /// Back to a fresh empty game with the same mark.
    pub fn reset(&mut self) {
        self.engine.new_game();
        self.state = GameState::new();
        self.pending = None;
        debug!("agent reset");
    }

    /// Apply the opponent's move (or the opening sentinel) and answer with
    /// our move's notation. An invalid opponent move leaves the state as it
    /// was.
    pub fn opponent_moved(&mut self, notation: &str) -> Result<String> {
        self.engine.stop_pondering();
        if let Some(mv) = Move::parse_notation(notation)? {
            self.state = self.state.apply(mv)?;
            debug!(%mv, "opponent moved");
        }
        self.pending = None;
        self.answer(Vec::new())
    }

    /// Our previous answer was rejected: go back to the state before it and
    /// answer with a move not yet tried.
    pub fn retry(&mut self) -> Result<String> {
        self.engine.stop_pondering();
        let pending = self.pending.take().ok_or(EngineError::NothingToRetry)?;
        warn!(rejected = ?pending.answered.last(), "answer rejected, retrying");
        self.state = pending.before;
        self.answer(pending.answered)
    }

    /// The game ended; drop background work until the next start.
    pub fn game_over(&mut self) {
        self.engine.stop_pondering();
        self.pending = None;
        info!(winner = ?self.state.winner(), "game over");
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    fn answer(&mut self, mut excluded: Vec<Move>) -> Result<String> {
        if self.state.side_to_move() != self.mark {
            warn!(
                expected = ?self.mark,
                found = ?self.state.side_to_move(),
                "asked to move out of turn, taking the move"
            );
            self.state = self.state.with_side_to_move(self.mark);
        }

        let result = self.engine.get_move_excluding(&self.state, &excluded)?;
        let before = self.state;
        self.state = self.state.apply(result.best_move)?;
        excluded.push(result.best_move);
        self.pending = Some(Pending {
            before,
            answered: excluded,
        });

        self.engine.start_pondering(&self.state);
        Ok(result.best_move.to_string())
    }
}
