//! Background search during the opponent's turn
//!
//! After the engine commits a move, the likeliest opponent replies are
//! searched on background threads. Each completed depth is cached under the
//! exact predicted state, so the next real search can resume one ply deeper
//! when the prediction comes true.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::board::{GameState, Move};
use crate::config::{EngineConfig, PonderConfig};

use super::{SearchLimits, SearchResult, Searcher};

/// Cached outcome of pondering one predicted reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PonderingResult {
    /// The opponent reply this result assumes
    pub reply: Move,
    /// Deepest completed search of the predicted state
    pub result: SearchResult,
}

/// In-flight ponder threads.
struct PonderHandle {
    stop: Arc<AtomicBool>,
    done: Receiver<()>,
    pending: usize,
}

/// Speculative searcher for the opponent's turn.
pub struct Ponderer {
    searcher: Searcher,
    config: PonderConfig,
    start_depth: u8,
    cache: Arc<Mutex<HashMap<GameState, PonderingResult>>>,
    handle: Option<PonderHandle>,
}

impl Ponderer {
    pub fn new(searcher: Searcher, config: &EngineConfig) -> Self {
        Self {
            searcher,
            config: config.ponder.clone(),
            start_depth: config.start_depth.min(config.ponder.max_depth),
            cache: Arc::new(Mutex::new(HashMap::new())),
            handle: None,
        }
    }

    /// Predicted opponent replies from `state` (the position right after our
    /// move), best-ordered first, skipping replies that end the game.
    pub fn predict(&self, state: &GameState) -> Vec<(Move, GameState)> {
        let mut replies = state.legal_moves();
        self.searcher
            .orderer()
            .sort_moves(&mut replies, state, state.side_to_move(), 0);
        replies
            .into_iter()
            .map(|mv| (mv, state.play(mv)))
            .filter(|(_, next)| !next.is_terminal())
            .take(self.config.candidates)
            .collect()
    }

    /// Start pondering the opponent's replies to `state`.
    ///
    /// Any earlier pondering is stopped and its cache dropped first.
    pub fn start(&mut self, state: &GameState) {
        self.stop();
        self.cache.lock().clear();
        if !self.config.enabled || state.is_terminal() {
            return;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        let mut pending = 0;

        for (i, (reply, predicted)) in self.predict(state).into_iter().enumerate() {
            let searcher = self.searcher.clone();
            let cache = Arc::clone(&self.cache);
            let limits = SearchLimits::new(self.start_depth, self.config.max_depth)
                .with_stop(Arc::clone(&stop));
            let done_tx = done_tx.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("uttt-ponder-{}", i))
                .spawn(move || {
                    searcher.search_from(&predicted, &limits, None, |result| {
                        cache.lock().insert(
                            predicted,
                            PonderingResult {
                                reply,
                                result: result.clone(),
                            },
                        );
                    });
                    let _ = done_tx.send(());
                });
            match spawned {
                Ok(_) => pending += 1,
                Err(err) => warn!(%err, %reply, "failed to spawn ponder thread"),
            }
        }

        debug!(predictions = pending, "pondering started");
        self.handle = Some(PonderHandle {
            stop,
            done: done_rx,
            pending,
        });
    }

    /// Wait up to `timeout` for every ponder thread to finish on its own.
    /// Returns true once none is left running.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        while handle.pending > 0 {
            match handle.done.recv_deadline(deadline) {
                Ok(()) => handle.pending -= 1,
                Err(RecvTimeoutError::Timeout) => return false,
                // A panicked thread never signals
                Err(RecvTimeoutError::Disconnected) => handle.pending = 0,
            }
        }
        self.handle = None;
        true
    }

    /// Signal every ponder thread to stop and wait at most the configured
    /// grace period. Threads still running afterwards exit at their next
    /// node check.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        handle.stop.store(true, Ordering::Relaxed);
        if !self.wait(self.config.grace()) {
            debug!(grace_ms = self.config.grace_ms, "ponder threads still unwinding after grace period");
            self.handle = None;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Take the cached result for the state actually reached, discarding
    /// every other prediction.
    pub fn take(&mut self, state: &GameState) -> Option<PonderingResult> {
        let mut cache = self.cache.lock();
        let hit = cache.remove(state);
        let stale = cache.len();
        cache.clear();
        match &hit {
            Some(found) => trace!(
                reply = %found.reply,
                depth = found.result.depth,
                stale,
                "ponder cache hit"
            ),
            None => trace!(stale, "ponder cache miss"),
        }
        hit
    }

    /// Number of predicted states with at least one completed depth.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

impl Drop for Ponderer {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.stop.store(true, Ordering::Relaxed);
        }
    }
}
