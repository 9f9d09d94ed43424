//! Alpha-Beta search with iterative deepening and a shared transposition table
//!
//! Each depth fans the root moves out across a fixed worker pool. Every root
//! move gets a full window, so the root scores are exact and every move tied
//! for best is reported. Workers share the transposition table, the move
//! ordering tables and one stop flag per search.
//!
//! # Features
//!
//! - Max/min alpha-beta scored from the root mover's perspective
//! - Iterative deepening with a growth-based feasibility estimate
//! - Deadline-bounded aggregation: an unfinished depth is discarded whole
//! - Early stop on a forced win or once the tree is exhausted
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use uttt::board::GameState;
//! use uttt::search::{SearchLimits, Searcher};
//! use uttt::EngineConfig;
//!
//! let searcher = Searcher::new(&EngineConfig::default()).unwrap();
//! let state = GameState::new();
//!
//! let limits = SearchLimits::new(2, 3).with_budget(Duration::from_millis(500));
//! let result = searcher.search(&state, &limits);
//! assert!(result.best_move().is_some());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, error, trace, warn};

use crate::board::{GameState, Mark, Move};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::eval::{is_forced_win, terminal_score, Evaluator, HeuristicEvaluator, Score};

use super::{AtomicTT, EntryType, MoveOrderer, TTStats, ZOBRIST};

/// The wall clock is read once every this many nodes (power of two minus one)
const NODE_CHECK_MASK: u64 = 1023;

/// Per-depth growth bounds for the feasibility estimate
const MIN_GROWTH: f64 = 2.0;
const MAX_GROWTH: f64 = 3.5;
const DEFAULT_GROWTH: f64 = 3.0;

/// Search result: every move tied for the best score at the deepest
/// completed depth.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Best moves in root order; empty only when there is no legal move
    pub best_moves: Vec<Move>,
    /// Score of the best moves, from the mover's perspective
    pub score: i32,
    /// Deepest completed depth (0 = no depth completed)
    pub depth: u8,
    /// Nodes searched by this invocation
    pub nodes: u64,
    pub elapsed: Duration,
}

impl SearchResult {
    fn empty(elapsed: Duration) -> Self {
        Self {
            best_moves: Vec::new(),
            score: Score::NEUTRAL,
            depth: 0,
            nodes: 0,
            elapsed,
        }
    }

    /// The move to play: the first of the best set.
    #[inline]
    pub fn best_move(&self) -> Option<Move> {
        self.best_moves.first().copied()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.best_moves.is_empty()
    }
}

/// Bounds for one search invocation.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    pub start_depth: u8,
    pub max_depth: u8,
    /// Wall-clock deadline; `None` runs until `max_depth` or a stop request
    pub deadline: Option<Instant>,
    /// Cooperative cancellation flag shared with every worker
    pub stop: Arc<AtomicBool>,
    /// Root moves never to return
    pub excluded: Vec<Move>,
}

impl SearchLimits {
    pub fn new(start_depth: u8, max_depth: u8) -> Self {
        Self {
            start_depth: start_depth.max(1),
            max_depth: max_depth.max(1),
            deadline: None,
            stop: Arc::new(AtomicBool::new(false)),
            excluded: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_budget(self, budget: Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub fn excluding(mut self, moves: &[Move]) -> Self {
        self.excluded = moves.to_vec();
        self
    }

    #[inline]
    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Per-task search context, passed by reference down the recursion.
struct SearchContext<'a> {
    perspective: Mark,
    perspective_key: u64,
    stop: &'a AtomicBool,
    deadline: Option<Instant>,
    nodes: u64,
}

impl<'a> SearchContext<'a> {
    fn new(perspective: Mark, stop: &'a AtomicBool, deadline: Option<Instant>) -> Self {
        Self {
            perspective,
            perspective_key: ZOBRIST.perspective_key(perspective),
            stop,
            deadline,
            nodes: 0,
        }
    }

    #[inline]
    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Count a node; every `NODE_CHECK_MASK + 1` nodes, also check the clock
    /// and raise the shared stop flag once the deadline has passed.
    #[inline]
    fn poll(&mut self) -> bool {
        self.nodes += 1;
        if self.nodes & NODE_CHECK_MASK == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.stop.store(true, Ordering::Relaxed);
                }
            }
        }
        self.is_stopped()
    }
}

/// State shared between all search workers.
struct SharedState {
    tt: AtomicTT,
    orderer: MoveOrderer,
    evaluator: Arc<dyn Evaluator>,
}

impl SharedState {
    /// Evaluator score, neutral on failure.
    #[inline]
    fn evaluate(&self, state: &GameState, perspective: Mark) -> i32 {
        match self.evaluator.evaluate(state, perspective) {
            Ok(score) => score,
            Err(err) => {
                trace!(%err, "evaluator failed, using neutral score");
                Score::NEUTRAL
            }
        }
    }

    /// Max/min alpha-beta. Returns `Score::NEUTRAL` once stopped; callers
    /// must check the stop flag before trusting the value.
    #[allow(clippy::too_many_arguments)]
    fn alpha_beta(
        &self,
        ctx: &mut SearchContext<'_>,
        state: &GameState,
        hash: u64,
        depth: u8,
        ply: u32,
        mut alpha: i32,
        mut beta: i32,
    ) -> i32 {
        if ctx.poll() {
            return Score::NEUTRAL;
        }
        if let Some(score) = terminal_score(state, ctx.perspective, ply) {
            return score;
        }
        if depth == 0 {
            return self.evaluate(state, ctx.perspective);
        }

        let key = hash ^ ctx.perspective_key;
        if let Some(score) = self.tt.probe(key, depth, alpha, beta, ply) {
            return score;
        }

        let side = state.side_to_move();
        let maximizing = side == ctx.perspective;
        let mut moves = state.legal_moves();
        self.orderer.sort_moves(&mut moves, state, side, ply as usize);

        let (alpha_orig, beta_orig) = (alpha, beta);
        let mut best = if maximizing { -Score::INF } else { Score::INF };

        for mv in moves {
            let child = state.play(mv);
            let child_hash = ZOBRIST.update_move(hash, state, &child, mv);
            let score = self.alpha_beta(ctx, &child, child_hash, depth - 1, ply + 1, alpha, beta);
            if ctx.is_stopped() {
                return Score::NEUTRAL;
            }

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(best);
            } else {
                best = best.min(score);
                beta = beta.min(best);
            }
            if beta <= alpha {
                self.orderer.record_cutoff(mv, side, ply as usize, depth);
                break;
            }
        }

        let entry_type = if best <= alpha_orig {
            EntryType::UpperBound
        } else if best >= beta_orig {
            EntryType::LowerBound
        } else {
            EntryType::Exact
        };
        self.tt.store(key, depth, best, entry_type, ply);
        best
    }
}

/// One root move's answer from a worker. `score` is `None` if the worker
/// was stopped before finishing.
struct RootReply {
    index: usize,
    score: Option<i32>,
    nodes: u64,
}

/// Result of one fully completed depth.
struct DepthResult {
    scores: Vec<i32>,
    best: i32,
    nodes: u64,
}

/// Parallel iterative-deepening searcher.
///
/// Cheap to clone: clones share the worker pool, transposition table,
/// ordering tables and evaluator.
#[derive(Clone)]
pub struct Searcher {
    shared: Arc<SharedState>,
    pool: Arc<rayon::ThreadPool>,
}

impl Searcher {
    /// Create a searcher with the heuristic evaluator and the configured
    /// table size and worker count.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let evaluator = Arc::new(HeuristicEvaluator::new(config.weights.clone()));
        Self::with_evaluator(config, evaluator)
    }

    /// Create a searcher with a custom evaluator.
    pub fn with_evaluator(config: &EngineConfig, evaluator: Arc<dyn Evaluator>) -> Result<Self> {
        let threads = config.worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("uttt-search-{}", i))
            .panic_handler(|_| error!("search worker panicked"))
            .build()?;
        debug!(threads, tt_size_mb = config.tt_size_mb, "searcher ready");
        Ok(Self {
            shared: Arc::new(SharedState {
                tt: AtomicTT::new(config.tt_size_mb),
                orderer: MoveOrderer::new(),
                evaluator,
            }),
            pool: Arc::new(pool),
        })
    }

    /// Iterative-deepening search from `state` for its side to move.
    pub fn search(&self, state: &GameState, limits: &SearchLimits) -> SearchResult {
        self.search_from(state, limits, None, |_| {})
    }

    /// Iterative-deepening search, optionally resuming from `seed` (an
    /// earlier result for the same state), reporting each completed depth
    /// to `on_depth`.
    ///
    /// A seed is kept as the committed result: the search starts one ply
    /// past it, and if no deeper depth completes the seed is returned.
    pub fn search_from<F>(
        &self,
        state: &GameState,
        limits: &SearchLimits,
        seed: Option<&SearchResult>,
        mut on_depth: F,
    ) -> SearchResult
    where
        F: FnMut(&SearchResult),
    {
        let start = Instant::now();
        let perspective = state.side_to_move();
        let mut moves: Vec<Move> = state
            .legal_moves()
            .into_iter()
            .filter(|mv| !limits.excluded.contains(mv))
            .collect();
        if moves.is_empty() {
            return SearchResult::empty(start.elapsed());
        }
        self.shared.orderer.sort_moves(&mut moves, state, perspective, 0);

        let mut committed = seed
            .filter(|s| !s.is_empty() && s.best_moves.iter().all(|m| moves.contains(m)))
            .cloned();

        // Deeper than the number of empty cells cannot change the result
        let max_depth = limits.max_depth.min(state.empty_count().min(u8::MAX as u32) as u8);
        let mut depth = match &committed {
            Some(seed) => {
                if is_forced_win(seed.score) || seed.depth >= max_depth {
                    let mut done = seed.clone();
                    done.nodes = 0;
                    done.elapsed = start.elapsed();
                    return done;
                }
                promote(&mut moves, &seed.best_moves);
                seed.depth + 1
            }
            None => limits.start_depth.min(max_depth),
        };

        let root_hash = ZOBRIST.hash(state);
        let mut nodes = 0u64;
        let mut last_time: Option<Duration> = None;
        let mut prev_time: Option<Duration> = None;

        while depth <= max_depth {
            if limits.is_stopped() {
                break;
            }
            if let Some(deadline) = limits.deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                if let Some(estimate) = estimate_next(last_time, prev_time) {
                    if estimate > remaining {
                        debug!(
                            depth,
                            estimate_ms = estimate.as_millis() as u64,
                            remaining_ms = remaining.as_millis() as u64,
                            "skipping depth unlikely to finish"
                        );
                        break;
                    }
                }
            }

            let depth_start = Instant::now();
            match self.search_depth(state, root_hash, &moves, depth, perspective, limits) {
                Ok(done) => {
                    nodes += done.nodes;
                    let best_moves: Vec<Move> = moves
                        .iter()
                        .zip(&done.scores)
                        .filter(|&(_, &s)| s == done.best)
                        .map(|(&mv, _)| mv)
                        .collect();
                    // Next depth visits the strongest root moves first
                    let mut ranked: Vec<(Move, i32)> =
                        moves.iter().copied().zip(done.scores.iter().copied()).collect();
                    ranked.sort_by_key(|&(_, s)| std::cmp::Reverse(s));
                    moves = ranked.into_iter().map(|(mv, _)| mv).collect();

                    let result = SearchResult {
                        best_moves,
                        score: done.best,
                        depth,
                        nodes,
                        elapsed: start.elapsed(),
                    };
                    debug!(
                        depth,
                        score = result.score,
                        nodes,
                        best = result.best_moves.len(),
                        elapsed_ms = result.elapsed.as_millis() as u64,
                        "depth complete"
                    );
                    on_depth(&result);
                    let won = is_forced_win(result.score);
                    committed = Some(result);
                    if won {
                        break;
                    }
                }
                Err(err) => {
                    debug!(depth, %err, "depth discarded");
                    break;
                }
            }

            prev_time = last_time;
            last_time = Some(depth_start.elapsed());
            depth += 1;
        }

        match committed {
            Some(mut result) => {
                result.nodes = nodes;
                result.elapsed = start.elapsed();
                result
            }
            None => {
                warn!(move_count = moves.len(), "no depth completed, playing first ordered move");
                SearchResult {
                    best_moves: vec![moves[0]],
                    score: Score::NEUTRAL,
                    depth: 0,
                    nodes,
                    elapsed: start.elapsed(),
                }
            }
        }
    }

    /// Search every root move at `depth` on the pool and wait for all of
    /// them, or fail with `SearchTimeout` as soon as the deadline passes or
    /// a worker reports that it was stopped.
    fn search_depth(
        &self,
        root: &GameState,
        root_hash: u64,
        moves: &[Move],
        depth: u8,
        perspective: Mark,
        limits: &SearchLimits,
    ) -> Result<DepthResult> {
        let (tx, rx) = crossbeam_channel::unbounded::<RootReply>();

        for (index, &mv) in moves.iter().enumerate() {
            let tx = tx.clone();
            let shared = Arc::clone(&self.shared);
            let stop = Arc::clone(&limits.stop);
            let deadline = limits.deadline;
            let root = *root;
            self.pool.spawn(move || {
                let mut ctx = SearchContext::new(perspective, &stop, deadline);
                let score = if ctx.is_stopped() {
                    None
                } else {
                    let child = root.play(mv);
                    let child_hash = ZOBRIST.update_move(root_hash, &root, &child, mv);
                    let score = shared.alpha_beta(
                        &mut ctx,
                        &child,
                        child_hash,
                        depth - 1,
                        1,
                        -Score::INF,
                        Score::INF,
                    );
                    (!ctx.is_stopped()).then_some(score)
                };
                // The aggregator may already have given up on this depth
                let _ = tx.send(RootReply {
                    index,
                    score,
                    nodes: ctx.nodes,
                });
            });
        }
        drop(tx);

        let abort = || {
            limits.stop.store(true, Ordering::Relaxed);
            EngineError::SearchTimeout { depth }
        };

        let mut scores = vec![-Score::INF; moves.len()];
        let mut nodes = 0u64;
        for _ in 0..moves.len() {
            let reply = match limits.deadline {
                Some(deadline) => rx.recv_deadline(deadline),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match reply {
                Ok(RootReply {
                    index,
                    score: Some(score),
                    nodes: n,
                }) => {
                    trace!(depth, mv = %moves[index], score, "root move searched");
                    scores[index] = score;
                    nodes += n;
                }
                Ok(_) | Err(_) => return Err(abort()),
            }
        }

        let best = scores.iter().copied().max().unwrap_or(-Score::INF);
        let key = root_hash ^ ZOBRIST.perspective_key(perspective);
        if limits.excluded.is_empty() {
            self.shared.tt.store(key, depth, best, EntryType::Exact, 0);
        }
        Ok(DepthResult { scores, best, nodes })
    }

    /// Transposition table statistics.
    pub fn tt_stats(&self) -> TTStats {
        self.shared.tt.stats()
    }

    /// Clear the transposition table.
    pub fn clear_tt(&self) {
        self.shared.tt.clear();
    }

    /// Clear killer and history tables.
    pub fn clear_history(&self) {
        self.shared.orderer.clear();
    }

    /// Killer and history tables shared by every worker.
    pub(crate) fn orderer(&self) -> &MoveOrderer {
        &self.shared.orderer
    }

    /// Single-threaded fixed-depth value of `state` for its side to move.
    #[cfg(test)]
    fn fixed_depth_score(&self, state: &GameState, depth: u8) -> i32 {
        let stop = AtomicBool::new(false);
        let mut ctx = SearchContext::new(state.side_to_move(), &stop, None);
        self.shared.alpha_beta(
            &mut ctx,
            state,
            ZOBRIST.hash(state),
            depth,
            0,
            -Score::INF,
            Score::INF,
        )
    }
}

/// Move `first` to the front of `moves`, keeping the rest in order.
fn promote(moves: &mut Vec<Move>, first: &[Move]) {
    let (mut front, rest): (Vec<Move>, Vec<Move>) =
        moves.iter().partition(|mv| first.contains(mv));
    front.extend(rest);
    *moves = front;
}

/// Estimated duration of the next depth from the last two depth timings.
fn estimate_next(last: Option<Duration>, prev: Option<Duration>) -> Option<Duration> {
    let last = last?;
    let growth = match prev {
        Some(prev) if prev.as_secs_f64() > 0.0 => {
            (last.as_secs_f64() / prev.as_secs_f64()).clamp(MIN_GROWTH, MAX_GROWTH)
        }
        _ => DEFAULT_GROWTH,
    };
    Some(last.mul_f64(growth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn test_config() -> EngineConfig {
        EngineConfig {
            tt_size_mb: 4,
            threads: 4,
            ..EngineConfig::default()
        }
    }

    fn play(moves: &[Move]) -> GameState {
        moves
            .iter()
            .fold(GameState::new(), |s, &mv| s.apply(mv).unwrap())
    }

    /// A short opening that leaves the side to move forced into one board.
    fn midgame() -> GameState {
        play(&[
            Move::new(4, 4),
            Move::new(4, 0),
            Move::new(0, 4),
            Move::new(4, 8),
            Move::new(8, 4),
            Move::new(4, 2),
        ])
    }

    /// Plain minimax without pruning or caching.
    fn minimax(ev: &dyn Evaluator, state: &GameState, perspective: Mark, depth: u8, ply: u32) -> i32 {
        if let Some(score) = terminal_score(state, perspective, ply) {
            return score;
        }
        if depth == 0 {
            return ev.evaluate(state, perspective).unwrap_or(Score::NEUTRAL);
        }
        let scores = state
            .legal_moves()
            .into_iter()
            .map(|mv| minimax(ev, &state.apply(mv).unwrap(), perspective, depth - 1, ply + 1));
        if state.side_to_move() == perspective {
            scores.max().unwrap()
        } else {
            scores.min().unwrap()
        }
    }

    struct FailingEvaluator;

    impl Evaluator for FailingEvaluator {
        fn evaluate(&self, _state: &GameState, _perspective: Mark) -> Result<i32> {
            Err(EngineError::Evaluator {
                reason: "always fails".into(),
            })
        }
    }

    #[test]
    fn test_estimate_next_clamps_growth() {
        let ms = Duration::from_millis;
        assert_eq!(estimate_next(None, None), None);
        assert_eq!(estimate_next(Some(ms(10)), None), Some(ms(30)));
        // Growth 10x clamps to 3.5x
        assert_eq!(estimate_next(Some(ms(100)), Some(ms(10))), Some(ms(350)));
        // Growth 1x clamps to 2x
        assert_eq!(estimate_next(Some(ms(40)), Some(ms(40))), Some(ms(80)));
    }

    #[test]
    fn test_promote_keeps_order() {
        let mut moves = vec![Move::new(0, 0), Move::new(1, 1), Move::new(2, 2), Move::new(3, 3)];
        promote(&mut moves, &[Move::new(2, 2)]);
        assert_eq!(
            moves,
            vec![Move::new(2, 2), Move::new(0, 0), Move::new(1, 1), Move::new(3, 3)]
        );
    }

    #[test]
    fn test_alpha_beta_matches_minimax() {
        let ev = HeuristicEvaluator::default();
        let state = midgame();
        let expected = minimax(&ev, &state, state.side_to_move(), 3, 0);

        let searcher = Searcher::new(&test_config()).unwrap();
        assert_eq!(searcher.fixed_depth_score(&state, 3), expected);
    }

    #[test]
    fn test_score_invariant_under_ordering() {
        let state = midgame();
        let searcher = Searcher::new(&test_config()).unwrap();
        let first = searcher.fixed_depth_score(&state, 4);

        // Pollute killers and history so the ordering changes, then search again
        searcher.clear_tt();
        for (i, mv) in GameState::new().legal_moves().into_iter().enumerate() {
            for ply in 0..6 {
                searcher
                    .orderer()
                    .record_cutoff(mv, Mark::X, ply, (i % 7) as u8 + 1);
                searcher
                    .orderer()
                    .record_cutoff(mv, Mark::O, ply, (80 - i) as u8 % 5 + 1);
            }
        }
        assert_eq!(searcher.fixed_depth_score(&state, 4), first);
    }

    #[test]
    fn test_root_best_set_matches_minimax() {
        let ev = HeuristicEvaluator::default();
        let state = midgame();
        let me = state.side_to_move();
        let child_scores: Vec<(Move, i32)> = state
            .legal_moves()
            .into_iter()
            .map(|mv| (mv, minimax(&ev, &state.apply(mv).unwrap(), me, 2, 1)))
            .collect();
        let best = child_scores.iter().map(|&(_, s)| s).max().unwrap();

        let searcher = Searcher::new(&test_config()).unwrap();
        let result = searcher.search(&state, &SearchLimits::new(3, 3));
        assert_eq!(result.depth, 3);
        assert_eq!(result.score, best);
        let mut expected: Vec<Move> = child_scores
            .iter()
            .filter(|&&(_, s)| s == best)
            .map(|&(m, _)| m)
            .collect();
        let mut got = result.best_moves.clone();
        expected.sort_by_key(|m| m.to_index());
        got.sort_by_key(|m| m.to_index());
        assert_eq!(got, expected);
    }

    #[test]
    fn test_finds_immediate_win() {
        let mut cells = [[Mark::Empty; 9]; 9];
        cells[0] = [Mark::X, Mark::X, Mark::X, Mark::O, Mark::O, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty];
        cells[4] = [Mark::X, Mark::X, Mark::X, Mark::O, Mark::O, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty];
        cells[8] = [Mark::X, Mark::X, Mark::Empty, Mark::O, Mark::O, Mark::Empty, Mark::Empty, Mark::Empty, Mark::Empty];
        cells[5][0] = Mark::O;
        cells[5][1] = Mark::O;
        let state = GameState::from_cells(&cells).with_active_board(Some(8));

        let searcher = Searcher::new(&test_config()).unwrap();
        let limits = SearchLimits::new(2, 6).with_budget(Duration::from_secs(5));
        let result = searcher.search(&state, &limits);
        assert_eq!(result.best_moves, vec![Move::new(8, 2)]);
        assert!(is_forced_win(result.score));
        // Forced win stops deepening at once
        assert_eq!(result.depth, 2);
    }

    #[test]
    fn test_no_legal_moves_gives_empty_result() {
        let mut cells = [[Mark::Empty; 9]; 9];
        for b in [0, 1, 2] {
            cells[b] = [Mark::O; 9];
        }
        let state = GameState::from_cells(&cells);
        let searcher = Searcher::new(&test_config()).unwrap();
        let result = searcher.search(&state, &SearchLimits::new(2, 4));
        assert!(result.is_empty());
        assert_eq!(result.best_move(), None);
    }

    #[test]
    fn test_deadline_respected_on_empty_board() {
        let searcher = Searcher::new(&test_config()).unwrap();
        let budget = Duration::from_millis(300);
        let start = Instant::now();
        let limits = SearchLimits::new(4, 40).with_budget(budget);
        let result = searcher.search(&GameState::new(), &limits);
        let elapsed = start.elapsed();

        assert!(elapsed < budget + Duration::from_millis(200), "took {:?}", elapsed);
        let mv = result.best_move().unwrap();
        assert!(GameState::new().is_legal(mv));
    }

    #[test]
    fn test_expired_deadline_falls_back_to_legal_move() {
        let searcher = Searcher::new(&test_config()).unwrap();
        let state = midgame();
        let limits = SearchLimits::new(4, 10).with_deadline(Instant::now());
        let result = searcher.search(&state, &limits);
        assert_eq!(result.depth, 0);
        assert_eq!(result.best_moves.len(), 1);
        assert!(state.is_legal(result.best_moves[0]));
    }

    #[test]
    fn test_stop_flag_aborts_background_search() {
        let searcher = Searcher::new(&test_config()).unwrap();
        let stop = Arc::new(AtomicBool::new(true));
        let limits = SearchLimits::new(3, 30).with_stop(stop);
        let result = searcher.search(&GameState::new(), &limits);
        assert_eq!(result.depth, 0);
        assert_eq!(result.best_moves.len(), 1);
    }

    #[test]
    fn test_excluded_moves_never_returned() {
        let searcher = Searcher::new(&test_config()).unwrap();
        let state = GameState::new().apply(Move::new(0, 4)).unwrap();
        let excluded: Vec<Move> = state.legal_moves().into_iter().take(8).collect();
        let limits = SearchLimits::new(2, 3).excluding(&excluded);
        let result = searcher.search(&state, &limits);
        // Board 4 has nine cells; only the last one remains
        assert_eq!(result.best_moves, vec![Move::new(4, 8)]);
    }

    #[test]
    fn test_seed_resumes_one_ply_deeper() {
        let searcher = Searcher::new(&test_config()).unwrap();
        let state = midgame();
        let shallow = searcher.search(&state, &SearchLimits::new(2, 2));
        assert_eq!(shallow.depth, 2);

        let mut depths = Vec::new();
        let resumed = searcher.search_from(&state, &SearchLimits::new(2, 4), Some(&shallow), |r| {
            depths.push(r.depth)
        });
        assert_eq!(depths, vec![3, 4]);
        assert_eq!(resumed.depth, 4);
    }

    #[test]
    fn test_seed_at_cap_returned_directly() {
        let searcher = Searcher::new(&test_config()).unwrap();
        let state = midgame();
        let seed = searcher.search(&state, &SearchLimits::new(3, 3));
        let result = searcher.search_from(&state, &SearchLimits::new(2, 3), Some(&seed), |_| {
            panic!("no depth should run")
        });
        assert_eq!(result.best_moves, seed.best_moves);
        assert_eq!(result.depth, 3);
    }

    #[test]
    fn test_failing_evaluator_degrades_to_neutral() {
        let searcher = Searcher::with_evaluator(&test_config(), Arc::new(FailingEvaluator)).unwrap();
        let state = midgame();
        let result = searcher.search(&state, &SearchLimits::new(2, 2));
        assert_eq!(result.depth, 2);
        assert_eq!(result.score, Score::NEUTRAL);
        assert!(state.is_legal(result.best_move().unwrap()));
    }

    #[test]
    fn test_exhausted_tree_stops_deepening() {
        // Boards 1-8 drawn, board 0 one cell short of a draw
        let drawn = [Mark::X, Mark::O, Mark::X, Mark::X, Mark::O, Mark::O, Mark::O, Mark::X, Mark::X];
        let mut cells = [drawn; 9];
        cells[0][8] = Mark::Empty;
        let state = GameState::from_cells(&cells);
        assert!(!state.is_terminal());
        assert_eq!(state.empty_count(), 1);

        let searcher = Searcher::new(&test_config()).unwrap();
        let result = searcher.search(&state, &SearchLimits::new(4, 10));
        assert_eq!(result.depth, 1);
        assert_eq!(result.best_moves, vec![Move::new(0, 8)]);
        assert_eq!(result.score, Score::DRAW);
    }
}
