//! Error types for the engine

use crate::board::Move;

/// Errors surfaced by the engine and its collaborator boundary.
///
/// Search-internal failures (`SearchTimeout`, `Evaluator`) are recovered
/// inside the search and never reach the caller of `AIEngine`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid move {mv}: {reason}")]
    InvalidMove { mv: Move, reason: String },

    #[error("no legal moves in this position")]
    NoLegalMoves,

    #[error("search at depth {depth} aborted before completion")]
    SearchTimeout { depth: u8 },

    #[error("evaluator failure: {reason}")]
    Evaluator { reason: String },

    #[error("malformed move notation {input:?}")]
    Notation { input: String },

    #[error("no answer has been given that could be retried")]
    NothingToRetry,

    #[error("invalid initialization feed: {reason}")]
    InitFeed { reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to start search workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
