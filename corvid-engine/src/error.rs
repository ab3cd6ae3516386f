//! The recoverable-error taxonomy: malformed input and resource/IO failures
//! that the engine surfaces as `Result` instead of panicking.

use corvid_core::mv::Move;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorvidError {
    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    #[error("illegal move {mv} in position {fen}")]
    IllegalMove { mv: Move, fen: String },

    #[error("failed to allocate a {requested_mb} MiB transposition table")]
    TtAllocation { requested_mb: usize },

    #[error("failed to load network from {path}: {reason}")]
    NetworkLoad { path: String, reason: String },
}
