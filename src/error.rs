//! Error types shared across the engine.
//!
//! Rule configuration problems are fatal: a [`RuleError`] aborts move
//! construction instead of falling back to some default disposition.
//! Everything else surfaces as an [`EngineError`].

use thiserror::Error;

use crate::evaluator::EvaluatorError;

/// A malformed or internally inconsistent rule set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("board size {0} is out of range")]
    BoardSize(usize),

    #[error("too many piece types ({0})")]
    TooManyPieces(usize),

    #[error("unknown piece name `{0}`")]
    UnknownPiece(String),

    #[error("cannot place piece at {x},{y}: {reason}")]
    Placement { x: i32, y: i32, reason: &'static str },

    #[error("bad move template `{0}`")]
    Template(String),

    #[error("rules do not say what happens when `{piece}` lands on {class} square")]
    AmbiguousLanding { piece: String, class: &'static str },

    #[error("piece `{0}` swaps with a virtual origin")]
    VirtualSwap(String),

    #[error("piece code {0} has no definition")]
    UnknownCode(i8),
}

/// Errors raised by the engine, the search, and the front ends.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    /// A search invariant was broken. Never recoverable.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("unknown game `{0}`")]
    UnknownGame(String),

    #[error("illegal move `{0}`")]
    IllegalMove(String),

    #[error("game is over")]
    GameOver,

    #[error("game is not over")]
    GameNotOver,

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
