use thiserror::Error;

use crate::piece::Color;
use crate::square::Square;

/// A move the engine refused. The game state is untouched when one of these
/// is returned.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("no piece on {0}")]
    EmptySquare(Square),

    #[error("illegal move: {from} -> {to}")]
    IllegalMove { from: Square, to: Square },
}

/// A board that the rules cannot operate on. Seeing one after a committed
/// move means the engine itself is broken.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{color} has {count} kings on the board")]
    MultipleKings { color: Color, count: usize },
}
