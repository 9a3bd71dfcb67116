use std::fmt;

use serde::{Deserialize, Serialize};

use crate::piece::{Piece, PieceType};
use crate::square::Square;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum CastleSide {
    /// Toward the h-file rook.
    King,
    /// Toward the a-file rook.
    Queen,
}

impl CastleSide {
    /// Column the king lands on.
    pub fn king_col(self) -> usize {
        match self {
            CastleSide::King => 6,
            CastleSide::Queen => 2,
        }
    }

    /// Column the rook starts on.
    pub fn rook_from_col(self) -> usize {
        match self {
            CastleSide::King => 7,
            CastleSide::Queen => 0,
        }
    }

    /// Column the rook lands on.
    pub fn rook_to_col(self) -> usize {
        match self {
            CastleSide::King => 5,
            CastleSide::Queen => 3,
        }
    }

    /// Side implied by a two-column king step, if it is one.
    pub fn from_king_step(from: Square, to: Square) -> Option<CastleSide> {
        if from.row() != to.row() {
            return None;
        }
        match to.col() as i32 - from.col() as i32 {
            2 => Some(CastleSide::King),
            -2 => Some(CastleSide::Queen),
            _ => None,
        }
    }
}

/// Rook relocation performed as part of a castle.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct Castle {
    pub side: CastleSide,
    pub rook_from: Square,
    pub rook_to: Square,
}

/// What a committed move did, for the presentation layer to mirror.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct MoveOutcome {
    pub mv: Move,
    /// The piece as it stood before moving.
    pub piece: Piece,
    /// Square the captured piece was removed from. Differs from `mv.to` for
    /// en passant.
    pub captured: Option<(Square, Piece)>,
    pub en_passant: bool,
    pub castle: Option<Castle>,
    /// Piece type the pawn became, if it promoted.
    pub promotion: Option<PieceType>,
    /// Whether the opponent is in check after this move.
    pub gives_check: bool,
}

impl MoveOutcome {
    pub fn capture_square(&self) -> Option<Square> {
        self.captured.map(|(sq, _)| sq)
    }
}
