use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error when parsing a square name such as `"e4"`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid square notation: '{0}'")]
pub struct ParseSquareError(String);

/// Error when decoding a square whose coordinates fall off the board.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("square out of range: row {row}, col {col}")]
pub struct SquareOutOfRange {
    pub row: u8,
    pub col: u8,
}

/// A board coordinate. Row 0 = rank 1 (White's back rank), col 0 = file a.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawSquare")]
pub struct Square {
    row: u8,
    col: u8,
}

/// Wire shape of a square, checked before it becomes a `Square`.
#[derive(Deserialize)]
struct RawSquare {
    row: u8,
    col: u8,
}

impl TryFrom<RawSquare> for Square {
    type Error = SquareOutOfRange;

    fn try_from(raw: RawSquare) -> Result<Self, Self::Error> {
        let RawSquare { row, col } = raw;
        Square::new(row as usize, col as usize).ok_or(SquareOutOfRange { row, col })
    }
}

impl Square {
    pub const fn new(row: usize, col: usize) -> Option<Self> {
        if row < 8 && col < 8 {
            Some(Square {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    #[inline]
    pub const fn row(self) -> usize {
        self.row as usize
    }

    #[inline]
    pub const fn col(self) -> usize {
        self.col as usize
    }

    /// The square `dr` rows and `dc` columns away, or `None` if that falls off the board.
    pub fn offset(self, dr: i32, dc: i32) -> Option<Square> {
        let r = self.row as i32 + dr;
        let c = self.col as i32 + dc;
        if (0..8).contains(&r) && (0..8).contains(&c) {
            Square::new(r as usize, c as usize)
        } else {
            None
        }
    }

    /// Same square, different column on the same row.
    pub fn with_col(self, col: usize) -> Option<Square> {
        Square::new(self.row(), col)
    }

    /// Squares strictly between `self` and `to` when both lie on a common
    /// rank, file or diagonal. Empty for unaligned pairs and neighbours.
    pub fn between(self, to: Square) -> Vec<Square> {
        let dr = to.row as i32 - self.row as i32;
        let dc = to.col as i32 - self.col as i32;
        let aligned = dr == 0 || dc == 0 || dr.abs() == dc.abs();
        if !aligned {
            return Vec::new();
        }
        let (sr, sc) = (dr.signum(), dc.signum());
        let mut out = Vec::new();
        let mut cur = self.offset(sr, sc);
        while let Some(sq) = cur {
            if sq == to {
                break;
            }
            out.push(sq);
            cur = sq.offset(sr, sc);
        }
        out
    }

    /// All 64 squares, row by row starting at a1.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..8u8).flat_map(|row| (0..8u8).map(move |col| Square { row, col }))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + self.col) as char;
        let rank = (b'1' + self.row) as char;
        write!(f, "{file}{rank}")
    }
}

impl FromStr for Square {
    type Err = ParseSquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ParseSquareError(s.to_string()));
        }
        let col = bytes[0].wrapping_sub(b'a') as usize;
        let row = bytes[1].wrapping_sub(b'1') as usize;
        Square::new(row, col).ok_or_else(|| ParseSquareError(s.to_string()))
    }
}
