use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::moves::CastleSide;
use crate::piece::{Color, Piece, PieceType};
use crate::square::Square;

const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// Column both kings start on.
const KING_HOME_COL: usize = 4;

/// The 8x8 grid. Each cell is the only record of where its piece stands.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

impl Board {
    /// Create an empty board with no pieces. Useful for setting up test positions.
    pub fn empty() -> Self {
        Board {
            squares: [[None; 8]; 8],
        }
    }

    /// The standard starting layout: White on rows 0-1, Black on rows 6-7.
    pub fn standard() -> Self {
        let mut squares = [[None; 8]; 8];
        for (col, &pt) in BACK_RANK.iter().enumerate() {
            squares[0][col] = Some(Piece::new(pt, Color::White));
            squares[1][col] = Some(Piece::new(PieceType::Pawn, Color::White));
            squares[6][col] = Some(Piece::new(PieceType::Pawn, Color::Black));
            squares[7][col] = Some(Piece::new(pt, Color::Black));
        }
        Board { squares }
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.row()][sq.col()]
    }

    #[inline]
    pub fn is_empty(&self, sq: Square) -> bool {
        self.piece_at(sq).is_none()
    }

    /// Put `piece` on `sq`, returning whatever stood there.
    pub fn place(&mut self, sq: Square, piece: Piece) -> Option<Piece> {
        self.put(sq, Some(piece))
    }

    pub fn remove(&mut self, sq: Square) -> Option<Piece> {
        self.put(sq, None)
    }

    fn put(&mut self, sq: Square, piece: Option<Piece>) -> Option<Piece> {
        std::mem::replace(&mut self.squares[sq.row()][sq.col()], piece)
    }

    /// Move the piece on `from` to `to` and flag it as moved. Returns the
    /// displaced occupant of `to`.
    pub(crate) fn relocate(&mut self, from: Square, to: Square) -> Option<Piece> {
        let moving = self.remove(from).map(Piece::moved);
        self.put(to, moving)
    }

    /// Occupied squares in a1..h8 order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.pieces().filter(move |(_, p)| p.color == color)
    }

    pub fn find_king(&self, color: Color) -> Option<Square> {
        self.pieces_of(color)
            .find(|(_, p)| p.piece_type == PieceType::King)
            .map(|(sq, _)| sq)
    }

    fn holds_color(&self, sq: Square, color: Color) -> bool {
        self.piece_at(sq).map(|p| p.color == color).unwrap_or(false)
    }

    /// True when no square strictly between `from` and `to` is occupied.
    pub fn path_clear(&self, from: Square, to: Square) -> bool {
        from.between(to).into_iter().all(|sq| self.is_empty(sq))
    }

    // =========================================================================
    // Occupancy filtering
    // =========================================================================

    /// Destinations for the piece on `from` that respect occupancy, path
    /// clearance and castling eligibility, but not yet the mover's own king
    /// safety. `en_passant` lists squares the mover may capture into en
    /// passant.
    pub fn reachable(&self, from: Square, en_passant: &[Square]) -> Vec<Square> {
        let Some(piece) = self.piece_at(from) else {
            return Vec::new();
        };

        piece
            .potential_moves(from)
            .into_iter()
            .filter(|&to| match piece.piece_type {
                PieceType::Pawn => self.pawn_can_reach(from, to, piece.color, en_passant),
                PieceType::Knight => !self.holds_color(to, piece.color),
                PieceType::King => match CastleSide::from_king_step(from, to) {
                    Some(side) => self.can_castle(from, side),
                    None => !self.holds_color(to, piece.color),
                },
                PieceType::Bishop | PieceType::Rook | PieceType::Queen => {
                    self.path_clear(from, to) && !self.holds_color(to, piece.color)
                }
            })
            .collect()
    }

    fn pawn_can_reach(&self, from: Square, to: Square, color: Color, en_passant: &[Square]) -> bool {
        if from.col() == to.col() {
            // No capturing straight ahead, no jumping on the double step
            self.is_empty(to) && self.path_clear(from, to)
        } else {
            self.holds_color(to, color.opposite())
                || (self.is_empty(to) && en_passant.contains(&to))
        }
    }

    /// Full castling eligibility for the king on `king_sq`.
    pub fn can_castle(&self, king_sq: Square, side: CastleSide) -> bool {
        let Some(king) = self.piece_at(king_sq) else {
            return false;
        };
        let color = king.color;
        if king.piece_type != PieceType::King
            || king.has_moved
            || king_sq.row() != color.home_row()
            || king_sq.col() != KING_HOME_COL
        {
            return false;
        }

        let Some(rook_sq) = king_sq.with_col(side.rook_from_col()) else {
            return false;
        };
        let rook_ok = self
            .piece_at(rook_sq)
            .map(|p| p.piece_type == PieceType::Rook && p.color == color && !p.has_moved)
            .unwrap_or(false);
        if !rook_ok || !self.path_clear(king_sq, rook_sq) {
            return false;
        }

        // King may not start in, pass through or land in an attacked square
        let (lo, hi) = if side.king_col() > KING_HOME_COL {
            (KING_HOME_COL, side.king_col())
        } else {
            (side.king_col(), KING_HOME_COL)
        };
        (lo..=hi)
            .filter_map(|col| king_sq.with_col(col))
            .all(|sq| !self.is_square_attacked_by(sq, color.opposite()))
    }

    // =========================================================================
    // Attacks and check
    // =========================================================================

    /// Squares the piece on `from` threatens. Pawns threaten both forward
    /// diagonals whether or not anything stands there; kings never threaten
    /// their castling squares.
    pub fn attacks(&self, from: Square) -> Vec<Square> {
        let Some(piece) = self.piece_at(from) else {
            return Vec::new();
        };
        match piece.piece_type {
            PieceType::Pawn => [-1, 1]
                .iter()
                .filter_map(|&dc| from.offset(piece.color.forward(), dc))
                .collect(),
            PieceType::Knight => piece.potential_moves(from),
            PieceType::King => piece.moved().potential_moves(from),
            PieceType::Bishop | PieceType::Rook | PieceType::Queen => piece
                .potential_moves(from)
                .into_iter()
                .filter(|&to| self.path_clear(from, to))
                .collect(),
        }
    }

    /// Scan every piece of `attacker` for one that reaches `sq`.
    pub fn is_square_attacked_by(&self, sq: Square, attacker: Color) -> bool {
        self.pieces_of(attacker)
            .any(|(from, _)| self.attacks(from).contains(&sq))
    }

    /// Whether `color`'s king is attacked. A side without a king is never in check.
    pub fn is_in_check(&self, color: Color) -> bool {
        self.find_king(color)
            .map(|king| self.is_square_attacked_by(king, color.opposite()))
            .unwrap_or(false)
    }

    // =========================================================================
    // Speculative execution
    // =========================================================================

    /// Whether moving the piece on `from` to `to` keeps its own king out of
    /// check. `also_capture` names an extra square emptied by the move (the
    /// victim of an en passant capture). The board is restored before
    /// returning.
    pub(crate) fn keeps_king_safe(
        &mut self,
        from: Square,
        to: Square,
        also_capture: Option<Square>,
    ) -> bool {
        let Some(color) = self.piece_at(from).map(|p| p.color) else {
            return false;
        };
        let trial = Speculation::begin(self, from, to, also_capture);
        !trial.is_in_check(color)
    }

    /// Check the structural rules every position must satisfy.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        for color in [Color::White, Color::Black] {
            let count = self
                .pieces_of(color)
                .filter(|(_, p)| p.piece_type == PieceType::King)
                .count();
            if count > 1 {
                return Err(InvariantViolation::MultipleKings { color, count });
            }
        }
        Ok(())
    }
}

/// A move applied to the board for inspection only. Dropping it puts every
/// touched cell back, on every exit path.
struct Speculation<'a> {
    board: &'a mut Board,
    from: Square,
    to: Square,
    displaced: Option<Piece>,
    removed: Option<(Square, Piece)>,
}

impl<'a> Speculation<'a> {
    fn begin(board: &'a mut Board, from: Square, to: Square, also_capture: Option<Square>) -> Self {
        let removed = also_capture.and_then(|sq| board.remove(sq).map(|p| (sq, p)));
        let moving = board.remove(from);
        let displaced = board.put(to, moving);
        Speculation {
            board,
            from,
            to,
            displaced,
            removed,
        }
    }
}

impl Deref for Speculation<'_> {
    type Target = Board;

    fn deref(&self) -> &Board {
        &*self.board
    }
}

impl Drop for Speculation<'_> {
    fn drop(&mut self) {
        let moving = self.board.put(self.to, self.displaced.take());
        self.board.put(self.from, moving);
        if let Some((sq, piece)) = self.removed.take() {
            self.board.put(sq, Some(piece));
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..8).rev() {
            for col in 0..8 {
                let c = match self.squares[row][col] {
                    None => '.',
                    Some(p) => {
                        let c = match p.piece_type {
                            PieceType::Pawn => 'p',
                            PieceType::Knight => 'n',
                            PieceType::Bishop => 'b',
                            PieceType::Rook => 'r',
                            PieceType::Queen => 'q',
                            PieceType::King => 'k',
                        };
                        if p.color == Color::White {
                            c.to_ascii_uppercase()
                        } else {
                            c
                        }
                    }
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
