// =============================================================================
// Piece model
//
// Each piece kind knows its movement geometry and nothing about the board.
// `potential_moves` yields every on-board square the piece could reach from
// a given square if the board were empty. Occupancy, path clearance, check
// and castling legality are decided by the board (src/board.rs).
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::square::Square;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row delta of a pawn step.
    pub fn forward(self) -> i32 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Row holding this colour's king and rooks at the start.
    pub fn home_row(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// The far rank where this colour's pawns promote.
    pub fn promotion_row(self) -> usize {
        self.opposite().home_row()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceType::Pawn => "pawn",
            PieceType::Knight => "knight",
            PieceType::Bishop => "bishop",
            PieceType::Rook => "rook",
            PieceType::Queen => "queen",
            PieceType::King => "king",
        };
        f.write_str(name)
    }
}

const STRAIGHT_DIRS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];
const KING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (-1, 0), (-1, 1), (0, -1),
    (0, 1), (1, -1), (1, 0), (1, 1),
];

/// A piece as it sits in a board cell. Its square is the cell itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub piece_type: PieceType,
    pub color: Color,
    /// Set once the piece has made any move. Governs the pawn double step
    /// and castling eligibility.
    pub has_moved: bool,
}

impl Piece {
    pub fn new(piece_type: PieceType, color: Color) -> Self {
        Piece {
            piece_type,
            color,
            has_moved: false,
        }
    }

    /// Same piece, flagged as having moved.
    pub fn moved(self) -> Self {
        Piece {
            has_moved: true,
            ..self
        }
    }

    /// Every square this piece could occupy from `from`, ignoring the board.
    ///
    /// Off-board candidates are dropped here, so callers never see them.
    pub fn potential_moves(&self, from: Square) -> Vec<Square> {
        match self.piece_type {
            PieceType::Pawn => self.pawn_moves(from),
            PieceType::Knight => step_moves(from, &KNIGHT_OFFSETS),
            PieceType::Bishop => ray_moves(from, &DIAGONAL_DIRS),
            PieceType::Rook => ray_moves(from, &STRAIGHT_DIRS),
            PieceType::Queen => {
                let mut moves = ray_moves(from, &STRAIGHT_DIRS);
                moves.extend(ray_moves(from, &DIAGONAL_DIRS));
                moves
            }
            PieceType::King => self.king_moves(from),
        }
    }

    fn pawn_moves(&self, from: Square) -> Vec<Square> {
        let dir = self.color.forward();
        let mut moves = Vec::with_capacity(4);
        moves.extend(from.offset(dir, 0));
        if !self.has_moved {
            moves.extend(from.offset(2 * dir, 0));
        }
        // Diagonals are capture candidates (normal or en passant)
        moves.extend(from.offset(dir, -1));
        moves.extend(from.offset(dir, 1));
        moves
    }

    fn king_moves(&self, from: Square) -> Vec<Square> {
        let mut moves = step_moves(from, &KING_OFFSETS);
        if !self.has_moved {
            // Castling candidates, geometry only
            moves.extend(from.offset(0, 2));
            moves.extend(from.offset(0, -2));
        }
        moves
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.piece_type)
    }
}

fn step_moves(from: Square, offsets: &[(i32, i32)]) -> Vec<Square> {
    offsets
        .iter()
        .filter_map(|&(dr, dc)| from.offset(dr, dc))
        .collect()
}

/// Walk each direction outward until the board edge.
fn ray_moves(from: Square, dirs: &[(i32, i32)]) -> Vec<Square> {
    let mut moves = Vec::new();
    for &(dr, dc) in dirs {
        let mut cur = from.offset(dr, dc);
        while let Some(sq) = cur {
            moves.push(sq);
            cur = sq.offset(dr, dc);
        }
    }
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    fn sq(name: &str) -> Square {
        name.parse().expect("valid square")
    }

    fn set(squares: &[&str]) -> HashSet<Square> {
        squares.iter().map(|s| sq(s)).collect()
    }

    #[test_case(PieceType::Pawn)]
    #[test_case(PieceType::Knight)]
    #[test_case(PieceType::Bishop)]
    #[test_case(PieceType::Rook)]
    #[test_case(PieceType::Queen)]
    #[test_case(PieceType::King)]
    fn potential_moves_never_repeat_or_include_origin(pt: PieceType) {
        for color in [Color::White, Color::Black] {
            for from in Square::all() {
                let moves = Piece::new(pt, color).potential_moves(from);
                let unique: HashSet<Square> = moves.iter().copied().collect();
                assert_eq!(unique.len(), moves.len(), "{pt} on {from} repeats a square");
                assert!(!unique.contains(&from), "{pt} on {from} lists its own square");
            }
        }
    }

    #[test]
    fn pawn_double_step_only_before_first_move() {
        let pawn = Piece::new(PieceType::Pawn, Color::White);
        let fresh: HashSet<Square> = pawn.potential_moves(sq("e2")).into_iter().collect();
        assert_eq!(fresh, set(&["e3", "e4", "d3", "f3"]));

        let moved: HashSet<Square> = pawn.moved().potential_moves(sq("e3")).into_iter().collect();
        assert_eq!(moved, set(&["e4", "d4", "f4"]));
    }

    #[test]
    fn black_pawn_moves_down_the_board() {
        let pawn = Piece::new(PieceType::Pawn, Color::Black);
        let moves: HashSet<Square> = pawn.potential_moves(sq("a7")).into_iter().collect();
        assert_eq!(moves, set(&["a6", "a5", "b6"]), "edge file drops the off-board diagonal");
    }

    #[test]
    fn rook_covers_rank_and_file() {
        let rook = Piece::new(PieceType::Rook, Color::White);
        let moves = rook.potential_moves(sq("d4"));
        assert_eq!(moves.len(), 14);
        assert!(moves.iter().all(|m| m.row() == 3 || m.col() == 3));
    }

    #[test_case("a1", 7)]
    #[test_case("d4", 13)]
    #[test_case("h5", 7)]
    fn bishop_diagonal_count(from: &str, expected: usize) {
        let bishop = Piece::new(PieceType::Bishop, Color::Black);
        assert_eq!(bishop.potential_moves(sq(from)).len(), expected);
    }

    #[test]
    fn queen_is_rook_plus_bishop() {
        let from = sq("c6");
        let queen = Piece::new(PieceType::Queen, Color::White).potential_moves(from);
        let rook = Piece::new(PieceType::Rook, Color::White).potential_moves(from);
        let bishop = Piece::new(PieceType::Bishop, Color::White).potential_moves(from);
        assert_eq!(queen.len(), rook.len() + bishop.len());
    }

    #[test_case("a1", 2)]
    #[test_case("b1", 3)]
    #[test_case("e4", 8)]
    fn knight_offsets_clip(from: &str, expected: usize) {
        let knight = Piece::new(PieceType::Knight, Color::White);
        assert_eq!(knight.potential_moves(sq(from)).len(), expected);
    }

    #[test]
    fn unmoved_king_has_castling_candidates() {
        let king = Piece::new(PieceType::King, Color::White);
        let moves: HashSet<Square> = king.potential_moves(sq("e1")).into_iter().collect();
        assert_eq!(moves, set(&["d1", "f1", "d2", "e2", "f2", "c1", "g1"]));

        let moved: HashSet<Square> = king.moved().potential_moves(sq("e1")).into_iter().collect();
        assert!(!moved.contains(&sq("c1")) && !moved.contains(&sq("g1")));
    }

    #[test]
    fn color_rows() {
        assert_eq!(Color::White.home_row(), 0);
        assert_eq!(Color::White.promotion_row(), 7);
        assert_eq!(Color::Black.promotion_row(), 0);
        assert_eq!(Color::Black.opposite(), Color::White);
    }
}
