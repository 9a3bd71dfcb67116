// =============================================================================
// Game state and move commitment
//
// `GameState` owns the board plus everything the rules remember between
// plies: whose turn it is, a copy of the piece that moved last (for en
// passant), the en passant targets open for the current ply, and both
// sides' check flags.
//
// Flow: the caller selects a square and gets its legal destinations back;
// `apply_move` then commits one of them. A commit runs, in order: capture
// resolution (en passant victim, then normal capture), relocation (king and
// rook together when castling), promotion, last-move snapshot, opponent
// check recomputation, turn flip, en passant reset.
// =============================================================================

use log::{debug, error, trace};
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::{InvariantViolation, MoveError};
use crate::moves::{Castle, CastleSide, Move, MoveOutcome};
use crate::piece::{Color, Piece, PieceType};
use crate::square::Square;

/// Snapshot of the piece that made the previous ply. A copy, so later
/// changes to the live piece cannot alter it.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct LastMove {
    pub piece: Piece,
    pub from: Square,
    pub to: Square,
}

/// A square a pawn of `capturer` may move into this ply, capturing the pawn
/// on `victim`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct EnPassantTarget {
    pub square: Square,
    pub victim: Square,
    pub capturer: Color,
}

/// Where the caller is in the select-then-move cycle.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    AwaitingSelection,
    PieceSelected {
        from: Square,
        destinations: Vec<Square>,
    },
}

/// Decoding goes through [`GameState::from_board`]: the board is validated,
/// check flags are recomputed and the selection and en passant caches start
/// empty.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(try_from = "SavedGame")]
pub struct GameState {
    board: Board,
    side_to_move: Color,
    last_moved: Option<LastMove>,
    en_passant_targets: Vec<EnPassantTarget>,
    check_white: bool,
    check_black: bool,
    castled_rook_square: Option<Square>,
    selection: Selection,
    history: Vec<MoveOutcome>,
}

/// The parts of a serialized game that are kept on load. Derived fields are
/// rebuilt from the position.
#[derive(Deserialize)]
struct SavedGame {
    board: Board,
    side_to_move: Color,
    last_moved: Option<LastMove>,
    castled_rook_square: Option<Square>,
    #[serde(default)]
    history: Vec<MoveOutcome>,
}

impl TryFrom<SavedGame> for GameState {
    type Error = InvariantViolation;

    fn try_from(saved: SavedGame) -> Result<Self, Self::Error> {
        let mut game = GameState::from_board(saved.board, saved.side_to_move)?;
        game.last_moved = saved.last_moved;
        game.castled_rook_square = saved.castled_rook_square;
        game.history = saved.history;
        Ok(game)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// A new game from the standard layout, White to move.
    pub fn new() -> Self {
        GameState {
            board: Board::standard(),
            side_to_move: Color::White,
            last_moved: None,
            en_passant_targets: Vec::new(),
            check_white: false,
            check_black: false,
            castled_rook_square: None,
            selection: Selection::AwaitingSelection,
            history: Vec::new(),
        }
    }

    /// Start from an arbitrary position. Check flags are computed for both
    /// sides; there is no previous move, so no en passant is available.
    pub fn from_board(board: Board, side_to_move: Color) -> Result<Self, InvariantViolation> {
        board.validate()?;
        let check_white = board.is_in_check(Color::White);
        let check_black = board.is_in_check(Color::Black);
        Ok(GameState {
            board,
            side_to_move,
            check_white,
            check_black,
            ..Self::new()
        })
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        match color {
            Color::White => self.check_white,
            Color::Black => self.check_black,
        }
    }

    fn set_check(&mut self, color: Color, in_check: bool) {
        match color {
            Color::White => self.check_white = in_check,
            Color::Black => self.check_black = in_check,
        }
    }

    pub fn last_moved(&self) -> Option<LastMove> {
        self.last_moved
    }

    /// Targets computed by the latest legality query. Empty right after a commit.
    pub fn en_passant_targets(&self) -> &[EnPassantTarget] {
        &self.en_passant_targets
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::AwaitingSelection;
    }

    /// Moves committed so far, oldest first.
    pub fn history(&self) -> &[MoveOutcome] {
        &self.history
    }

    /// Rook square vacated by the latest castle. Reading it clears it.
    pub fn take_castled_rook_square(&mut self) -> Option<Square> {
        self.castled_rook_square.take()
    }

    // =========================================================================
    // Legality queries
    // =========================================================================

    /// Select the piece on `from` and cache its legal destinations.
    ///
    /// Selecting an empty square, or a piece of the side not on move, leaves
    /// nothing selected and returns an empty set.
    pub fn select(&mut self, from: Square) -> &[Square] {
        let destinations = self.compute_destinations(from);
        self.selection = if self.selectable(from) {
            Selection::PieceSelected { from, destinations }
        } else {
            Selection::AwaitingSelection
        };
        match &self.selection {
            Selection::PieceSelected { destinations, .. } => destinations.as_slice(),
            Selection::AwaitingSelection => &[],
        }
    }

    /// Every square the piece on `from` may legally move to.
    pub fn legal_destinations(&mut self, from: Square) -> Vec<Square> {
        self.select(from).to_vec()
    }

    /// All legal moves for the side to move. Does not touch the selection.
    pub fn legal_moves(&mut self) -> Vec<Move> {
        let mut moves = Vec::new();
        for from in self.origins() {
            for to in self.compute_destinations(from) {
                moves.push(Move { from, to });
            }
        }
        moves
    }

    /// Whether the side to move has any legal move. Together with
    /// [`GameState::is_in_check`] this is enough to tell checkmate from
    /// stalemate.
    pub fn has_legal_moves(&mut self) -> bool {
        self.origins()
            .into_iter()
            .any(|from| !self.compute_destinations(from).is_empty())
    }

    /// Squares holding a piece of the side to move.
    fn origins(&self) -> Vec<Square> {
        self.board
            .pieces_of(self.side_to_move)
            .map(|(sq, _)| sq)
            .collect()
    }

    fn selectable(&self, from: Square) -> bool {
        self.board
            .piece_at(from)
            .map(|p| p.color == self.side_to_move)
            .unwrap_or(false)
    }

    fn compute_destinations(&mut self, from: Square) -> Vec<Square> {
        let Some(piece) = self.board.piece_at(from) else {
            return Vec::new();
        };
        if piece.color != self.side_to_move {
            return Vec::new();
        }

        self.refresh_en_passant_targets();
        let targets = self.en_passant_targets.clone();
        let ep_squares: Vec<Square> = targets
            .iter()
            .filter(|t| t.capturer == piece.color)
            .map(|t| t.square)
            .collect();

        let mut legal = Vec::new();
        for to in self.board.reachable(from, &ep_squares) {
            let victim = en_passant_victim(&targets, piece, from, to);
            if self.board.keeps_king_safe(from, to, victim) {
                legal.push(to);
            }
        }
        trace!("{piece} on {from}: {} legal destinations", legal.len());
        legal
    }

    /// Open en passant targets for the side to move, derived from the
    /// snapshot of the previous ply.
    fn refresh_en_passant_targets(&mut self) {
        self.en_passant_targets.clear();
        let Some(last) = self.last_moved else {
            return;
        };
        if last.piece.piece_type != PieceType::Pawn
            || self.board.piece_at(last.to) != Some(last.piece)
            || last.piece.color == self.side_to_move
            || last.from.col() != last.to.col()
            || (last.from.row() as i32 - last.to.row() as i32).abs() != 2
        {
            return;
        }
        let Some(passed) = Square::new((last.from.row() + last.to.row()) / 2, last.to.col()) else {
            return;
        };

        let capturer = self.side_to_move;
        let has_adjacent_pawn = [-1, 1].iter().any(|&dc| {
            last.to
                .offset(0, dc)
                .and_then(|sq| self.board.piece_at(sq))
                .map(|p| p.piece_type == PieceType::Pawn && p.color == capturer)
                .unwrap_or(false)
        });
        if has_adjacent_pawn {
            self.en_passant_targets.push(EnPassantTarget {
                square: passed,
                victim: last.to,
                capturer,
            });
        }
    }

    // =========================================================================
    // Commitment
    // =========================================================================

    /// Commit `from -> to` if it is one of the piece's legal destinations.
    ///
    /// The legal set is recomputed from the position, so it always matches
    /// what `legal_destinations(from)` returns. A rejected move changes
    /// nothing.
    pub fn apply_move(&mut self, from: Square, to: Square) -> Result<MoveOutcome, MoveError> {
        let piece = self.board.piece_at(from).ok_or(MoveError::EmptySquare(from))?;

        if !self.compute_destinations(from).contains(&to) {
            trace!("rejected {piece} {from} -> {to}");
            return Err(MoveError::IllegalMove { from, to });
        }

        let outcome = self.commit(piece, from, to);
        debug!(
            "{} {} -> {}{}",
            outcome.piece,
            from,
            to,
            if outcome.gives_check { " check" } else { "" }
        );
        Ok(outcome)
    }

    fn commit(&mut self, piece: Piece, from: Square, to: Square) -> MoveOutcome {
        let mover = piece.color;
        self.castled_rook_square = None;

        let victim = en_passant_victim(&self.en_passant_targets, piece, from, to);
        let captured = match victim {
            Some(sq) => self.board.remove(sq).map(|p| (sq, p)),
            None => self.board.piece_at(to).map(|p| (to, p)),
        };

        let castle = match piece.piece_type {
            PieceType::King => CastleSide::from_king_step(from, to).and_then(|side| {
                Some(Castle {
                    side,
                    rook_from: from.with_col(side.rook_from_col())?,
                    rook_to: from.with_col(side.rook_to_col())?,
                })
            }),
            _ => None,
        };

        self.board.relocate(from, to);
        if let Some(castle) = castle {
            self.board.relocate(castle.rook_from, castle.rook_to);
            self.castled_rook_square = Some(castle.rook_from);
            debug!("{mover} castles {:?} side", castle.side);
        }

        let promotion = if piece.piece_type == PieceType::Pawn && to.row() == mover.promotion_row() {
            self.board.place(to, Piece::new(PieceType::Queen, mover).moved());
            debug!("{mover} pawn promotes on {to}");
            Some(PieceType::Queen)
        } else {
            None
        };

        self.last_moved = self
            .board
            .piece_at(to)
            .map(|landed| LastMove { piece: landed, from, to });

        // The mover cannot be in check: every legal move passed the king safety filter
        let gives_check = self.board.is_in_check(mover.opposite());
        self.set_check(mover.opposite(), gives_check);
        self.set_check(mover, false);

        self.side_to_move = mover.opposite();
        self.en_passant_targets.clear();
        self.selection = Selection::AwaitingSelection;

        if let Err(violation) = self.board.validate() {
            error!("board invariant broken after {from} -> {to}:\n{}", self.board);
            panic!("engine invariant violated: {violation}");
        }

        let outcome = MoveOutcome {
            mv: Move { from, to },
            piece,
            captured,
            en_passant: victim.is_some(),
            castle,
            promotion,
            gives_check,
        };
        self.history.push(outcome);
        outcome
    }
}

/// Square of the pawn removed if `piece` moving `from -> to` is an en passant capture.
fn en_passant_victim(
    targets: &[EnPassantTarget],
    piece: Piece,
    from: Square,
    to: Square,
) -> Option<Square> {
    if piece.piece_type != PieceType::Pawn || from.col() == to.col() {
        return None;
    }
    targets
        .iter()
        .find(|t| t.square == to && t.capturer == piece.color)
        .map(|t| t.victim)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().expect("valid square")
    }

    /// Play a sequence of "e2e4"-style moves, panicking on the first rejection.
    fn play(game: &mut GameState, moves: &[&str]) {
        for m in moves {
            let (from, to) = m.split_at(2);
            game.apply_move(sq(from), sq(to))
                .unwrap_or_else(|e| panic!("{m} should be legal: {e}"));
        }
    }

    #[test]
    fn selection_state_machine() {
        let mut game = GameState::new();
        assert_eq!(game.selection(), &Selection::AwaitingSelection);

        let dests = game.select(sq("g1")).to_vec();
        assert_eq!(dests.len(), 2);
        assert_eq!(
            game.selection(),
            &Selection::PieceSelected {
                from: sq("g1"),
                destinations: dests
            }
        );

        assert!(game.select(sq("e4")).is_empty(), "empty square");
        assert_eq!(game.selection(), &Selection::AwaitingSelection);

        game.select(sq("e2"));
        game.apply_move(sq("e2"), sq("e4")).expect("legal");
        assert_eq!(game.selection(), &Selection::AwaitingSelection);
    }

    #[test]
    fn opponent_pieces_have_no_destinations() {
        let mut game = GameState::new();
        assert!(game.legal_destinations(sq("e7")).is_empty());
        assert_eq!(
            game.apply_move(sq("e7"), sq("e5")),
            Err(MoveError::IllegalMove {
                from: sq("e7"),
                to: sq("e5")
            })
        );
    }

    #[test]
    fn rejected_move_changes_nothing() {
        let mut game = GameState::new();
        play(&mut game, &["e2e4"]);
        let before = game.clone();

        assert_eq!(
            game.apply_move(sq("e4"), sq("e5")),
            Err(MoveError::IllegalMove {
                from: sq("e4"),
                to: sq("e5")
            }),
            "white pawn is not black's to move"
        );
        assert_eq!(game.apply_move(sq("d5"), sq("d4")), Err(MoveError::EmptySquare(sq("d5"))));
        assert_eq!(game.board(), before.board());
        assert_eq!(game.side_to_move(), Color::Black);
        assert_eq!(game.history().len(), 1);
    }

    #[test]
    fn turn_alternates_and_history_grows() {
        let mut game = GameState::new();
        play(&mut game, &["e2e4", "e7e5", "g1f3"]);
        assert_eq!(game.side_to_move(), Color::Black);
        let moves: Vec<String> = game.history().iter().map(|o| o.mv.to_string()).collect();
        assert_eq!(moves, ["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn pinned_piece_cannot_leave_the_line() {
        let mut board = Board::empty();
        board.place(sq("e1"), Piece::new(PieceType::King, Color::White));
        board.place(sq("e2"), Piece::new(PieceType::Knight, Color::White));
        board.place(sq("d2"), Piece::new(PieceType::Rook, Color::White));
        board.place(sq("e7"), Piece::new(PieceType::Rook, Color::Black));
        board.place(sq("a8"), Piece::new(PieceType::King, Color::Black));
        let mut game = GameState::from_board(board, Color::White).expect("valid position");

        assert!(game.legal_destinations(sq("e2")).is_empty(), "knight is pinned");
        assert!(!game.legal_destinations(sq("d2")).is_empty(), "rook is free");
    }

    #[test]
    fn king_cannot_step_into_attack() {
        let mut board = Board::empty();
        board.place(sq("e1"), Piece::new(PieceType::King, Color::White).moved());
        board.place(sq("d8"), Piece::new(PieceType::Rook, Color::Black));
        board.place(sq("h8"), Piece::new(PieceType::King, Color::Black));
        let mut game = GameState::from_board(board, Color::White).expect("valid position");

        let dests = game.legal_destinations(sq("e1"));
        assert!(!dests.contains(&sq("d1")));
        assert!(!dests.contains(&sq("d2")));
        assert!(dests.contains(&sq("f2")));
    }

    #[test]
    fn check_flags_follow_the_position() {
        let mut game = GameState::new();
        play(&mut game, &["e2e4", "f7f6", "d1h5"]);
        assert!(game.is_in_check(Color::Black));
        assert!(!game.is_in_check(Color::White));
        assert!(game.history().last().map(|o| o.gives_check).unwrap_or(false));

        play(&mut game, &["g7g6"]);
        assert!(!game.is_in_check(Color::Black), "block clears the flag");
    }

    #[test]
    fn from_board_computes_both_flags() {
        let mut board = Board::empty();
        board.place(sq("e1"), Piece::new(PieceType::King, Color::White));
        board.place(sq("e8"), Piece::new(PieceType::King, Color::Black));
        board.place(sq("e5"), Piece::new(PieceType::Queen, Color::Black));
        let game = GameState::from_board(board, Color::White).expect("valid position");
        assert!(game.is_in_check(Color::White));
        assert!(!game.is_in_check(Color::Black));
    }

    #[test]
    fn from_board_rejects_two_kings() {
        let mut board = Board::standard();
        board.place(sq("e4"), Piece::new(PieceType::King, Color::Black));
        assert!(matches!(
            GameState::from_board(board, Color::White),
            Err(InvariantViolation::MultipleKings { color: Color::Black, .. })
        ));
    }

    #[test]
    fn stale_selection_cannot_admit_a_move() {
        let mut game = GameState::new();
        game.selection = Selection::PieceSelected {
            from: sq("e2"),
            destinations: vec![sq("e6")],
        };
        let before_board = game.board().clone();

        assert_eq!(
            game.apply_move(sq("e2"), sq("e6")),
            Err(MoveError::IllegalMove {
                from: sq("e2"),
                to: sq("e6")
            })
        );
        assert_eq!(game.board(), &before_board);
        assert_eq!(game.side_to_move(), Color::White);
        assert!(game.history().is_empty());
    }

    #[test]
    fn decoding_rebuilds_derived_state() {
        let mut json = serde_json::to_value(GameState::new()).expect("encodes");
        json["selection"] = serde_json::to_value(Selection::PieceSelected {
            from: sq("e2"),
            destinations: vec![sq("e6")],
        })
        .expect("encodes");
        json["check_white"] = serde_json::Value::Bool(true);

        let mut game: GameState = serde_json::from_value(json).expect("valid position");
        assert_eq!(game.selection(), &Selection::AwaitingSelection);
        assert!(!game.is_in_check(Color::White), "flag recomputed from the board");
        assert!(game.apply_move(sq("e2"), sq("e6")).is_err());
        assert_eq!(game.side_to_move(), Color::White);
        play(&mut game, &["e2e4"]);
    }

    #[test]
    fn decoding_keeps_the_move_record() {
        let mut game = GameState::new();
        play(&mut game, &["e2e4", "e7e5"]);

        let json = serde_json::to_string(&game).expect("encodes");
        let restored: GameState = serde_json::from_str(&json).expect("decodes");
        assert_eq!(restored.side_to_move(), Color::White);
        assert_eq!(restored.last_moved(), game.last_moved());
        assert_eq!(restored.history(), game.history());
        assert_eq!(restored.board(), game.board());
    }

    #[test]
    fn decoding_rejects_two_kings() {
        let mut board = Board::standard();
        board.place(sq("e4"), Piece::new(PieceType::King, Color::Black));
        let mut json = serde_json::to_value(GameState::new()).expect("encodes");
        json["board"] = serde_json::to_value(&board).expect("encodes");

        let err = serde_json::from_value::<GameState>(json).unwrap_err();
        assert!(err.to_string().contains("2 kings"), "unexpected error: {err}");
    }

    #[test]
    fn en_passant_needs_the_double_stepped_pawn_in_place() {
        let mut board = Board::empty();
        board.place(sq("e1"), Piece::new(PieceType::King, Color::White));
        board.place(sq("e8"), Piece::new(PieceType::King, Color::Black));
        board.place(sq("d5"), Piece::new(PieceType::Pawn, Color::White).moved());
        board.place(sq("e5"), Piece::new(PieceType::Knight, Color::Black).moved());
        let mut game = GameState::from_board(board, Color::White).expect("valid position");
        game.last_moved = Some(LastMove {
            piece: Piece::new(PieceType::Pawn, Color::Black).moved(),
            from: sq("e7"),
            to: sq("e5"),
        });

        assert_eq!(game.legal_destinations(sq("d5")), vec![sq("d6")]);
        assert!(game.en_passant_targets().is_empty());
    }

    #[test]
    fn last_moved_is_a_snapshot() {
        let mut game = GameState::new();
        play(&mut game, &["g1f3"]);
        let last = game.last_moved().expect("a move was made");
        assert_eq!(last.from, sq("g1"));
        assert_eq!(last.to, sq("f3"));
        assert_eq!(last.piece.piece_type, PieceType::Knight);
        assert!(last.piece.has_moved);
    }

    #[test]
    fn en_passant_window_lasts_one_ply() {
        let mut game = GameState::new();
        play(&mut game, &["e2e4", "a7a6", "e4e5", "d7d5"]);
        assert!(game.legal_destinations(sq("e5")).contains(&sq("d6")));
        assert_eq!(game.en_passant_targets().len(), 1);

        play(&mut game, &["h2h3"]);
        assert!(game.en_passant_targets().is_empty(), "cleared on commit");
        play(&mut game, &["a6a5"]);
        assert!(!game.legal_destinations(sq("e5")).contains(&sq("d6")));
    }

    #[test]
    fn en_passant_not_offered_after_single_steps() {
        let mut game = GameState::new();
        play(&mut game, &["e2e4", "d7d6", "e4e5", "d6d5"]);
        assert!(!game.legal_destinations(sq("e5")).contains(&sq("d6")));
    }

    #[test]
    fn castled_rook_slot_clears_on_read() {
        let mut game = GameState::new();
        play(&mut game, &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "e1g1"]);
        assert_eq!(game.take_castled_rook_square(), Some(sq("h1")));
        assert_eq!(game.take_castled_rook_square(), None);
    }

    #[test]
    fn castled_rook_slot_only_reflects_latest_move() {
        let mut game = GameState::new();
        play(&mut game, &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "e1g1", "f8c5"]);
        assert_eq!(game.take_castled_rook_square(), None);
    }

    #[test]
    fn promotion_by_capture() {
        let mut board = Board::empty();
        board.place(sq("e1"), Piece::new(PieceType::King, Color::White));
        board.place(sq("h3"), Piece::new(PieceType::King, Color::Black));
        board.place(sq("b2"), Piece::new(PieceType::Pawn, Color::Black).moved());
        board.place(sq("a1"), Piece::new(PieceType::Rook, Color::White));
        let mut game = GameState::from_board(board, Color::Black).expect("valid position");

        let outcome = game.apply_move(sq("b2"), sq("a1")).expect("capture promotes");
        assert_eq!(outcome.promotion, Some(PieceType::Queen));
        assert_eq!(outcome.capture_square(), Some(sq("a1")));
        assert_eq!(
            game.board().piece_at(sq("a1")).map(|p| (p.piece_type, p.color)),
            Some((PieceType::Queen, Color::Black))
        );
        assert!(game.is_in_check(Color::White), "queen on a1 sees e1 along the rank");
    }

    #[test]
    fn checkmate_is_detectable() {
        let mut game = GameState::new();
        play(&mut game, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert!(game.is_in_check(Color::White));
        assert!(!game.has_legal_moves());
        assert!(game.legal_moves().is_empty());
    }

    #[test]
    fn stalemate_is_detectable() {
        let mut board = Board::empty();
        board.place(sq("a8"), Piece::new(PieceType::King, Color::Black).moved());
        board.place(sq("b6"), Piece::new(PieceType::Queen, Color::White));
        board.place(sq("c1"), Piece::new(PieceType::King, Color::White).moved());
        let mut game = GameState::from_board(board, Color::Black).expect("valid position");
        assert!(!game.is_in_check(Color::Black));
        assert!(!game.has_legal_moves());
    }

    #[test]
    fn opening_has_twenty_moves() {
        let mut game = GameState::new();
        assert_eq!(game.legal_moves().len(), 20);
        assert!(game.has_legal_moves());
    }
}
