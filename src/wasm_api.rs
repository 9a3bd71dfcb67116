use crate::game_state::GameState;
use crate::moves::MoveOutcome;
use crate::piece::{Color, PieceType};
use crate::square::Square;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct SquarePiece {
    piece_type: String,
    color: String,
}

#[derive(Serialize)]
struct BoardState {
    squares: Vec<Vec<Option<SquarePiece>>>,
    current_turn: String,
    white_in_check: bool,
    black_in_check: bool,
    has_legal_moves: bool,
    last_move: Option<[[usize; 2]; 2]>,
}

#[derive(Serialize)]
struct OutcomeJson {
    from: [usize; 2],
    to: [usize; 2],
    captured: Option<[usize; 2]>,
    en_passant: bool,
    rook_from: Option<[usize; 2]>,
    rook_to: Option<[usize; 2]>,
    promotion: Option<String>,
    gives_check: bool,
}

#[derive(Serialize)]
struct MoveResult {
    #[serde(flatten)]
    board_state: Option<BoardState>,
    outcome: Option<OutcomeJson>,
    error: Option<String>,
}

fn piece_type_to_string(pt: PieceType) -> String {
    match pt {
        PieceType::King => "King".to_string(),
        PieceType::Queen => "Queen".to_string(),
        PieceType::Rook => "Rook".to_string(),
        PieceType::Bishop => "Bishop".to_string(),
        PieceType::Knight => "Knight".to_string(),
        PieceType::Pawn => "Pawn".to_string(),
    }
}

fn color_to_string(c: Color) -> String {
    match c {
        Color::White => "White".to_string(),
        Color::Black => "Black".to_string(),
    }
}

fn coords(sq: Square) -> [usize; 2] {
    [sq.row(), sq.col()]
}

fn outcome_json(outcome: &MoveOutcome) -> OutcomeJson {
    OutcomeJson {
        from: coords(outcome.mv.from),
        to: coords(outcome.mv.to),
        captured: outcome.capture_square().map(coords),
        en_passant: outcome.en_passant,
        rook_from: outcome.castle.map(|c| coords(c.rook_from)),
        rook_to: outcome.castle.map(|c| coords(c.rook_to)),
        promotion: outcome.promotion.map(piece_type_to_string),
        gives_check: outcome.gives_check,
    }
}

fn build_board_state(game: &mut GameState) -> BoardState {
    let board = game.board();
    let squares: Vec<Vec<Option<SquarePiece>>> = (0..8)
        .map(|r| {
            (0..8)
                .map(|c| {
                    Square::new(r, c)
                        .and_then(|sq| board.piece_at(sq))
                        .map(|p| SquarePiece {
                            piece_type: piece_type_to_string(p.piece_type),
                            color: color_to_string(p.color),
                        })
                })
                .collect()
        })
        .collect();

    BoardState {
        squares,
        current_turn: color_to_string(game.side_to_move()),
        white_in_check: game.is_in_check(Color::White),
        black_in_check: game.is_in_check(Color::Black),
        last_move: game.last_moved().map(|m| [coords(m.from), coords(m.to)]),
        has_legal_moves: game.has_legal_moves(),
    }
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

#[wasm_bindgen]
pub struct Game {
    state: GameState,
}

#[wasm_bindgen]
impl Game {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Game {
        Game {
            state: GameState::new(),
        }
    }

    pub fn get_board_state(&mut self) -> JsValue {
        let state = build_board_state(&mut self.state);
        to_js(&state)
    }

    /// Select a square and return its legal destinations as `[row, col]` pairs.
    pub fn legal_destinations(&mut self, row: usize, col: usize) -> JsValue {
        let destinations: Vec<[usize; 2]> = match Square::new(row, col) {
            Some(sq) => self.state.legal_destinations(sq).into_iter().map(coords).collect(),
            None => Vec::new(),
        };
        to_js(&destinations)
    }

    pub fn make_move(&mut self, from_row: usize, from_col: usize, to_row: usize, to_col: usize) -> JsValue {
        let (Some(from), Some(to)) = (Square::new(from_row, from_col), Square::new(to_row, to_col)) else {
            return to_js(&MoveResult {
                board_state: None,
                outcome: None,
                error: Some("Square off the board".to_string()),
            });
        };

        match self.state.apply_move(from, to) {
            Ok(outcome) => to_js(&MoveResult {
                board_state: Some(build_board_state(&mut self.state)),
                outcome: Some(outcome_json(&outcome)),
                error: None,
            }),
            Err(e) => to_js(&MoveResult {
                board_state: None,
                outcome: None,
                error: Some(e.to_string()),
            }),
        }
    }

    /// Rook square vacated by the latest castle, `null` once read.
    pub fn take_castled_rook_square(&mut self) -> JsValue {
        to_js(&self.state.take_castled_rook_square().map(coords))
    }
}
