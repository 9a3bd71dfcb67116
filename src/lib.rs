pub mod board;
pub mod error;
pub mod game_state;
pub mod moves;
pub mod piece;
pub mod square;

#[cfg(not(target_arch = "wasm32"))]
pub mod playout;

#[cfg(target_arch = "wasm32")]
mod wasm_api;

pub use board::Board;
pub use error::{InvariantViolation, MoveError};
pub use game_state::GameState;
pub use moves::{Castle, CastleSide, Move, MoveOutcome};
pub use piece::{Color, Piece, PieceType};
pub use square::Square;
