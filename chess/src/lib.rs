pub mod fen;
pub mod game;
pub mod pgn;
pub mod types;

pub use chess_common::*;
pub use fen::{FenError, STARTING_FEN};
pub use game::{Game, GameStatus, HistoryEntry, MoveClass, StartPosition};
pub use pgn::{MoveError, MoveErrorReason, PgnError, PgnGame, PgnReader, PgnResult};
pub use types::PlayerSide;

#[cfg(test)]
mod proptests;
