use cozy_chess::{Board, Move, Piece};

use crate::fen::{format_fen, parse_fen, position_key, FenError};
use crate::pgn::san::{format_san, is_capture, is_castling, legal_moves, parse_san, MoveError};
use crate::types::PlayerSide;

/// Board state plus the moves that produced it.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<HistoryEntry>,
    start_position: StartPosition,
}

/// A move that has been applied, with its canonical notation and effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub mv: Move,
    pub san: String,
    pub piece: Piece,
    pub side: PlayerSide,
    pub captured: Option<Piece>,
    pub class: MoveClass,
    pub fen_after: String,
    pub position_key: String,
}

/// What a legal move did to the game. Higher variants take precedence, so a
/// capturing mate is `Checkmate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MoveClass {
    Normal,
    Capture,
    Check,
    Stalemate,
    Checkmate,
}

/// Starting position of the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPosition {
    Standard,
    Fen(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate { loser: PlayerSide },
    Stalemate,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self {
            position: Board::default(),
            history: Vec::new(),
            start_position: StartPosition::Standard,
        }
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let position = parse_fen(fen)?;
        Ok(Self {
            position,
            history: Vec::new(),
            start_position: StartPosition::Fen(fen.to_string()),
        })
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn start_position(&self) -> &StartPosition {
        &self.start_position
    }

    pub fn side_to_move(&self) -> PlayerSide {
        self.position.side_to_move().into()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        legal_moves(&self.position)
    }

    pub fn is_check(&self) -> bool {
        !self.position.checkers().is_empty()
    }

    /// Checkmate iff the side to move is in check and has no legal reply.
    pub fn status(&self) -> GameStatus {
        let mut any_move = false;
        self.position.generate_moves(|_| {
            any_move = true;
            true
        });
        if any_move {
            GameStatus::Ongoing
        } else if self.is_check() {
            GameStatus::Checkmate {
                loser: self.side_to_move(),
            }
        } else {
            GameStatus::Stalemate
        }
    }

    /// Resolve a SAN token against the current position and apply it.
    /// On error the position is left untouched.
    pub fn play_san(&mut self, token: &str) -> Result<HistoryEntry, MoveError> {
        let mv = parse_san(&self.position, token)?;
        Ok(self.apply(mv))
    }

    /// Apply an already-resolved move.
    pub fn play(&mut self, mv: Move) -> Result<HistoryEntry, MoveError> {
        if !self.legal_moves().contains(&mv) {
            return Err(MoveError::new(
                &format!("{}{}", chess_common::format_square(mv.from), chess_common::format_square(mv.to)),
                crate::pgn::san::MoveErrorReason::NoSuchMove,
            ));
        }
        Ok(self.apply(mv))
    }

    pub fn to_fen(&self) -> String {
        format_fen(&self.position)
    }

    pub fn position_key(&self) -> String {
        position_key(&self.position)
    }

    fn apply(&mut self, mv: Move) -> HistoryEntry {
        let before = &self.position;
        let side: PlayerSide = before.side_to_move().into();
        let piece = before.piece_on(mv.from).unwrap_or(Piece::Pawn);
        let captured = if is_castling(before, mv) {
            None
        } else if is_capture(before, mv) {
            // en passant leaves the target square empty
            Some(before.piece_on(mv.to).unwrap_or(Piece::Pawn))
        } else {
            None
        };
        let san = format_san(before, mv);

        self.position.play_unchecked(mv);

        let class = match self.status() {
            GameStatus::Checkmate { .. } => MoveClass::Checkmate,
            GameStatus::Stalemate => MoveClass::Stalemate,
            GameStatus::Ongoing if self.is_check() => MoveClass::Check,
            GameStatus::Ongoing if captured.is_some() => MoveClass::Capture,
            GameStatus::Ongoing => MoveClass::Normal,
        };

        let entry = HistoryEntry {
            mv,
            san,
            piece,
            side,
            captured,
            class,
            fen_after: self.to_fen(),
            position_key: self.position_key(),
        };
        self.history.push(entry.clone());
        entry
    }
}
