//! The game aggregate: two players, an append-only move list and a status
//! that only ever moves from open to one of the terminal states.

use std::fmt;

use chess::{MoveClass, MoveError, PlayerSide};
use serde::{Deserialize, Serialize};

use crate::persistence::now_timestamp;
use crate::player::{Player, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub i64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Open,
    EndedCheckmate,
    EndedResignation,
    EndedDraw,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::EndedCheckmate => "ENDED_CHECKMATE",
            Self::EndedResignation => "ENDED_RESIGNATION",
            Self::EndedDraw => "ENDED_DRAW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(Self::Open),
            "ENDED_CHECKMATE" => Some(Self::EndedCheckmate),
            "ENDED_RESIGNATION" => Some(Self::EndedResignation),
            "ENDED_DRAW" => Some(Self::EndedDraw),
            _ => None,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded ply. `san` is the canonical notation produced by the engine,
/// whatever form the caller submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChessMove {
    pub ply: u32,
    pub san: String,
    pub fen_after: String,
    pub position_key: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    InvalidMove(#[from] MoveError),
    #[error("Wrong turn: {expected} is to move")]
    WrongTurn { expected: PlayerSide },
    #[error("Game has already ended ({0})")]
    GameEnded(GameStatus),
    #[error("Player {0} does not take part in this game")]
    NotAParticipant(PlayerId),
    #[error("Illegal game setup: {0}")]
    IllegalGameSetup(String),
}

/// Everything persisted about a game, as loaded back from storage.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub id: GameId,
    pub white: Player,
    pub black: Player,
    pub start_date: u64,
    pub status: GameStatus,
    pub loser: Option<PlayerSide>,
    pub source: Option<String>,
    pub moves: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ChessGame {
    id: Option<GameId>,
    white: Player,
    black: Player,
    moves: Vec<ChessMove>,
    start_date: u64,
    status: GameStatus,
    loser: Option<PlayerSide>,
    source: Option<String>,
    board: chess::Game,
}

impl ChessGame {
    /// A fresh open game. Both seats must be taken by different players.
    pub fn new(white: Player, black: Player) -> Result<Self, GameError> {
        if white.id == black.id {
            return Err(GameError::IllegalGameSetup(format!(
                "{} cannot play against themselves",
                white.display_name
            )));
        }
        Ok(Self {
            id: None,
            white,
            black,
            moves: Vec::new(),
            start_date: now_timestamp(),
            status: GameStatus::Open,
            loser: None,
            source: None,
            board: chess::Game::new(),
        })
    }

    /// Label the game with the archive it was imported from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Rebuild a stored game by replaying its moves.
    pub fn restore(record: GameRecord) -> Result<Self, GameError> {
        let mut game = Self::new(record.white, record.black)?;
        for san in &record.moves {
            game.push_move(san)?;
        }
        game.id = Some(record.id);
        game.start_date = record.start_date;
        game.status = record.status;
        game.loser = record.loser;
        game.source = record.source;
        Ok(game)
    }

    pub fn id(&self) -> Option<GameId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: GameId) {
        self.id = Some(id);
    }

    pub fn white(&self) -> &Player {
        &self.white
    }

    pub fn black(&self) -> &Player {
        &self.black
    }

    pub fn moves(&self) -> &[ChessMove] {
        &self.moves
    }

    pub fn start_date(&self) -> u64 {
        self.start_date
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Side recorded as having lost, for checkmate and resignation.
    pub fn loser(&self) -> Option<PlayerSide> {
        self.loser
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn fen(&self) -> String {
        self.board.to_fen()
    }

    pub fn position_key(&self) -> String {
        self.board.position_key()
    }

    pub fn next_side(&self) -> PlayerSide {
        self.board.side_to_move()
    }

    pub fn next_player(&self) -> &Player {
        self.player(self.next_side())
    }

    pub fn player(&self, side: PlayerSide) -> &Player {
        match side {
            PlayerSide::White => &self.white,
            PlayerSide::Black => &self.black,
        }
    }

    pub fn side_of(&self, player: PlayerId) -> Option<PlayerSide> {
        if player == self.white.id {
            Some(PlayerSide::White)
        } else if player == self.black.id {
            Some(PlayerSide::Black)
        } else {
            None
        }
    }

    pub fn is_participant(&self, player: PlayerId) -> bool {
        self.side_of(player).is_some()
    }

    /// Open and waiting for a robot to move.
    pub fn is_robot_turn(&self) -> bool {
        self.status == GameStatus::Open && self.next_player().is_robot()
    }

    /// Play `notation` for `player`. On any error the game is unchanged.
    pub fn play(&mut self, player: PlayerId, notation: &str) -> Result<&ChessMove, GameError> {
        self.ensure_open()?;
        let side = self
            .side_of(player)
            .ok_or(GameError::NotAParticipant(player))?;
        let expected = self.next_side();
        if side != expected {
            return Err(GameError::WrongTurn { expected });
        }

        let class = self.push_move(notation)?;
        match class {
            MoveClass::Checkmate => {
                self.status = GameStatus::EndedCheckmate;
                self.loser = Some(side.opposite());
            }
            MoveClass::Stalemate => self.status = GameStatus::EndedDraw,
            _ => {}
        }

        let last = self.moves.len() - 1;
        Ok(&self.moves[last])
    }

    /// End the game with `player` recorded as the loser.
    pub fn resign(&mut self, player: PlayerId) -> Result<(), GameError> {
        self.ensure_open()?;
        let side = self
            .side_of(player)
            .ok_or(GameError::NotAParticipant(player))?;
        self.status = GameStatus::EndedResignation;
        self.loser = Some(side);
        Ok(())
    }

    pub fn declare_draw(&mut self) -> Result<(), GameError> {
        self.ensure_open()?;
        self.status = GameStatus::EndedDraw;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), GameError> {
        if self.status.is_terminal() {
            Err(GameError::GameEnded(self.status))
        } else {
            Ok(())
        }
    }

    fn push_move(&mut self, notation: &str) -> Result<MoveClass, GameError> {
        let entry = self.board.play_san(notation)?;
        self.moves.push(ChessMove {
            ply: self.moves.len() as u32 + 1,
            san: entry.san,
            fen_after: entry.fen_after,
            position_key: entry.position_key,
        });
        Ok(entry.class)
    }
}
