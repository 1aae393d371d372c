use tokio::sync::oneshot;

use crate::game::{ChessGame, GameError, GameId};
use crate::persistence::PersistenceError;
use crate::player::PlayerId;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A chess or game-state rule refused the operation.
    #[error(transparent)]
    Rejected(#[from] GameError),
    #[error("Game not found: {0}")]
    GameNotFound(GameId),
    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// The rule violation behind a rejected operation, if that is what this is.
    pub fn rejection(&self) -> Option<&GameError> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

/// Commands sent to a game actor. Each embeds a oneshot for the reply.
pub enum GameCommand {
    MakeMove {
        player: PlayerId,
        notation: String,
        reply: oneshot::Sender<Result<ChessGame, SessionError>>,
    },
    Resign {
        player: PlayerId,
        reply: oneshot::Sender<Result<ChessGame, SessionError>>,
    },
    GetGame {
        reply: oneshot::Sender<ChessGame>,
    },
    Shutdown,
}
