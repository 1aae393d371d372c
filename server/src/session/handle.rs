use tokio::sync::{mpsc, oneshot};

use super::commands::{GameCommand, SessionError};
use crate::game::{ChessGame, GameId};
use crate::player::PlayerId;

const ACTOR_CLOSED: &str = "Game actor closed";

/// Cheap, cloneable handle to a game actor.
#[derive(Clone)]
pub struct GameHandle {
    id: GameId,
    cmd_tx: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    pub(crate) fn new(id: GameId, cmd_tx: mpsc::Sender<GameCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    /// True once the actor has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    pub(crate) fn same_actor(&self, other: &GameHandle) -> bool {
        self.cmd_tx.same_channel(&other.cmd_tx)
    }

    pub async fn make_move(
        &self,
        player: PlayerId,
        notation: String,
    ) -> Result<ChessGame, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(GameCommand::MakeMove {
            player,
            notation,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn resign(&self, player: PlayerId) -> Result<ChessGame, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(GameCommand::Resign { player, reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn get_game(&self) -> Result<ChessGame, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(GameCommand::GetGame { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(GameCommand::Shutdown).await;
    }

    async fn send(&self, cmd: GameCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Internal(ACTOR_CLOSED.into()))
    }
}
