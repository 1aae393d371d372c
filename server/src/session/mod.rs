mod actor;
mod commands;
mod handle;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::game::{ChessGame, GameError, GameId};
use crate::notify::GameNotifier;
use crate::persistence::{GameRepository, Persistence, PlayerRepository};
use crate::player::{Player, PlayerId};
use actor::run_game_actor;
pub use commands::{GameCommand, SessionError};
pub use handle::GameHandle;

const COMMAND_BUFFER: usize = 32;

/// Owns the running game actors. Every mutation of a game goes through its
/// actor, so concurrent requests against one game are applied in order; the
/// loser of a race sees the winner's result.
///
/// Actors are spawned from persistence on first use and exit once their
/// game has ended.
pub struct GameManager<D: Persistence> {
    games: RwLock<HashMap<GameId, GameHandle>>,
    store: Arc<D>,
    notifier: Arc<dyn GameNotifier>,
}

impl<D: Persistence> GameManager<D> {
    pub fn new(store: Arc<D>, notifier: Arc<dyn GameNotifier>) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            store,
            notifier,
        }
    }

    /// Start a game between two stored players on behalf of `requester`,
    /// who must be one of them. All checks happen before anything is written.
    pub async fn create_game(
        &self,
        requester: PlayerId,
        white: PlayerId,
        black: PlayerId,
    ) -> Result<ChessGame, SessionError> {
        if requester != white && requester != black {
            return Err(GameError::NotAParticipant(requester).into());
        }
        if white == black {
            return Err(GameError::IllegalGameSetup(format!(
                "player {white} cannot play against themselves"
            ))
            .into());
        }
        let white = self.load_player(white).await?;
        let black = self.load_player(black).await?;

        let game = ChessGame::new(white, black)?;
        let saved = self.store.games().save_game(&game).await?;
        tracing::info!(
            game_id = ?saved.id(),
            white = %saved.white(),
            black = %saved.black(),
            "Game created"
        );
        self.notifier.notify_game_updated(&saved);
        Ok(saved)
    }

    /// Current state of a game, from its actor when one is running.
    pub async fn get_game(&self, id: GameId) -> Result<ChessGame, SessionError> {
        let active = self.games.read().await.get(&id).cloned();
        if let Some(handle) = active {
            if let Ok(game) = handle.get_game().await {
                return Ok(game);
            }
        }
        self.store
            .games()
            .find_game(id)
            .await?
            .ok_or(SessionError::GameNotFound(id))
    }

    pub async fn make_move(
        &self,
        id: GameId,
        player: PlayerId,
        notation: &str,
    ) -> Result<ChessGame, SessionError> {
        let notation = notation.to_string();
        self.with_actor(id, |handle| {
            let notation = notation.clone();
            async move { handle.make_move(player, notation).await }
        })
        .await
    }

    pub async fn resign(&self, id: GameId, player: PlayerId) -> Result<ChessGame, SessionError> {
        self.with_actor(id, |handle| async move { handle.resign(player).await })
            .await
    }

    /// Games the player takes part in, newest first, optionally only open
    /// (`Some(true)`) or only ended (`Some(false)`) ones.
    pub async fn search_games(
        &self,
        player: PlayerId,
        open: Option<bool>,
    ) -> Result<Vec<ChessGame>, SessionError> {
        self.load_player(player).await?;
        Ok(self.store.games().find_by_player(player, open).await?)
    }

    /// Other games that passed through this game's current position.
    pub async fn related_games(&self, id: GameId) -> Result<Vec<ChessGame>, SessionError> {
        let game = self.get_game(id).await?;
        let ids = self
            .store
            .games()
            .find_games_containing_position(&game.position_key(), Some(id))
            .await?;

        let mut related = Vec::with_capacity(ids.len());
        for other in ids {
            if let Some(g) = self.store.games().find_game(other).await? {
                related.push(g);
            }
        }
        Ok(related)
    }

    /// Number of running game actors.
    pub async fn active_games(&self) -> usize {
        self.games.read().await.len()
    }

    /// Stop all game actors.
    pub async fn shutdown(&self) {
        let handles: Vec<GameHandle> = self.games.write().await.drain().map(|(_, h)| h).collect();
        tracing::info!(count = handles.len(), "Shutting down game actors");
        for handle in handles {
            handle.shutdown().await;
        }
    }

    async fn load_player(&self, id: PlayerId) -> Result<Player, SessionError> {
        self.store
            .players()
            .find_player(id)
            .await?
            .ok_or(SessionError::PlayerNotFound(id))
    }

    /// Run a mutating operation on the game's actor. An actor that closed
    /// between lookup and send is replaced once from persistence.
    async fn with_actor<F, Fut>(&self, id: GameId, op: F) -> Result<ChessGame, SessionError>
    where
        F: Fn(GameHandle) -> Fut,
        Fut: Future<Output = Result<ChessGame, SessionError>>,
    {
        for _ in 0..2 {
            let handle = self.actor_for(id).await?;
            match op(handle.clone()).await {
                Err(SessionError::Internal(_)) if handle.is_closed() => {
                    self.forget(&handle).await;
                }
                Ok(game) => {
                    if game.status().is_terminal() {
                        self.forget(&handle).await;
                    }
                    return Ok(game);
                }
                Err(e) => return Err(e),
            }
        }
        Err(SessionError::Internal(format!("game {id} actor unavailable")))
    }

    async fn actor_for(&self, id: GameId) -> Result<GameHandle, SessionError> {
        if let Some(handle) = self.games.read().await.get(&id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let mut games = self.games.write().await;
        if let Some(handle) = games.get(&id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let game = self
            .store
            .games()
            .find_game(id)
            .await?
            .ok_or(SessionError::GameNotFound(id))?;

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run_game_actor(
            game,
            self.store.clone(),
            self.notifier.clone(),
            cmd_rx,
        ));

        let handle = GameHandle::new(id, cmd_tx);
        games.insert(id, handle.clone());
        Ok(handle)
    }

    /// Drop the handle unless it has already been replaced by a newer actor.
    async fn forget(&self, handle: &GameHandle) {
        let mut games = self.games.write().await;
        if games
            .get(&handle.id())
            .is_some_and(|current| current.same_actor(handle))
        {
            games.remove(&handle.id());
        }
    }
}
