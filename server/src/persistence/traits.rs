//! Async repository trait definitions for the persistence layer.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send`, which `tokio::spawn` requires of the
//! game actors and background jobs built on them.

use std::future::Future;

use super::PersistenceError;
use crate::game::{ChessGame, GameId, GameStatus};
use crate::player::{NewPlayer, Player, PlayerId};

/// Repository for players.
///
/// Display names are unique across all player kinds.
pub trait PlayerRepository: Send + Sync {
    fn find_player(
        &self,
        id: PlayerId,
    ) -> impl Future<Output = Result<Option<Player>, PersistenceError>> + Send;
    fn find_by_display_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Player>, PersistenceError>> + Send;
    /// Store a new player. A taken name fails with [`PersistenceError::Conflict`].
    fn save_player(
        &self,
        player: &NewPlayer,
    ) -> impl Future<Output = Result<Player, PersistenceError>> + Send;
    /// Insert an external player unless the name is taken. Returns the new
    /// player, or `None` when a player with that name already exists.
    fn insert_external_if_absent(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Player>, PersistenceError>> + Send;
    fn count_players(&self) -> impl Future<Output = Result<u64, PersistenceError>> + Send;
}

/// Repository for games with their move lists.
///
/// Implementations must store moves atomically with the game row.
pub trait GameRepository: Send + Sync {
    fn find_game(
        &self,
        id: GameId,
    ) -> impl Future<Output = Result<Option<ChessGame>, PersistenceError>> + Send;
    /// Insert a game without an id, or bring a stored one up to date by
    /// appending its new moves and writing its status. Returns the game with
    /// its id assigned.
    fn save_game(
        &self,
        game: &ChessGame,
    ) -> impl Future<Output = Result<ChessGame, PersistenceError>> + Send;
    fn find_all_by_status(
        &self,
        status: GameStatus,
    ) -> impl Future<Output = Result<Vec<ChessGame>, PersistenceError>> + Send;
    /// Games the player takes part in, newest first. `open` filters to open
    /// (`Some(true)`) or ended (`Some(false)`) games.
    fn find_by_player(
        &self,
        player: PlayerId,
        open: Option<bool>,
    ) -> impl Future<Output = Result<Vec<ChessGame>, PersistenceError>> + Send;
    /// Ids of games that passed through the position, excluding `exclude`.
    fn find_games_containing_position(
        &self,
        position_key: &str,
        exclude: Option<GameId>,
    ) -> impl Future<Output = Result<Vec<GameId>, PersistenceError>> + Send;
    fn count_games(&self) -> impl Future<Output = Result<u64, PersistenceError>> + Send;
}

/// A complete storage backend, selected statically by the services that use it.
pub trait Persistence: Send + Sync + 'static {
    type Players: PlayerRepository;
    type Games: GameRepository;

    fn players(&self) -> &Self::Players;
    fn games(&self) -> &Self::Games;
}
