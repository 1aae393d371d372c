//! SQLite-backed repository implementations.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**, which allows one writer and multiple concurrent readers.
//! - **Foreign keys enabled**, enforced at the connection level.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/001_initial_schema.sql`
//!   automatically when [`Database::open`] is called. The schema is idempotent.
//!
//! ## Repository types
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqlitePlayerRepository`] | `PlayerRepository` |
//! | [`SqliteGameRepository`] | `GameRepository` |
//!
//! [`SqlitePersistence`] bundles both behind the `Persistence` trait.
//!
//! Moves are stored as canonical SAN together with the FEN and position key
//! after each ply; loading a game replays the SAN through the engine.

mod database;
mod game_repo;
pub(crate) mod helpers;
#[cfg(test)]
mod integration_tests;
mod player_repo;

pub use database::Database;
pub use game_repo::SqliteGameRepository;
pub use player_repo::SqlitePlayerRepository;

use crate::persistence::Persistence;

/// The SQLite storage backend.
#[derive(Clone)]
pub struct SqlitePersistence {
    players: SqlitePlayerRepository,
    games: SqliteGameRepository,
}

impl SqlitePersistence {
    pub fn new(db: &Database) -> Self {
        Self {
            players: SqlitePlayerRepository::new(db.pool().clone()),
            games: SqliteGameRepository::new(db.pool().clone()),
        }
    }
}

impl Persistence for SqlitePersistence {
    type Players = SqlitePlayerRepository;
    type Games = SqliteGameRepository;

    fn players(&self) -> &Self::Players {
        &self.players
    }

    fn games(&self) -> &Self::Games {
        &self.games
    }
}
