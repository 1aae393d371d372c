//! SQLite-backed repository for players.

use sqlx::SqlitePool;

use super::helpers::PlayerRow;
use crate::persistence::traits::PlayerRepository;
use crate::persistence::{now_timestamp, PersistenceError};
use crate::player::{NewPlayer, Player, PlayerId};

const SELECT_PLAYER: &str = r#"
    SELECT player_id, display_name, kind, robot_engine, created_at
    FROM players
"#;

/// SQLite implementation of [`PlayerRepository`].
#[derive(Clone)]
pub struct SqlitePlayerRepository {
    pool: SqlitePool,
}

impl SqlitePlayerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl PlayerRepository for SqlitePlayerRepository {
    async fn find_player(&self, id: PlayerId) -> Result<Option<Player>, PersistenceError> {
        let row: Option<PlayerRow> = sqlx::query_as(&format!("{SELECT_PLAYER} WHERE player_id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Player::try_from).transpose()
    }

    async fn find_by_display_name(&self, name: &str) -> Result<Option<Player>, PersistenceError> {
        let row: Option<PlayerRow> =
            sqlx::query_as(&format!("{SELECT_PLAYER} WHERE display_name = ?"))
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Player::try_from).transpose()
    }

    async fn save_player(&self, player: &NewPlayer) -> Result<Player, PersistenceError> {
        let created_at = now_timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO players (display_name, kind, robot_engine, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&player.display_name)
        .bind(player.kind.as_str())
        .bind(&player.robot_engine)
        .bind(created_at as i64)
        .execute(&self.pool)
        .await?;

        Ok(player
            .clone()
            .into_player(PlayerId(result.last_insert_rowid()), created_at))
    }

    async fn insert_external_if_absent(&self, name: &str) -> Result<Option<Player>, PersistenceError> {
        let player = NewPlayer::external(name);
        let created_at = now_timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO players (display_name, kind, robot_engine, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (display_name) DO NOTHING
            "#,
        )
        .bind(&player.display_name)
        .bind(player.kind.as_str())
        .bind(&player.robot_engine)
        .bind(created_at as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(
            player.into_player(PlayerId(result.last_insert_rowid()), created_at),
        ))
    }

    async fn count_players(&self) -> Result<u64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
