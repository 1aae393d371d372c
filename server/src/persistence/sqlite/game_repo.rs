//! SQLite-backed repository for games and their moves.

use sqlx::SqlitePool;

use super::helpers::{decode_kind, decode_side, decode_status};
use crate::game::{ChessGame, GameId, GameRecord, GameStatus};
use crate::persistence::traits::GameRepository;
use crate::persistence::{now_timestamp, PersistenceError};
use crate::player::{Player, PlayerId};

const SELECT_GAME: &str = r#"
    SELECT g.game_id, g.status, g.loser_side, g.source, g.start_date,
           w.player_id AS white_id, w.display_name AS white_name, w.kind AS white_kind,
           w.robot_engine AS white_engine, w.created_at AS white_created_at,
           b.player_id AS black_id, b.display_name AS black_name, b.kind AS black_kind,
           b.robot_engine AS black_engine, b.created_at AS black_created_at
    FROM games g
    JOIN players w ON w.player_id = g.white_id
    JOIN players b ON b.player_id = g.black_id
"#;

/// Row type for game queries with both players joined in.
#[derive(sqlx::FromRow)]
struct GameRow {
    game_id: i64,
    status: String,
    loser_side: Option<String>,
    source: Option<String>,
    start_date: i64,
    white_id: i64,
    white_name: String,
    white_kind: String,
    white_engine: Option<String>,
    white_created_at: i64,
    black_id: i64,
    black_name: String,
    black_kind: String,
    black_engine: Option<String>,
    black_created_at: i64,
}

impl GameRow {
    fn into_game(self, moves: Vec<String>) -> Result<ChessGame, PersistenceError> {
        let id = GameId(self.game_id);
        let record = GameRecord {
            id,
            white: Player {
                id: PlayerId(self.white_id),
                display_name: self.white_name,
                kind: decode_kind(&self.white_kind)?,
                robot_engine: self.white_engine,
                created_at: self.white_created_at as u64,
            },
            black: Player {
                id: PlayerId(self.black_id),
                display_name: self.black_name,
                kind: decode_kind(&self.black_kind)?,
                robot_engine: self.black_engine,
                created_at: self.black_created_at as u64,
            },
            start_date: self.start_date as u64,
            status: decode_status(&self.status)?,
            loser: decode_side(self.loser_side.as_deref())?,
            source: self.source,
            moves,
        };
        ChessGame::restore(record)
            .map_err(|e| PersistenceError::Corrupt(format!("game {id} does not replay: {e}")))
    }
}

/// SQLite implementation of [`GameRepository`].
#[derive(Clone)]
pub struct SqliteGameRepository {
    pool: SqlitePool,
}

impl SqliteGameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, rows: Vec<GameRow>) -> Result<Vec<ChessGame>, PersistenceError> {
        let mut games = Vec::with_capacity(rows.len());
        for row in rows {
            let moves = load_moves_for_game(&self.pool, row.game_id).await?;
            games.push(row.into_game(moves)?);
        }
        Ok(games)
    }
}

impl GameRepository for SqliteGameRepository {
    async fn find_game(&self, id: GameId) -> Result<Option<ChessGame>, PersistenceError> {
        let row: Option<GameRow> = sqlx::query_as(&format!("{SELECT_GAME} WHERE g.game_id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            None => Ok(None),
            Some(r) => {
                let moves = load_moves_for_game(&self.pool, r.game_id).await?;
                Ok(Some(r.into_game(moves)?))
            }
        }
    }

    async fn save_game(&self, game: &ChessGame) -> Result<ChessGame, PersistenceError> {
        let now = now_timestamp() as i64;
        let status = game.status().as_str();
        let loser = game.loser().map(|s| s.as_str());

        let mut tx = self.pool.begin().await?;

        let (game_id, stored_plies) = match game.id() {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO games
                        (white_id, black_id, status, loser_side, source, start_date, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(game.white().id.0)
                .bind(game.black().id.0)
                .bind(status)
                .bind(loser)
                .bind(game.source())
                .bind(game.start_date() as i64)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                (result.last_insert_rowid(), 0usize)
            }
            Some(id) => {
                // An ended game only accepts a rewrite of its own final state.
                let result = sqlx::query(
                    r#"
                    UPDATE games SET status = ?, loser_side = ?, updated_at = ?
                    WHERE game_id = ? AND (status = 'OPEN' OR status = ?)
                    "#,
                )
                .bind(status)
                .bind(loser)
                .bind(now)
                .bind(id.0)
                .bind(status)
                .execute(&mut *tx)
                .await?;
                if result.rows_affected() == 0 {
                    let stored: Option<(String,)> =
                        sqlx::query_as("SELECT status FROM games WHERE game_id = ?")
                            .bind(id.0)
                            .fetch_optional(&mut *tx)
                            .await?;
                    return Err(match stored {
                        Some((stored,)) => PersistenceError::Conflict(format!(
                            "game {id} has already ended ({stored})"
                        )),
                        None => PersistenceError::Corrupt(format!("game {id} is not stored")),
                    });
                }

                let (max_ply,): (Option<i64>,) =
                    sqlx::query_as("SELECT MAX(ply) FROM game_moves WHERE game_id = ?")
                        .bind(id.0)
                        .fetch_one(&mut *tx)
                        .await?;
                (id.0, max_ply.unwrap_or(0) as usize)
            }
        };

        let moves = game.moves();
        if stored_plies > moves.len() {
            return Err(PersistenceError::Corrupt(format!(
                "game {game_id} has {stored_plies} stored moves but only {} in memory",
                moves.len()
            )));
        }

        for mv in &moves[stored_plies..] {
            sqlx::query(
                r#"
                INSERT INTO game_moves (game_id, ply, san, fen_after, position_key)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(game_id)
            .bind(mv.ply as i64)
            .bind(&mv.san)
            .bind(&mv.fen_after)
            .bind(&mv.position_key)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let mut saved = game.clone();
        saved.set_id(GameId(game_id));
        Ok(saved)
    }

    async fn find_all_by_status(&self, status: GameStatus) -> Result<Vec<ChessGame>, PersistenceError> {
        let rows: Vec<GameRow> =
            sqlx::query_as(&format!("{SELECT_GAME} WHERE g.status = ? ORDER BY g.game_id"))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?;
        self.hydrate(rows).await
    }

    async fn find_by_player(
        &self,
        player: PlayerId,
        open: Option<bool>,
    ) -> Result<Vec<ChessGame>, PersistenceError> {
        let rows: Vec<GameRow> = sqlx::query_as(&format!(
            r#"{SELECT_GAME}
            WHERE (g.white_id = ? OR g.black_id = ?)
              AND (? IS NULL OR (g.status = 'OPEN') = ?)
            ORDER BY g.start_date DESC, g.game_id DESC"#
        ))
        .bind(player.0)
        .bind(player.0)
        .bind(open)
        .bind(open)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn find_games_containing_position(
        &self,
        position_key: &str,
        exclude: Option<GameId>,
    ) -> Result<Vec<GameId>, PersistenceError> {
        let exclude = exclude.map(|id| id.0);
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT game_id FROM game_moves
            WHERE position_key = ? AND (? IS NULL OR game_id <> ?)
            ORDER BY game_id
            "#,
        )
        .bind(position_key)
        .bind(exclude)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| GameId(id)).collect())
    }

    async fn count_games(&self) -> Result<u64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM games")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

/// Load the SAN of every move of a game, ordered by ply.
async fn load_moves_for_game(pool: &SqlitePool, game_id: i64) -> Result<Vec<String>, PersistenceError> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT san FROM game_moves WHERE game_id = ? ORDER BY ply")
            .bind(game_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(san,)| san).collect())
}
