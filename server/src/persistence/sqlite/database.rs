//! Connection pool setup for the club database.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

use crate::persistence::PersistenceError;

/// Concurrent imports contend for the single writer.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Readers share the pool with one writer under WAL.
const FILE_POOL_SIZE: u32 = 5;

/// A migrated SQLite pool shared by the repositories.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database file at `path`, creating it and its directory if
    /// needed, and bring the schema up to date.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let db = Self::connect(options, FILE_POOL_SIZE).await?;
        let schema_version = db.schema_version().await?;
        tracing::info!(path = %path.display(), schema_version, "Opened database");
        Ok(db)
    }

    /// A private in-memory database. The pool holds a single connection
    /// so the data lives exactly as long as the pool.
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self, PersistenceError> {
        let options = "sqlite::memory:".parse::<SqliteConnectOptions>()?.foreign_keys(true);
        Self::connect(options, 1).await
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| PersistenceError::Migration(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Highest migration applied to this database.
    pub async fn schema_version(&self) -> Result<i64, PersistenceError> {
        let (version,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations WHERE success")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked-out connections to return, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
