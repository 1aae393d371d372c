//! Batch import of PGN archives.
//!
//! Each record is an independent unit of work: it is parsed, its players are
//! resolved through the [`PlayerFactory`], its moves are replayed through a
//! fresh [`ChessGame`], and the finished game is saved in its own
//! transaction. A record that fails is logged and skipped. Only a failure of
//! the input stream itself, or of the database as a whole, stops the run.

mod stream;

pub use stream::pgn_records;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chess::pgn::{PgnError, PgnGame, PgnResult, RawRecord};
use chess::PlayerSide;
use tokio::io::AsyncBufRead;
use tokio_stream::StreamExt;
use tracing::Instrument;

use crate::game::{ChessGame, GameError, GameStatus};
use crate::persistence::{GameRepository, Persistence, PersistenceError};
use crate::player::{PlayerError, PlayerFactory};

/// Outcome of one archive import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub source: String,
    pub processed: usize,
    pub imported: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Failures that abort an import run.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read PGN stream: {0}")]
    Stream(#[from] std::io::Error),
    #[error("import aborted at record {record}: {cause}")]
    Persistence {
        record: usize,
        #[source]
        cause: RecordError,
    },
}

/// Why a single record was skipped.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Parse(#[from] PgnError),
    #[error("missing {0} player name")]
    MissingPlayer(PlayerSide),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error("cannot set up game: {0}")]
    Setup(GameError),
    #[error("replay failed at ply {ply}: {error}")]
    Replay { ply: usize, error: GameError },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl RecordError {
    /// Database failures that every later record would run into as well.
    fn is_fatal(&self) -> bool {
        let error = match self {
            Self::Persistence(e) | Self::Player(PlayerError::Persistence(e)) => e,
            _ => return false,
        };
        !matches!(
            error,
            PersistenceError::Conflict(_)
                | PersistenceError::Corrupt(_)
                | PersistenceError::Sqlx(sqlx::Error::Database(_))
        )
    }
}

/// Imports PGN archives into the game store.
pub struct PgnImporter<D: Persistence> {
    store: Arc<D>,
    players: PlayerFactory<D>,
}

impl<D: Persistence> PgnImporter<D> {
    pub fn new(store: Arc<D>) -> Self {
        Self {
            players: PlayerFactory::new(store.clone()),
            store,
        }
    }

    /// Import every record of `reader`, labelling the games with `source`.
    /// Imported games are stored without notifying listeners.
    pub async fn batch_import<R>(&self, source: &str, reader: R) -> Result<ImportReport, ImportError>
    where
        R: AsyncBufRead + Unpin,
    {
        let span = tracing::info_span!(
            "import",
            source = %source,
            run_id = %uuid::Uuid::new_v4()
        );
        self.run(source, reader).instrument(span).await
    }

    async fn run<R>(&self, source: &str, reader: R) -> Result<ImportReport, ImportError>
    where
        R: AsyncBufRead + Unpin,
    {
        let started = Instant::now();
        let mut report = ImportReport {
            source: source.to_string(),
            processed: 0,
            imported: 0,
            skipped: 0,
            elapsed: Duration::ZERO,
        };
        tracing::info!("Starting PGN import");

        let records = pgn_records(reader);
        tokio::pin!(records);

        while let Some(record) = records.next().await {
            let record = record.map_err(|e| {
                tracing::error!(processed = report.processed, "PGN stream failed: {}", e);
                e
            })?;
            report.processed += 1;

            match self.import_record(source, &record).await {
                Ok(game) => {
                    report.imported += 1;
                    tracing::debug!(
                        record = record.index,
                        game_id = ?game.id(),
                        plies = game.moves().len(),
                        status = %game.status(),
                        "Imported game"
                    );
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(record = record.index, "Import aborted: {}", e);
                    return Err(ImportError::Persistence {
                        record: record.index,
                        cause: e,
                    });
                }
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!(
                        record = record.index,
                        offset = record.offset,
                        "Skipping PGN record: {}",
                        e
                    );
                }
            }
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            processed = report.processed,
            imported = report.imported,
            skipped = report.skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "PGN import finished"
        );
        Ok(report)
    }

    async fn import_record(&self, source: &str, record: &RawRecord) -> Result<ChessGame, RecordError> {
        let parsed = record.parse()?;
        let white = self.resolve(&parsed, PlayerSide::White).await?;
        let black = self.resolve(&parsed, PlayerSide::Black).await?;

        let mut game = ChessGame::new(white, black)
            .map_err(RecordError::Setup)?
            .with_source(source);

        for (i, token) in parsed.moves.iter().enumerate() {
            let mover = game.next_player().id;
            game.play(mover, token)
                .map_err(|error| RecordError::Replay { ply: i + 1, error })?;
        }
        apply_result(&mut game, parsed.result).map_err(|error| RecordError::Replay {
            ply: parsed.moves.len(),
            error,
        })?;

        Ok(self.store.games().save_game(&game).await?)
    }

    async fn resolve(
        &self,
        parsed: &PgnGame,
        side: PlayerSide,
    ) -> Result<crate::player::Player, RecordError> {
        let name = match side {
            PlayerSide::White => parsed.white(),
            PlayerSide::Black => parsed.black(),
        };
        match name {
            Some(name) if !name.trim().is_empty() => {
                Ok(self.players.find_or_create_external(name).await?)
            }
            _ => Err(RecordError::MissingPlayer(side)),
        }
    }
}

/// Carry the archive's result over to a replayed game that is still open.
fn apply_result(game: &mut ChessGame, result: PgnResult) -> Result<(), GameError> {
    if game.status() != GameStatus::Open {
        return Ok(());
    }
    let (white, black) = (game.white().id, game.black().id);
    match result {
        PgnResult::WhiteWins => game.resign(black),
        PgnResult::BlackWins => game.resign(white),
        PgnResult::Draw => game.declare_draw(),
        PgnResult::Ongoing => Ok(()),
    }
}
