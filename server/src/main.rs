use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chessclub_server::config::ServerConfig;
use chessclub_server::game::GameStatus;
use chessclub_server::jobs::{PgnImportProcessor, RobotRecoveryJob};
use chessclub_server::monitoring::LoggingMonitor;
use chessclub_server::notify::BroadcastNotifier;
use chessclub_server::persistence::sqlite::{Database, SqlitePersistence};
use chessclub_server::persistence::{GameRepository, Persistence, PlayerRepository};
use chessclub_server::player::PlayerFactory;
use chessclub_server::session::GameManager;

#[derive(Parser)]
#[command(name = "chessclub-server", about = "Chess club game server and PGN importer")]
struct Cli {
    /// SQLite database file. Overrides CHESSCLUB_DATABASE.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the background jobs until interrupted.
    Serve,
    /// Import one or more PGN archives.
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Seed an empty database with sample players and games.
    Bootstrap,
    /// Print player and game counts.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = ServerConfig::from_env();
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    let _guard = init_tracing(config.log_dir.as_deref())?;

    let db = Database::open(&config.database_path)
        .await
        .with_context(|| format!("opening database {}", config.database_path.display()))?;
    let store = Arc::new(SqlitePersistence::new(&db));

    let outcome = match cli.command {
        Commands::Serve => serve(&config, store).await,
        Commands::Import { files } => import(store, &files).await,
        Commands::Bootstrap => bootstrap(store).await,
        Commands::Stats => stats(store).await,
    };
    db.close().await;
    outcome
}

fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "chessclub-server");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

async fn serve(config: &ServerConfig, store: Arc<SqlitePersistence>) -> anyhow::Result<()> {
    let notifier = Arc::new(BroadcastNotifier::default());
    let monitor = Arc::new(LoggingMonitor::new());
    let mut updates = notifier.subscribe();

    let listener = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            if update.robot_to_move {
                tracing::info!(game_id = ?update.game_id, robot = %update.next_player, "Robot to move");
            }
        }
    });

    let job = RobotRecoveryJob::new(store, notifier, monitor);
    let (stop_tx, stop_rx) = watch::channel(false);
    let delay = config.robot_recovery_delay;
    let interval = config.robot_recovery_interval;
    let runner = tokio::spawn(async move { job.run(delay, interval, stop_rx).await });

    tracing::info!("Chess club server running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;

    tracing::info!("Shutting down");
    let _ = stop_tx.send(true);
    runner.await.context("robot recovery job panicked")?;
    listener.abort();
    Ok(())
}

async fn import(store: Arc<SqlitePersistence>, files: &[PathBuf]) -> anyhow::Result<()> {
    let monitor = Arc::new(LoggingMonitor::new());
    let processor = PgnImportProcessor::new(store, monitor.clone());

    let mut failed = 0;
    for (path, result) in processor.process_all(files).await {
        match result {
            Ok(report) => println!(
                "{}: imported {} of {} games ({} skipped) in {:.2?}",
                path.display(),
                report.imported,
                report.processed,
                report.skipped,
                report.elapsed
            ),
            Err(e) => {
                failed += 1;
                println!("{}: failed: {}", path.display(), e);
            }
        }
    }

    let totals = monitor.totals("pgn_import", "import");
    println!("Total: {} games imported", totals.count);
    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) could not be imported", files.len());
    }
    Ok(())
}

async fn bootstrap(store: Arc<SqlitePersistence>) -> anyhow::Result<()> {
    if store.players().count_players().await? > 0 {
        println!("Database already has players, nothing to do");
        return Ok(());
    }

    let factory = PlayerFactory::new(store.clone());
    let anna = factory.register_human("Anna").await?;
    let boris = factory.register_human("Boris").await?;
    let robot = factory.register_robot("Robo", "random").await?;

    let manager = GameManager::new(store, Arc::new(BroadcastNotifier::default()));

    let open = manager.create_game(anna.id, anna.id, boris.id).await?;
    let open_id = open.id().context("created game has no id")?;
    for (player, san) in [(anna.id, "e4"), (boris.id, "e5"), (anna.id, "Nf3")] {
        manager.make_move(open_id, player, san).await?;
    }

    let waiting = manager.create_game(anna.id, anna.id, robot.id).await?;
    let waiting_id = waiting.id().context("created game has no id")?;
    manager.make_move(waiting_id, anna.id, "d4").await?;
    manager.shutdown().await;

    println!("Created players {}, {} and {}", anna, boris, robot);
    println!("Created games {} and {}", open_id, waiting_id);
    Ok(())
}

async fn stats(store: Arc<SqlitePersistence>) -> anyhow::Result<()> {
    println!("Players: {}", store.players().count_players().await?);
    println!("Games:   {}", store.games().count_games().await?);
    for status in [
        GameStatus::Open,
        GameStatus::EndedCheckmate,
        GameStatus::EndedResignation,
        GameStatus::EndedDraw,
    ] {
        let games = store.games().find_all_by_status(status).await?;
        println!("  {:<18} {}", status.as_str(), games.len());
    }
    Ok(())
}
