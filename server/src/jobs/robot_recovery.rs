use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::game::GameStatus;
use crate::monitoring::PerformanceMonitor;
use crate::notify::GameNotifier;
use crate::persistence::{GameRepository, Persistence, PersistenceError};

/// Re-announces open games that are waiting on a robot. Whatever drives the
/// robots listens for game updates; if it missed one, the game stalls until
/// the next sweep. The job never changes a game.
pub struct RobotRecoveryJob<D: Persistence> {
    store: Arc<D>,
    notifier: Arc<dyn GameNotifier>,
    monitor: Arc<dyn PerformanceMonitor>,
    last_run: Mutex<Option<Instant>>,
}

impl<D: Persistence> RobotRecoveryJob<D> {
    pub fn new(
        store: Arc<D>,
        notifier: Arc<dyn GameNotifier>,
        monitor: Arc<dyn PerformanceMonitor>,
    ) -> Self {
        Self {
            store,
            notifier,
            monitor,
            last_run: Mutex::new(None),
        }
    }

    /// When the last sweep finished, if any has.
    pub fn last_run(&self) -> Option<Instant> {
        self.last_run.lock().ok().and_then(|t| *t)
    }

    /// Notify every open game whose next mover is a robot. Returns how many
    /// games were signalled.
    pub async fn sweep(&self) -> Result<usize, PersistenceError> {
        let started = Instant::now();
        let open = self.store.games().find_all_by_status(GameStatus::Open).await?;

        let mut signalled = 0;
        for game in open.iter().filter(|g| g.is_robot_turn()) {
            tracing::debug!(game_id = ?game.id(), robot = %game.next_player(), "Re-signalling robot game");
            self.notifier.notify_game_updated(game);
            signalled += 1;
        }

        let elapsed = started.elapsed();
        self.monitor
            .register("robot_recovery", "sweep", signalled as u64, "game", elapsed);
        if let Ok(mut last) = self.last_run.lock() {
            *last = Some(Instant::now());
        }
        tracing::info!(open = open.len(), signalled, "Robot recovery sweep finished");
        Ok(signalled)
    }

    /// Sweep after `initial_delay`, then every `interval`, until `shutdown`
    /// turns true or its sender goes away.
    pub async fn run(
        &self,
        initial_delay: Duration,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(
            delay_secs = initial_delay.as_secs(),
            interval_secs = interval.as_secs(),
            "Robot recovery job started"
        );
        let mut ticker = time::interval_at(time::Instant::now() + initial_delay, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::warn!("Robot recovery sweep failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Robot recovery job stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ChessGame;
    use crate::monitoring::LoggingMonitor;
    use crate::notify::BroadcastNotifier;
    use crate::persistence::sqlite::{Database, SqlitePersistence};
    use crate::player::PlayerFactory;

    async fn setup() -> (Arc<SqlitePersistence>, Arc<BroadcastNotifier>, Arc<LoggingMonitor>) {
        let db = Database::new_in_memory().await.unwrap();
        let store = Arc::new(SqlitePersistence::new(&db));
        let factory = PlayerFactory::new(store.clone());
        let anna = factory.register_human("Anna").await.unwrap();
        let boris = factory.register_human("Boris").await.unwrap();
        let robot = factory.register_robot("Deep Thinker", "stockfish").await.unwrap();

        // robot to move
        let waiting = ChessGame::new(robot.clone(), anna.clone()).unwrap();
        store.games().save_game(&waiting).await.unwrap();
        // human to move after the robot's reply
        let mut replied = ChessGame::new(anna.clone(), robot.clone()).unwrap();
        replied.play(anna.id, "e4").unwrap();
        replied.play(robot.id, "e5").unwrap();
        store.games().save_game(&replied).await.unwrap();
        // robot to move but the game is over
        let mut over = ChessGame::new(robot.clone(), boris.clone()).unwrap();
        over.resign(robot.id).unwrap();
        store.games().save_game(&over).await.unwrap();
        // no robot at all
        store
            .games()
            .save_game(&ChessGame::new(anna, boris).unwrap())
            .await
            .unwrap();

        (
            store,
            Arc::new(BroadcastNotifier::default()),
            Arc::new(LoggingMonitor::new()),
        )
    }

    #[tokio::test]
    async fn test_sweep_signals_only_stalled_robot_games() {
        let (store, notifier, monitor) = setup().await;
        let mut updates = notifier.subscribe();
        let job = RobotRecoveryJob::new(store, notifier, monitor.clone());
        assert!(job.last_run().is_none());

        assert_eq!(job.sweep().await.unwrap(), 1);
        let update = updates.try_recv().unwrap();
        assert!(update.robot_to_move);
        assert_eq!(update.ply, 0);
        assert!(updates.try_recv().is_err());

        assert!(job.last_run().is_some());
        assert_eq!(monitor.totals("robot_recovery", "sweep").count, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (store, notifier, monitor) = setup().await;
        let mut updates = notifier.subscribe();
        let job = Arc::new(RobotRecoveryJob::new(store, notifier, monitor));
        let (stop_tx, stop_rx) = watch::channel(false);

        let runner = {
            let job = job.clone();
            tokio::spawn(async move {
                job.run(Duration::ZERO, Duration::from_secs(3600), stop_rx)
                    .await
            })
        };

        let update = time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(update.robot_to_move);

        stop_tx.send(true).unwrap();
        time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
        assert!(job.last_run().is_some());
    }
}
