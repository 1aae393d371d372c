//! Game update notifications.
//!
//! Notifications are fire-and-forget: the session manager calls the notifier
//! only after a mutation has been committed, and never waits on listeners.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::game::{ChessGame, GameId, GameStatus};
use crate::player::PlayerId;

/// Receives committed game changes.
pub trait GameNotifier: Send + Sync {
    fn notify_game_updated(&self, game: &ChessGame);
}

/// The wire-friendly summary of a game published to listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameUpdate {
    pub game_id: Option<GameId>,
    pub status: GameStatus,
    pub white: PlayerId,
    pub black: PlayerId,
    pub next_player: PlayerId,
    pub robot_to_move: bool,
    pub ply: usize,
    pub last_move: Option<String>,
    pub fen: String,
}

impl GameUpdate {
    pub fn from_game(game: &ChessGame) -> Self {
        Self {
            game_id: game.id(),
            status: game.status(),
            white: game.white().id,
            black: game.black().id,
            next_player: game.next_player().id,
            robot_to_move: game.is_robot_turn(),
            ply: game.moves().len(),
            last_move: game.moves().last().map(|m| m.san.clone()),
            fen: game.fen(),
        }
    }
}

/// Publishes updates on a broadcast channel and logs them as JSON.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<GameUpdate>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameUpdate> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl GameNotifier for BroadcastNotifier {
    fn notify_game_updated(&self, game: &ChessGame) {
        let update = GameUpdate::from_game(game);
        match serde_json::to_string(&update) {
            Ok(json) => tracing::info!(target: "chessclub::notify", update = %json, "Game updated"),
            Err(e) => tracing::warn!("Failed to serialize game update: {}", e),
        }
        // No receivers is fine
        let _ = self.tx.send(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{test_player, PlayerKind};

    #[tokio::test]
    async fn test_subscribers_receive_updates() {
        let notifier = BroadcastNotifier::default();
        let mut rx = notifier.subscribe();

        let mut game = ChessGame::new(
            test_player(1, "Anna", PlayerKind::Human),
            test_player(2, "Robo", PlayerKind::Robot),
        )
        .unwrap();
        game.play(PlayerId(1), "d4").unwrap();
        notifier.notify_game_updated(&game);

        let update = rx.recv().await.unwrap();
        assert_eq!(update.ply, 1);
        assert_eq!(update.last_move.as_deref(), Some("d4"));
        assert_eq!(update.next_player, PlayerId(2));
        assert!(update.robot_to_move);
        assert_eq!(update.status, GameStatus::Open);
    }

    #[test]
    fn test_update_serializes_status_names() {
        let game = ChessGame::new(
            test_player(1, "Anna", PlayerKind::Human),
            test_player(2, "Boris", PlayerKind::Human),
        )
        .unwrap();
        let json = serde_json::to_value(GameUpdate::from_game(&game)).unwrap();
        assert_eq!(json["status"], "OPEN");
        assert_eq!(json["white"], 1);
        assert!(json["game_id"].is_null());
    }

    #[test]
    fn test_notify_without_subscribers() {
        let notifier = BroadcastNotifier::new(4);
        let game = ChessGame::new(
            test_player(1, "Anna", PlayerKind::Human),
            test_player(2, "Boris", PlayerKind::Human),
        )
        .unwrap();
        notifier.notify_game_updated(&game);
    }
}
