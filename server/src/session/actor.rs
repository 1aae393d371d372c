use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;

use super::commands::{GameCommand, SessionError};
use crate::game::{ChessGame, GameError};
use crate::notify::GameNotifier;
use crate::persistence::{GameRepository, Persistence};

/// The game actor loop. Owns the game state and applies commands one at a
/// time, which serializes every mutation of the game.
pub(crate) async fn run_game_actor<D: Persistence>(
    game: ChessGame,
    store: Arc<D>,
    notifier: Arc<dyn GameNotifier>,
    cmd_rx: mpsc::Receiver<GameCommand>,
) {
    let span = match game.id() {
        Some(id) => tracing::info_span!("game", id = %id),
        None => tracing::info_span!("game", id = "unsaved"),
    };
    run_game_actor_inner(game, store, notifier, cmd_rx)
        .instrument(span)
        .await;
}

async fn run_game_actor_inner<D: Persistence>(
    mut game: ChessGame,
    store: Arc<D>,
    notifier: Arc<dyn GameNotifier>,
    mut cmd_rx: mpsc::Receiver<GameCommand>,
) {
    tracing::info!("Game actor started");
    let mut draining = false;

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            GameCommand::Shutdown => {
                tracing::info!("Game actor shutting down");
                break;
            }
            GameCommand::MakeMove {
                player,
                notation,
                reply,
            } => {
                let result = commit(&mut game, store.as_ref(), notifier.as_ref(), |g| {
                    g.play(player, &notation).map(|mv| {
                        tracing::debug!(%player, ply = mv.ply, san = %mv.san, "Move played");
                    })
                })
                .await;
                let _ = reply.send(result);
            }
            GameCommand::Resign { player, reply } => {
                let result =
                    commit(&mut game, store.as_ref(), notifier.as_ref(), |g| g.resign(player)).await;
                let _ = reply.send(result);
            }
            GameCommand::GetGame { reply } => {
                let _ = reply.send(game.clone());
            }
        }

        // Nothing can change a finished game. Stop taking commands, answer
        // the ones already queued, then exit.
        if !draining && game.status().is_terminal() {
            tracing::info!(status = %game.status(), "Game ended, closing actor");
            cmd_rx.close();
            draining = true;
        }
    }

    tracing::info!("Game actor exited");
}

/// Apply `mutate` to a copy of the game, persist the copy, and only then
/// adopt it and notify. A rejected or failed mutation leaves `game` as it was.
async fn commit<D: Persistence>(
    game: &mut ChessGame,
    store: &D,
    notifier: &dyn GameNotifier,
    mutate: impl FnOnce(&mut ChessGame) -> Result<(), GameError>,
) -> Result<ChessGame, SessionError> {
    let mut next = game.clone();
    mutate(&mut next)?;

    let saved = store.games().save_game(&next).await.map_err(|e| {
        tracing::error!("Failed to persist game: {}", e);
        e
    })?;

    *game = saved;
    notifier.notify_game_updated(game);
    Ok(game.clone())
}
