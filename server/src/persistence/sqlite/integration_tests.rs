use chess::PlayerSide;

use super::{Database, SqliteGameRepository, SqlitePlayerRepository};
use crate::game::{ChessGame, GameId, GameStatus};
use crate::persistence::traits::{GameRepository, PlayerRepository};
use crate::persistence::PersistenceError;
use crate::player::{NewPlayer, Player, PlayerId, PlayerKind};

async fn repos() -> (SqlitePlayerRepository, SqliteGameRepository) {
    let db = Database::new_in_memory().await.unwrap();
    (
        SqlitePlayerRepository::new(db.pool().clone()),
        SqliteGameRepository::new(db.pool().clone()),
    )
}

async fn seed_players(players: &SqlitePlayerRepository) -> (Player, Player, Player) {
    let anna = players.save_player(&NewPlayer::human("Anna")).await.unwrap();
    let boris = players.save_player(&NewPlayer::human("Boris")).await.unwrap();
    let robo = players
        .save_player(&NewPlayer::robot("Robo", "stockfish"))
        .await
        .unwrap();
    (anna, boris, robo)
}

fn play(game: &mut ChessGame, moves: &[&str]) {
    for san in moves {
        let mover = game.next_player().id;
        game.play(mover, san).unwrap();
    }
}

#[tokio::test]
async fn test_player_roundtrip() {
    let (players, _) = repos().await;
    let (anna, _, robo) = seed_players(&players).await;

    let loaded = players.find_player(anna.id).await.unwrap().unwrap();
    assert_eq!(loaded.display_name, "Anna");
    assert_eq!(loaded.kind, PlayerKind::Human);

    let loaded = players.find_by_display_name("Robo").await.unwrap().unwrap();
    assert_eq!(loaded, robo);
    assert_eq!(loaded.robot_engine.as_deref(), Some("stockfish"));

    assert!(players.find_player(PlayerId(999)).await.unwrap().is_none());
    assert!(players.find_by_display_name("Nobody").await.unwrap().is_none());
    assert_eq!(players.count_players().await.unwrap(), 3);
}

#[tokio::test]
async fn test_duplicate_name_is_conflict() {
    let (players, _) = repos().await;
    players.save_player(&NewPlayer::human("Anna")).await.unwrap();
    let err = players
        .save_player(&NewPlayer::robot("Anna", "stockfish"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Conflict(_)));
}

#[tokio::test]
async fn test_insert_external_if_absent() {
    let (players, _) = repos().await;
    let created = players.insert_external_if_absent("Morphy").await.unwrap().unwrap();
    assert_eq!(created.kind, PlayerKind::External);
    assert!(players.insert_external_if_absent("Morphy").await.unwrap().is_none());
    assert_eq!(players.count_players().await.unwrap(), 1);
}

#[tokio::test]
async fn test_game_insert_and_append() {
    let (players, games) = repos().await;
    let (anna, boris, _) = seed_players(&players).await;

    let mut game = ChessGame::new(anna.clone(), boris.clone()).unwrap();
    play(&mut game, &["e4", "c5"]);
    let saved = games.save_game(&game).await.unwrap();
    let id = saved.id().unwrap();

    let mut loaded = games.find_game(id).await.unwrap().unwrap();
    assert_eq!(loaded.white(), &anna);
    assert_eq!(loaded.moves().len(), 2);
    assert_eq!(loaded.next_player(), &anna);

    play(&mut loaded, &["Nf3"]);
    games.save_game(&loaded).await.unwrap();

    let reloaded = games.find_game(id).await.unwrap().unwrap();
    let sans: Vec<&str> = reloaded.moves().iter().map(|m| m.san.as_str()).collect();
    assert_eq!(sans, vec!["e4", "c5", "Nf3"]);
    assert_eq!(reloaded.fen(), loaded.fen());
    assert_eq!(games.count_games().await.unwrap(), 1);
}

#[tokio::test]
async fn test_terminal_state_persists() {
    let (players, games) = repos().await;
    let (anna, boris, _) = seed_players(&players).await;

    let mut game = ChessGame::new(anna, boris).unwrap();
    play(&mut game, &["f3", "e5", "g4", "Qh4"]);
    let id = games.save_game(&game).await.unwrap().id().unwrap();

    let loaded = games.find_game(id).await.unwrap().unwrap();
    assert_eq!(loaded.status(), GameStatus::EndedCheckmate);
    assert_eq!(loaded.loser(), Some(PlayerSide::White));
}

#[tokio::test]
async fn test_update_of_unknown_game_fails() {
    let (players, games) = repos().await;
    let (anna, boris, _) = seed_players(&players).await;
    let mut game = ChessGame::new(anna, boris).unwrap();
    game.set_id(GameId(77));
    assert!(matches!(
        games.save_game(&game).await,
        Err(PersistenceError::Corrupt(_))
    ));
}

#[tokio::test]
async fn test_ended_game_cannot_be_reopened_by_stale_copy() {
    let (players, games) = repos().await;
    let (anna, boris, _) = seed_players(&players).await;

    let stale = games
        .save_game(&ChessGame::new(anna.clone(), boris).unwrap())
        .await
        .unwrap();
    let id = stale.id().unwrap();

    let mut resigned = stale.clone();
    resigned.resign(anna.id).unwrap();
    games.save_game(&resigned).await.unwrap();
    // saving the final state again is harmless
    games.save_game(&resigned).await.unwrap();

    let mut late = stale;
    play(&mut late, &["e4"]);
    assert!(matches!(
        games.save_game(&late).await,
        Err(PersistenceError::Conflict(_))
    ));

    let loaded = games.find_game(id).await.unwrap().unwrap();
    assert_eq!(loaded.status(), GameStatus::EndedResignation);
    assert_eq!(loaded.loser(), Some(PlayerSide::White));
    assert!(loaded.moves().is_empty());
}

#[tokio::test]
async fn test_queries_by_status_player_and_position() {
    let (players, games) = repos().await;
    let (anna, boris, robo) = seed_players(&players).await;

    let mut first = ChessGame::new(anna.clone(), boris.clone()).unwrap();
    play(&mut first, &["e4", "e5", "Nf3"]);
    let first = games.save_game(&first).await.unwrap();

    let mut second = ChessGame::new(robo.clone(), anna.clone()).unwrap();
    play(&mut second, &["Nf3", "Nc6", "e4", "e5"]);
    second.resign(anna.id).unwrap();
    let second = games.save_game(&second).await.unwrap();

    let mut third = ChessGame::new(boris.clone(), robo.clone()).unwrap();
    play(&mut third, &["d4"]);
    let third = games.save_game(&third).await.unwrap();

    let open = games.find_all_by_status(GameStatus::Open).await.unwrap();
    let open_ids: Vec<_> = open.iter().filter_map(ChessGame::id).collect();
    assert_eq!(open_ids, vec![first.id().unwrap(), third.id().unwrap()]);
    assert!(open[1].is_robot_turn());

    let annas = games.find_by_player(anna.id, None).await.unwrap();
    assert_eq!(annas.len(), 2);
    let annas_open = games.find_by_player(anna.id, Some(true)).await.unwrap();
    assert_eq!(annas_open.len(), 1);
    assert_eq!(annas_open[0].id(), first.id());
    let annas_ended = games.find_by_player(anna.id, Some(false)).await.unwrap();
    assert_eq!(annas_ended[0].id(), second.id());

    // the final position of the first game occurs in no other game
    let related = games
        .find_games_containing_position(&first.position_key(), first.id())
        .await
        .unwrap();
    assert!(related.is_empty());

    let key_after_e4 = first.moves()[0].position_key.clone();
    let all = games
        .find_games_containing_position(&key_after_e4, None)
        .await
        .unwrap();
    assert_eq!(all, vec![first.id().unwrap()]);
}

#[tokio::test]
async fn test_transposition_is_found() {
    let (players, games) = repos().await;
    let (anna, boris, _) = seed_players(&players).await;

    let mut a = ChessGame::new(anna.clone(), boris.clone()).unwrap();
    play(&mut a, &["Nf3", "Nf6", "Nc3", "Nc6"]);
    let a = games.save_game(&a).await.unwrap();

    let mut b = ChessGame::new(boris, anna).unwrap();
    play(&mut b, &["Nc3", "Nc6", "Nf3", "Nf6"]);
    let b = games.save_game(&b).await.unwrap();

    assert_eq!(a.position_key(), b.position_key());
    let related = games
        .find_games_containing_position(&b.position_key(), b.id())
        .await
        .unwrap();
    assert_eq!(related, vec![a.id().unwrap()]);
}
