//! Property tests over randomly played legal games.

use proptest::prelude::*;

use crate::game::Game;
use crate::pgn::san::{format_san, parse_san};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every legal move's canonical SAN resolves back to that same move.
    #[test]
    fn san_format_and_resolve_agree(choices in prop::collection::vec(any::<prop::sample::Index>(), 1..80)) {
        let mut game = Game::new();
        for choice in choices {
            let moves = game.legal_moves();
            if moves.is_empty() {
                break;
            }
            let board = game.position().clone();
            for &mv in &moves {
                let san = format_san(&board, mv);
                prop_assert_eq!(parse_san(&board, &san), Ok(mv), "san {}", san);
            }
            let mv = moves[choice.index(moves.len())];
            game.play(mv).unwrap();
        }
    }

    /// Replaying the recorded notation reproduces the final position.
    #[test]
    fn history_replays(choices in prop::collection::vec(any::<prop::sample::Index>(), 1..60)) {
        let mut game = Game::new();
        for choice in choices {
            let moves = game.legal_moves();
            if moves.is_empty() {
                break;
            }
            game.play(moves[choice.index(moves.len())]).unwrap();
        }

        let mut replay = Game::new();
        for entry in game.history() {
            replay.play_san(&entry.san).unwrap();
        }
        prop_assert_eq!(replay.to_fen(), game.to_fen());
        prop_assert_eq!(replay.history().len(), game.history().len());
    }
}
