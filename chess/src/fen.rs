use cozy_chess::Board;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(FenError::InvalidFormat);
    }
    fen.parse().map_err(|_| FenError::InvalidBoardLayout)
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// Key identifying a position regardless of move counters: the placement,
/// side to move, castling and en-passant fields of the FEN.
pub fn position_key(board: &Board) -> String {
    let fen = format_fen(board);
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// The same placement with the other side to move and no en-passant square.
///
/// Returns `None` when that position would be illegal, which is the case
/// whenever the side currently to move is in check.
pub fn with_side_flipped(board: &Board) -> Option<Board> {
    if !board.checkers().is_empty() {
        return None;
    }
    let fen = format_fen(board);
    let mut fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }
    fields[1] = if fields[1] == "w" { "b" } else { "w" };
    fields[3] = "-";
    fields.join(" ").parse().ok()
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_position_roundtrip() {
        let board = parse_fen(STARTING_FEN).unwrap();
        assert_eq!(format_fen(&board), STARTING_FEN);
        assert_eq!(
            position_key(&board),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(parse_fen("not a fen"), Err(FenError::InvalidFormat)));
        assert!(matches!(
            parse_fen("rnbqkbnr/pppppppp/8/8 w KQkq - 0 1"),
            Err(FenError::InvalidBoardLayout)
        ));
    }

    #[test]
    fn test_flip_side() {
        let board = parse_fen(STARTING_FEN).unwrap();
        let flipped = with_side_flipped(&board).unwrap();
        assert_eq!(flipped.side_to_move(), cozy_chess::Color::Black);
    }

    #[test]
    fn test_flip_side_refused_when_in_check() {
        // White king on e1 is checked by the rook on e8.
        let board = parse_fen("4r2k/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(with_side_flipped(&board).is_none());
    }
}
