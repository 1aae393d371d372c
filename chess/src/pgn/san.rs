//! Standard Algebraic Notation: token syntax, resolution against a board,
//! and canonical formatting.

use chess_common::{
    char_to_file, char_to_rank, file_to_char, format_piece_upper, format_square, parse_square,
    piece_from_san_char, rank_to_char,
};
use cozy_chess::{BitBoard, Board, Color, File, Move, Piece, Rank, Square};
use smallvec::SmallVec;

use crate::fen::with_side_flipped;

/// A SAN token decoded without reference to any position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum San {
    Castle {
        long: bool,
    },
    Normal {
        piece: Piece,
        from_file: Option<File>,
        from_rank: Option<Rank>,
        capture: bool,
        to: Square,
        promotion: Option<Piece>,
    },
}

impl San {
    /// Decode a token. Check, mate and annotation suffixes are accepted
    /// and ignored; the board decides whether a move checks.
    pub fn parse(token: &str) -> Result<Self, SanError> {
        let body = token.trim_end_matches(['+', '#', '!', '?']);
        if body.is_empty() {
            return Err(SanError::InvalidFormat(token.to_string()));
        }

        match body {
            "O-O" | "0-0" => return Ok(San::Castle { long: false }),
            "O-O-O" | "0-0-0" => return Ok(San::Castle { long: true }),
            _ => {}
        }

        let chars: Vec<char> = body.chars().collect();
        let (piece, mut rest) = match chars.first().copied().and_then(piece_from_san_char) {
            Some(piece) => (piece, &chars[1..]),
            None => (Piece::Pawn, &chars[..]),
        };

        // Promotion suffix: "=Q" or a bare trailing piece letter.
        let mut promotion = None;
        if let Some(&last) = rest.last() {
            if last.is_ascii_uppercase() {
                let promo =
                    piece_from_san_char(last).ok_or(SanError::InvalidPromotion(last.to_string()))?;
                if matches!(promo, Piece::King) || piece != Piece::Pawn {
                    return Err(SanError::InvalidPromotion(token.to_string()));
                }
                promotion = Some(promo);
                rest = &rest[..rest.len() - 1];
                if rest.last() == Some(&'=') {
                    rest = &rest[..rest.len() - 1];
                }
            }
        }

        if rest.len() < 2 {
            return Err(SanError::InvalidFormat(token.to_string()));
        }
        let (head, dest) = rest.split_at(rest.len() - 2);
        let dest: String = dest.iter().collect();
        let to = parse_square(&dest).ok_or(SanError::InvalidSquare(dest))?;

        let (head, capture) = match head.last() {
            Some('x') | Some(':') => (&head[..head.len() - 1], true),
            _ => (head, false),
        };

        let mut from_file = None;
        let mut from_rank = None;
        match head {
            [] => {}
            [c] => {
                if let Some(file) = char_to_file(*c) {
                    from_file = Some(file);
                } else if let Some(rank) = char_to_rank(*c) {
                    from_rank = Some(rank);
                } else {
                    return Err(SanError::InvalidFormat(token.to_string()));
                }
            }
            [f, r] => {
                from_file = Some(char_to_file(*f).ok_or(SanError::InvalidFile(*f))?);
                from_rank = Some(char_to_rank(*r).ok_or(SanError::InvalidRank(*r))?);
            }
            _ => return Err(SanError::InvalidFormat(token.to_string())),
        }

        if piece == Piece::Pawn && from_rank.is_some() && from_file.is_none() {
            return Err(SanError::InvalidFormat(token.to_string()));
        }

        Ok(San::Normal {
            piece,
            from_file,
            from_rank,
            // "exd5" and the old "ed5" both name a pawn capture
            capture: capture || (piece == Piece::Pawn && from_file.is_some_and(|f| f != to.file())),
            to,
            promotion,
        })
    }
}

/// Resolve a SAN token to the unique legal move it denotes on `board`.
pub fn parse_san(board: &Board, token: &str) -> Result<Move, MoveError> {
    let san = San::parse(token).map_err(|e| MoveError::new(token, MoveErrorReason::Malformed(e)))?;
    let legal = legal_moves(board);
    if legal.is_empty() {
        return Err(MoveError::new(token, MoveErrorReason::NoLegalMoves));
    }

    match san {
        San::Castle { long } => legal
            .iter()
            .copied()
            .find(|mv| is_castling(board, *mv) && castles_long(*mv) == long)
            .ok_or_else(|| MoveError::new(token, MoveErrorReason::IllegalCastling)),
        San::Normal {
            piece,
            from_file,
            from_rank,
            to,
            promotion,
            ..
        } => {
            let matches_origin = |from: Square| {
                from_file.map_or(true, |f| from.file() == f)
                    && from_rank.map_or(true, |r| from.rank() == r)
            };

            let candidates: SmallVec<[Move; 4]> = legal
                .iter()
                .copied()
                .filter(|mv| {
                    mv.to == to
                        && board.piece_on(mv.from) == Some(piece)
                        && !is_castling(board, *mv)
                        && matches_origin(mv.from)
                })
                .collect();

            let promoting = piece == Piece::Pawn && candidates.iter().any(|mv| mv.promotion.is_some());
            if promoting && promotion.is_none() {
                return Err(MoveError::new(token, MoveErrorReason::MissingPromotion));
            }

            let chosen: SmallVec<[Move; 4]> = candidates
                .into_iter()
                .filter(|mv| mv.promotion == promotion)
                .collect();

            match chosen.as_slice() {
                [mv] => Ok(*mv),
                [] => Err(MoveError::new(
                    token,
                    diagnose(board, piece, to, &matches_origin),
                )),
                many => Err(MoveError::new(
                    token,
                    MoveErrorReason::Ambiguous(many.len()),
                )),
            }
        }
    }
}

/// Canonical SAN for a legal move on `board`, including the check or mate
/// suffix.
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut san = String::with_capacity(8);

    if is_castling(board, mv) {
        san.push_str(if castles_long(mv) { "O-O-O" } else { "O-O" });
    } else {
        let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);
        let capture = is_capture(board, mv);

        if piece == Piece::Pawn {
            if capture {
                san.push(file_to_char(mv.from.file()));
            }
        } else {
            san.push(format_piece_upper(piece));
            let rivals: SmallVec<[Move; 4]> = legal_moves(board)
                .into_iter()
                .filter(|other| {
                    other.to == mv.to
                        && other.from != mv.from
                        && board.piece_on(other.from) == Some(piece)
                        && !is_castling(board, *other)
                })
                .collect();
            if !rivals.is_empty() {
                let file_unique = rivals.iter().all(|o| o.from.file() != mv.from.file());
                let rank_unique = rivals.iter().all(|o| o.from.rank() != mv.from.rank());
                if file_unique {
                    san.push(file_to_char(mv.from.file()));
                } else if rank_unique {
                    san.push(rank_to_char(mv.from.rank()));
                } else {
                    san.push_str(&format_square(mv.from));
                }
            }
        }

        if capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));
        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(format_piece_upper(promo));
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        san.push(if legal_moves(&after).is_empty() { '#' } else { '+' });
    }
    san
}

/// All legal moves in the position.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// cozy-chess encodes castling as the king capturing its own rook.
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King) && board.color_on(mv.to) == board.color_on(mv.from)
}

fn castles_long(mv: Move) -> bool {
    (mv.to.file() as u8) < (mv.from.file() as u8)
}

/// True for ordinary and en-passant captures. Castling is never a capture.
pub fn is_capture(board: &Board, mv: Move) -> bool {
    let mover = board.side_to_move();
    if board.color_on(mv.to) == Some(!mover) {
        return true;
    }
    board.piece_on(mv.from) == Some(Piece::Pawn) && mv.from.file() != mv.to.file()
}

/// Explain why no legal move matched a well-formed token.
fn diagnose(
    board: &Board,
    piece: Piece,
    to: Square,
    matches_origin: &dyn Fn(Square) -> bool,
) -> MoveErrorReason {
    let mover = board.side_to_move();
    let reachable = pseudo_origins(board, mover, piece, to);
    if reachable.into_iter().any(matches_origin) {
        return MoveErrorReason::LeavesKingInCheck;
    }

    if let Some(flipped) = with_side_flipped(board) {
        let their_moves = legal_moves(&flipped);
        let theirs = their_moves.iter().any(|mv| {
            mv.to == to
                && flipped.piece_on(mv.from) == Some(piece)
                && !is_castling(&flipped, *mv)
                && matches_origin(mv.from)
        });
        if theirs {
            return MoveErrorReason::WrongTurn;
        }
    }

    MoveErrorReason::NoSuchMove
}

/// Squares holding a `piece` of `color` that could move to `to` if king
/// safety were ignored. En-passant is left out.
fn pseudo_origins(board: &Board, color: Color, piece: Piece, to: Square) -> BitBoard {
    if board.color_on(to) == Some(color) {
        return BitBoard::EMPTY;
    }
    let ours = board.colored_pieces(color, piece);
    let occupied = board.occupied();

    match piece {
        Piece::Knight => cozy_chess::get_knight_moves(to) & ours,
        Piece::Bishop => cozy_chess::get_bishop_moves(to, occupied) & ours,
        Piece::Rook => cozy_chess::get_rook_moves(to, occupied) & ours,
        Piece::Queen => {
            (cozy_chess::get_bishop_moves(to, occupied) | cozy_chess::get_rook_moves(to, occupied))
                & ours
        }
        Piece::King => cozy_chess::get_king_moves(to) & ours,
        Piece::Pawn => {
            if board.color_on(to) == Some(!color) {
                // a pawn of `color` attacks `to` iff an enemy pawn on `to` would attack it
                cozy_chess::get_pawn_attacks(to, !color) & ours
            } else {
                pawn_push_origins(board, color, to) & ours
            }
        }
    }
}

fn pawn_push_origins(board: &Board, color: Color, to: Square) -> BitBoard {
    let step: i8 = if color == Color::White { -1 } else { 1 };
    let start_rank = if color == Color::White { Rank::Second } else { Rank::Seventh };
    let file = to.file();
    let rank_at = |offset: i8| {
        let r = to.rank() as i8 + offset;
        usize::try_from(r).ok().and_then(Rank::try_index)
    };

    let mut origins = BitBoard::EMPTY;
    if let Some(one) = rank_at(step) {
        let sq = Square::new(file, one);
        if board.piece_on(sq).is_some() {
            origins |= sq.bitboard();
        } else if let Some(two) = rank_at(2 * step) {
            if two == start_rank {
                origins |= Square::new(file, two).bitboard();
            }
        }
    }
    origins
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid file: {0}")]
    InvalidFile(char),
    #[error("Invalid rank: {0}")]
    InvalidRank(char),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

/// A move token that cannot be played in the current position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid move '{token}': {reason}")]
pub struct MoveError {
    pub token: String,
    pub reason: MoveErrorReason,
}

impl MoveError {
    pub fn new(token: &str, reason: MoveErrorReason) -> Self {
        Self {
            token: token.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveErrorReason {
    #[error("malformed notation ({0})")]
    Malformed(SanError),
    #[error("ambiguous, {0} pieces can make this move")]
    Ambiguous(usize),
    #[error("no piece of the side to move can make this move")]
    NoSuchMove,
    #[error("move would leave the king in check")]
    LeavesKingInCheck,
    #[error("move belongs to the side not on turn")]
    WrongTurn,
    #[error("promotion piece required")]
    MissingPromotion,
    #[error("castling is not permitted")]
    IllegalCastling,
    #[error("the position has no legal moves")]
    NoLegalMoves,
}
