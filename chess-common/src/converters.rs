//! Text conversions for cozy-chess board types.

use cozy_chess::{File, Piece, Rank, Square};

pub fn file_to_char(file: File) -> char {
    (b'a' + file as u8) as char
}

pub fn rank_to_char(rank: Rank) -> char {
    (b'1' + rank as u8) as char
}

pub fn char_to_file(c: char) -> Option<File> {
    match c {
        'a'..='h' => File::try_index(c as usize - 'a' as usize),
        _ => None,
    }
}

pub fn char_to_rank(c: char) -> Option<Rank> {
    match c {
        '1'..='8' => Rank::try_index(c as usize - '1' as usize),
        _ => None,
    }
}

/// Format a square in algebraic form, e.g. `e4`.
pub fn format_square(sq: Square) -> String {
    let mut s = String::with_capacity(2);
    s.push(file_to_char(sq.file()));
    s.push(rank_to_char(sq.rank()));
    s
}

/// Parse an algebraic square such as `e4`. Anything else yields `None`.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = char_to_file(chars.next()?)?;
    let rank = char_to_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

/// Uppercase piece letter, as used in SAN.
pub fn format_piece_upper(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

/// Piece for an uppercase SAN letter. Pawns have no SAN letter.
pub fn piece_from_san_char(c: char) -> Option<Piece> {
    match c {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        'K' => Some(Piece::King),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_text_conversions() {
        assert_eq!(format_square(Square::new(File::E, Rank::Fourth)), "e4");
        assert_eq!(format_square(Square::new(File::A, Rank::First)), "a1");
        assert_eq!(
            parse_square("h8"),
            Some(Square::new(File::H, Rank::Eighth))
        );
        assert_eq!(parse_square("i1"), None);
        assert_eq!(parse_square("e9"), None);
        assert_eq!(parse_square("e44"), None);
        assert_eq!(parse_square(""), None);
    }

    #[test]
    fn san_piece_letters() {
        assert_eq!(piece_from_san_char('N'), Some(Piece::Knight));
        assert_eq!(piece_from_san_char('K'), Some(Piece::King));
        // lowercase letters are files, never pieces
        assert_eq!(piece_from_san_char('b'), None);
        assert_eq!(piece_from_san_char('P'), None);
        assert_eq!(format_piece_upper(Piece::Rook), 'R');
    }
}
