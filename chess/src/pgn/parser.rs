use std::collections::HashMap;
use std::fmt;

/// A parsed PGN game record: its tag pairs and raw move tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgnGame {
    /// Zero-based position of the record in its archive.
    pub index: usize,
    /// Byte offset of the record's first line in its archive.
    pub offset: u64,
    pub tags: HashMap<String, String>,
    /// Move tokens in order, with numbers, comments, variations and NAGs removed.
    pub moves: Vec<String>,
    pub result: PgnResult,
}

impl PgnGame {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn white(&self) -> Option<&str> {
        self.tag("White")
    }

    pub fn black(&self) -> Option<&str> {
        self.tag("Black")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgnResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl PgnResult {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" => Some(Self::Draw),
            "*" => Some(Self::Ongoing),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
            Self::Ongoing => "*",
        }
    }
}

impl fmt::Display for PgnResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A malformed game record. `offset` is the record's start in the archive
/// plus the position of the offending input in the decoded record text. The
/// two agree for valid UTF-8; each replaced byte earlier in the record adds
/// two to the in-record part.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("PGN record {index} at byte {offset}: {kind}")]
pub struct PgnError {
    pub index: usize,
    pub offset: u64,
    pub kind: PgnErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PgnErrorKind {
    #[error("empty record")]
    Empty,
    #[error("unterminated tag pair")]
    UnterminatedTag,
    #[error("invalid tag pair: {0}")]
    InvalidTag(String),
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unbalanced variation")]
    UnbalancedVariation,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("move '{0}' after the result marker")]
    MovesAfterResult(String),
}

/// Parse a single game record. `index` and `offset` locate the record in its
/// archive and are carried into the result and any error.
pub fn parse_game(text: &str, index: usize, offset: u64) -> Result<PgnGame, PgnError> {
    Parser {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        index,
        offset,
    }
    .run()
}

/// Parse text known to contain exactly one game.
pub fn parse_pgn(text: &str) -> Result<PgnGame, PgnError> {
    parse_game(text, 0, 0)
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    index: usize,
    offset: u64,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<PgnGame, PgnError> {
        let mut tags = HashMap::new();
        let mut moves = Vec::new();
        let mut marker = None;

        while let Some(b) = self.peek() {
            match b {
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'%' if self.at_line_start() => self.skip_line(),
                b';' => self.skip_line(),
                b'[' => {
                    if !moves.is_empty() || marker.is_some() {
                        return Err(self.error_here(PgnErrorKind::UnexpectedCharacter('[')));
                    }
                    let (name, value) = self.tag_pair()?;
                    tags.insert(name, value);
                }
                b'{' => self.skip_comment()?,
                b'(' => self.skip_variation()?,
                b')' => return Err(self.error_here(PgnErrorKind::UnbalancedVariation)),
                b'}' | b']' => return Err(self.error_here(PgnErrorKind::UnexpectedCharacter(b as char))),
                b'$' => {
                    self.pos += 1;
                    self.take_while(|c| c.is_ascii_digit());
                }
                _ => {
                    let start = self.pos;
                    let token = self.token();
                    if let Some(result) = PgnResult::parse(token) {
                        marker = Some(result);
                        continue;
                    }
                    let Some(mv) = strip_move_number(token) else {
                        continue;
                    };
                    let mv = mv.trim_end_matches(['!', '?']);
                    if mv.is_empty() {
                        continue;
                    }
                    if !looks_like_move(mv) {
                        return Err(self.error_at(start, PgnErrorKind::InvalidToken(token.to_string())));
                    }
                    if marker.is_some() {
                        return Err(self.error_at(start, PgnErrorKind::MovesAfterResult(mv.to_string())));
                    }
                    moves.push(mv.to_string());
                }
            }
        }

        if tags.is_empty() && moves.is_empty() && marker.is_none() {
            return Err(self.error_at(0, PgnErrorKind::Empty));
        }

        let result = marker
            .or_else(|| tags.get("Result").and_then(|r: &String| PgnResult::parse(r)))
            .unwrap_or(PgnResult::Ongoing);

        Ok(PgnGame {
            index: self.index,
            offset: self.offset,
            tags,
            moves,
            result,
        })
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.bytes[self.pos - 1] == b'\n'
    }

    fn skip_line(&mut self) {
        self.take_while(|c| c != b'\n');
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn token(&mut self) -> &'a str {
        self.take_while(|c| {
            !c.is_ascii_whitespace() && !matches!(c, b'{' | b'}' | b'(' | b')' | b'[' | b']' | b';' | b'$')
        })
    }

    fn tag_pair(&mut self) -> Result<(String, String), PgnError> {
        let start = self.pos;
        self.pos += 1;
        self.take_while(|c| c == b' ' || c == b'\t');
        let name = self
            .take_while(|c| c.is_ascii_alphanumeric() || c == b'_')
            .to_string();
        self.take_while(|c| c == b' ' || c == b'\t');

        if name.is_empty() || self.peek() != Some(b'"') {
            return match self.find_close(b']') {
                Some(end) => Err(self.error_at(
                    start,
                    PgnErrorKind::InvalidTag(self.text[start..=end].to_string()),
                )),
                None => Err(self.error_at(start, PgnErrorKind::UnterminatedTag)),
            };
        }
        self.pos += 1;

        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => return Err(self.error_at(start, PgnErrorKind::UnterminatedTag)),
                Some(b'\\') if matches!(self.bytes.get(self.pos + 1), Some(b'"') | Some(b'\\')) => {
                    value.push(self.bytes[self.pos + 1] as char);
                    self.pos += 2;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let ch = self.text[self.pos..].chars().next().unwrap_or('\u{fffd}');
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }

        self.take_while(|c| c == b' ' || c == b'\t');
        if self.peek() != Some(b']') {
            return Err(self.error_at(start, PgnErrorKind::UnterminatedTag));
        }
        self.pos += 1;
        Ok((name, value))
    }

    fn find_close(&self, close: u8) -> Option<usize> {
        self.bytes[self.pos..]
            .iter()
            .take_while(|&&c| c != b'\n')
            .position(|&c| c == close)
            .map(|i| self.pos + i)
    }

    fn skip_comment(&mut self) -> Result<(), PgnError> {
        let start = self.pos;
        match self.bytes[self.pos..].iter().position(|&c| c == b'}') {
            Some(i) => {
                self.pos += i + 1;
                Ok(())
            }
            None => Err(self.error_at(start, PgnErrorKind::UnterminatedComment)),
        }
    }

    /// Skip a possibly nested `( ... )` variation, including comments inside it.
    fn skip_variation(&mut self) -> Result<(), PgnError> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                b'{' => {
                    self.skip_comment()?;
                    continue;
                }
                b';' => {
                    self.skip_line();
                    continue;
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error_at(start, PgnErrorKind::UnbalancedVariation))
    }

    fn error_here(&self, kind: PgnErrorKind) -> PgnError {
        self.error_at(self.pos, kind)
    }

    fn error_at(&self, pos: usize, kind: PgnErrorKind) -> PgnError {
        PgnError {
            index: self.index,
            offset: self.offset + pos as u64,
            kind,
        }
    }
}

/// Remove a leading move number (`12.`, `12...`, or the `12.` of `12.e4`).
/// Returns `None` for tokens that are only a move number or ellipsis.
fn strip_move_number(token: &str) -> Option<&str> {
    let digits = token.bytes().take_while(u8::is_ascii_digit).count();
    let rest = &token[digits..];
    if digits > 0 && rest.starts_with('.') {
        let rest = rest.trim_start_matches('.');
        return (!rest.is_empty()).then_some(rest);
    }
    if digits == token.len() || token.bytes().all(|b| b == b'.') {
        return None;
    }
    Some(token)
}

/// Cheap shape check; full validation happens when the move is resolved.
fn looks_like_move(token: &str) -> bool {
    let Some(first) = token.chars().next() else {
        return false;
    };
    let shape = matches!(first, 'a'..='h' | 'N' | 'B' | 'R' | 'Q' | 'K' | 'O' | '0');
    shape
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '=' | 'x' | ':' | '+' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHOLARS: &str = r#"[Event "Club night"]
[Site "Hall"]
[White "Anna"]
[Black "Boris"]
[Result "1-0"]

1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6?? 4. Qxf7# 1-0
"#;

    #[test]
    fn test_tags_and_moves() {
        let game = parse_pgn(SCHOLARS).unwrap();
        assert_eq!(game.white(), Some("Anna"));
        assert_eq!(game.black(), Some("Boris"));
        assert_eq!(game.tag("Site"), Some("Hall"));
        assert_eq!(
            game.moves,
            vec!["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qxf7#"]
        );
        assert_eq!(game.result, PgnResult::WhiteWins);
    }

    #[test]
    fn test_comments_variations_and_nags() {
        let text = "1.e4 {best by test} e5 (1...c5 2.Nf3 (2.c3) d6) 2.Nf3 $1 ; a line comment\n\
                    2...Nc6 {multi\nline} 3.Bb5 a6 *";
        let game = parse_pgn(text).unwrap();
        assert_eq!(game.moves, vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
        assert_eq!(game.result, PgnResult::Ongoing);
    }

    #[test]
    fn test_escaped_tag_value() {
        let game = parse_pgn("[Event \"The \\\"Big\\\" Open\"]\n\n1. d4 1/2-1/2").unwrap();
        assert_eq!(game.tag("Event"), Some("The \"Big\" Open"));
        assert_eq!(game.result, PgnResult::Draw);
    }

    #[test]
    fn test_result_from_tag_without_marker() {
        let game = parse_pgn("[Result \"0-1\"]\n\n1. f3 e5 2. g4 Qh4#").unwrap();
        assert_eq!(game.result, PgnResult::BlackWins);
        assert_eq!(game.moves.len(), 4);
    }

    #[test]
    fn test_percent_escape_line() {
        let game = parse_pgn("% generated by a tool\n1. e4 *").unwrap();
        assert_eq!(game.moves, vec!["e4"]);
    }

    #[test]
    fn test_errors_carry_offset_and_index() {
        let err = parse_game("[White \"Anna\"]\n1. e4 {never closed", 3, 100).unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.kind, PgnErrorKind::UnterminatedComment);
        assert_eq!(err.offset, 100 + 21);

        let err = parse_pgn("[White \"Anna\"\n1. e4").unwrap_err();
        assert_eq!(err.kind, PgnErrorKind::UnterminatedTag);
        assert_eq!(err.offset, 0);

        let err = parse_pgn("1. e4 (1. d4").unwrap_err();
        assert_eq!(err.kind, PgnErrorKind::UnbalancedVariation);

        let err = parse_pgn("1. e4 e5 ) 2. Nf3").unwrap_err();
        assert_eq!(err.kind, PgnErrorKind::UnbalancedVariation);
    }

    #[test]
    fn test_rejects_bad_tokens() {
        let err = parse_pgn("1. e4 @@ 2. Nf3").unwrap_err();
        assert_eq!(err.kind, PgnErrorKind::InvalidToken("@@".to_string()));
        assert_eq!(err.offset, 6);

        let err = parse_pgn("[White Anna]\n1. e4").unwrap_err();
        assert!(matches!(err.kind, PgnErrorKind::InvalidTag(_)));

        let err = parse_pgn("1. e4 1-0 2. d4").unwrap_err();
        assert_eq!(err.kind, PgnErrorKind::MovesAfterResult("d4".to_string()));

        let err = parse_pgn("  \n ").unwrap_err();
        assert_eq!(err.kind, PgnErrorKind::Empty);
    }

    #[test]
    fn test_castling_tokens_survive_number_stripping() {
        let game = parse_pgn("1. O-O 0-0 2. 0-0-0 *").unwrap();
        assert_eq!(game.moves, vec!["O-O", "0-0", "0-0-0"]);
    }

    #[test]
    fn test_move_number_forms() {
        assert_eq!(strip_move_number("12."), None);
        assert_eq!(strip_move_number("12..."), None);
        assert_eq!(strip_move_number("..."), None);
        assert_eq!(strip_move_number("12...Nf6"), Some("Nf6"));
        assert_eq!(strip_move_number("1.e4"), Some("e4"));
        assert_eq!(strip_move_number("0-0"), Some("0-0"));
    }
}
