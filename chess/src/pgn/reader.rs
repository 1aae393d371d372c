//! Splitting a multi-game PGN archive into records.

use std::io::BufRead;

use super::parser::{parse_game, PgnError, PgnGame, PgnResult};

/// The text of one game record and where it starts in its archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub index: usize,
    pub offset: u64,
    pub text: String,
}

impl RawRecord {
    pub fn parse(&self) -> Result<PgnGame, PgnError> {
        parse_game(&self.text, self.index, self.offset)
    }
}

/// Incremental record splitter fed one line at a time.
///
/// A record ends when a tag line follows movetext, or when a blank line
/// follows movetext that closed with a result marker. Brace comments may
/// span lines; nothing inside one ends a record.
#[derive(Debug, Default)]
pub struct RecordSplitter {
    current: String,
    start: u64,
    pos: u64,
    index: usize,
    in_movetext: bool,
    closed_by_result: bool,
    has_content: bool,
    brace_depth: usize,
}

impl RecordSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line, including its terminator. Invalid UTF-8 is
    /// replaced rather than rejected. Record offsets count raw bytes.
    pub fn push_line(&mut self, raw: &[u8]) -> Option<RawRecord> {
        let decoded = String::from_utf8_lossy(raw);
        let line_start = self.pos;
        self.pos += raw.len() as u64;

        let line = match line_start {
            0 => decoded.strip_prefix('\u{feff}').unwrap_or(&*decoded),
            _ => &*decoded,
        };
        let trimmed = line.trim();
        let mut emitted = None;

        if self.brace_depth == 0 {
            if trimmed.is_empty() {
                if self.in_movetext && self.closed_by_result {
                    emitted = self.take_record(self.pos);
                }
                if self.current.is_empty() {
                    self.start = self.pos;
                }
                return emitted;
            }
            // Comment and escape lines ride along with whatever record is
            // open but never start or end one.
            if trimmed.starts_with(';') || line.starts_with('%') {
                if self.current.is_empty() {
                    self.start = line_start;
                }
                self.current.push_str(line);
                return None;
            }
            if trimmed.starts_with('[') {
                if self.in_movetext {
                    emitted = self.take_record(line_start);
                }
                if self.current.is_empty() {
                    self.start = line_start;
                }
                self.current.push_str(line);
                self.has_content = true;
                return emitted;
            }
        }

        if self.current.is_empty() {
            self.start = line_start;
        }
        self.current.push_str(line);
        self.in_movetext = true;
        self.has_content = true;
        let code = strip_line_comment(line, self.brace_depth);
        self.track_braces(line);
        if self.brace_depth == 0 {
            self.closed_by_result = code
                .split_whitespace()
                .next_back()
                .is_some_and(|t| PgnResult::parse(t).is_some());
        }
        emitted
    }

    /// Flush whatever remains once the input is exhausted.
    pub fn finish(&mut self) -> Option<RawRecord> {
        let pos = self.pos;
        self.take_record(pos)
    }

    fn take_record(&mut self, next_start: u64) -> Option<RawRecord> {
        let text = std::mem::take(&mut self.current);
        let start = std::mem::replace(&mut self.start, next_start);
        self.in_movetext = false;
        self.closed_by_result = false;
        self.brace_depth = 0;
        if !std::mem::take(&mut self.has_content) {
            return None;
        }
        let record = RawRecord {
            index: self.index,
            offset: start,
            text,
        };
        self.index += 1;
        Some(record)
    }

    fn track_braces(&mut self, line: &str) {
        for c in line.chars() {
            match c {
                '{' => self.brace_depth += 1,
                '}' => self.brace_depth = self.brace_depth.saturating_sub(1),
                ';' if self.brace_depth == 0 => break,
                _ => {}
            }
        }
    }
}

/// The part of a movetext line before a `;` comment that starts outside
/// braces. `depth` is the brace depth at the start of the line.
fn strip_line_comment(line: &str, mut depth: usize) -> &str {
    for (i, c) in line.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => return &line[..i],
            _ => {}
        }
    }
    line
}

#[derive(Debug, thiserror::Error)]
pub enum PgnReadError {
    #[error("failed to read PGN input: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] PgnError),
}

/// Lazily yields one parsed game per record of a buffered reader. A parse
/// failure is yielded for its record and reading continues; an I/O failure
/// ends the iteration.
pub struct PgnReader<R> {
    inner: R,
    splitter: RecordSplitter,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> PgnReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            splitter: RecordSplitter::new(),
            buf: Vec::with_capacity(256),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for PgnReader<R> {
    type Item = Result<PgnGame, PgnReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return self.splitter.finish().map(|r| r.parse().map_err(Into::into));
                }
                Ok(_) => {
                    if let Some(record) = self.splitter.push_line(&self.buf) {
                        return Some(record.parse().map_err(Into::into));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}
