pub mod parser;
pub mod reader;
pub mod san;

pub use parser::{parse_game, parse_pgn, PgnError, PgnErrorKind, PgnGame, PgnResult};
pub use reader::{PgnReadError, PgnReader, RawRecord, RecordSplitter};
pub use san::{format_san, parse_san, MoveError, MoveErrorReason, San, SanError};
