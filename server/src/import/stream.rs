use chess::pgn::{RawRecord, RecordSplitter};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::Stream;

/// Split an async byte stream into raw PGN records, reading one line at a
/// time. An I/O error is yielded once and ends the stream.
pub fn pgn_records<R>(mut reader: R) -> impl Stream<Item = std::io::Result<RawRecord>>
where
    R: AsyncBufRead + Unpin,
{
    async_stream::stream! {
        let mut splitter = RecordSplitter::new();
        let mut line = Vec::with_capacity(256);
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => {
                    if let Some(record) = splitter.finish() {
                        yield Ok(record);
                    }
                    break;
                }
                Ok(_) => {
                    if let Some(record) = splitter.push_line(&line) {
                        yield Ok(record);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};
    use tokio_stream::StreamExt;

    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone")))
        }
    }

    #[tokio::test]
    async fn test_records_are_yielded_lazily() {
        let archive = b"[White \"A\"]\n[Black \"B\"]\n\n1. e4 e5 1-0\n\n[White \"C\"]\n[Black \"D\"]\n\n1. d4 *\n";
        let records: Vec<_> = pgn_records(&archive[..]).collect().await;
        assert_eq!(records.len(), 2);

        let first = records[0].as_ref().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.offset, 0);
        let second = records[1].as_ref().unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.parse().unwrap().white(), Some("C"));
    }

    #[tokio::test]
    async fn test_read_error_ends_stream() {
        let head: &[u8] = b"[White \"A\"]\n[Black \"B\"]\n\n1. e4 e5 1-0\n\n[White \"C\"]\n";
        let reader = BufReader::new(head.chain(Broken));
        let records: Vec<_> = pgn_records(reader).collect().await;

        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert_eq!(
            records[1].as_ref().unwrap_err().kind(),
            io::ErrorKind::ConnectionReset
        );
    }
}
