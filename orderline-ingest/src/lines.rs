//! JSON-lines message source.
//!
//! Reads one message per non-blank line from any `AsyncBufRead`: standard
//! input, a file, or an in-memory buffer. The offset of a message is its
//! 1-based line number. End of input is reported as `Closed`.
//!
//! Lines are handed over as raw bytes. A line that is not UTF-8 still
//! becomes a message and is rejected when decoded.

use std::io::{self, Read};
use std::path::Path;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use orderline_core::SourceError;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader, ReadBuf, Split};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::source::{MessageSource, RawMessage};

/// Chunks buffered between the reader thread and the source.
const THREAD_QUEUE_DEPTH: usize = 16;
const THREAD_CHUNK_SIZE: usize = 8 * 1024;

pub struct JsonLinesSource<R> {
    lines: Split<R>,
    line_no: u64,
    committed: Option<u64>,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.split(b'\n'),
            line_no: 0,
            committed: None,
        }
    }

    /// Highest acknowledged line number.
    pub fn committed_offset(&self) -> Option<u64> {
        self.committed
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a JSON-lines file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|e| SourceError::Transport {
            reason: format!("cannot open {}: {}", path.display(), e),
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl JsonLinesSource<BufReader<ThreadedReader>> {
    /// Read JSON lines from standard input.
    ///
    /// Standard input is read on a dedicated thread, so a pending read does
    /// not hold up runtime shutdown.
    pub fn stdin() -> Result<Self, SourceError> {
        let reader = ThreadedReader::spawn("orderline-stdin", io::stdin()).map_err(|e| {
            SourceError::Transport {
                reason: format!("cannot start stdin reader: {}", e),
            }
        })?;
        Ok(Self::new(BufReader::new(reader)))
    }
}

// ============================================================================
// THREADED READER
// ============================================================================

/// `AsyncRead` over a blocking reader driven by a detached thread.
///
/// tokio's own `Stdin` reads on the blocking pool, and the runtime waits for
/// that read to finish before it shuts down. The thread here is never joined;
/// it exits at the next chunk once the reader side is dropped.
pub struct ThreadedReader {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ThreadedReader {
    pub fn spawn<R>(name: &str, mut inner: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(THREAD_QUEUE_DEPTH);
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut buf = vec![0u8; THREAD_CHUNK_SIZE];
                loop {
                    let chunk = match inner.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => Ok(buf[..n].to_vec()),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => Err(e),
                    };
                    let failed = chunk.is_err();
                    if tx.blocking_send(chunk).is_err() || failed {
                        break;
                    }
                }
            })?;
        Ok(Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
        })
    }
}

impl AsyncRead for ThreadedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.pos >= this.chunk.len() {
            match ready!(this.rx.poll_recv(cx)) {
                Some(Ok(chunk)) => {
                    this.chunk = chunk;
                    this.pos = 0;
                }
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // Sender gone: end of input.
                None => return Poll::Ready(Ok(())),
            }
        }

        let n = (this.chunk.len() - this.pos).min(buf.remaining());
        buf.put_slice(&this.chunk[this.pos..this.pos + n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl<R> MessageSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn fetch_next(&mut self, timeout: Duration) -> Result<RawMessage, SourceError> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut line = match tokio::time::timeout_at(deadline, self.lines.next_segment()).await {
                Err(_) => return Err(SourceError::Timeout),
                Ok(Err(e)) => {
                    return Err(SourceError::Transport {
                        reason: e.to_string(),
                    })
                }
                Ok(Ok(None)) => return Err(SourceError::Closed),
                Ok(Ok(Some(line))) => line,
            };
            self.line_no += 1;

            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(RawMessage::new(self.line_no, line));
        }
    }

    async fn acknowledge(&mut self, message: &RawMessage) -> Result<(), SourceError> {
        self.committed = Some(self.committed.map_or(message.offset, |c| c.max(message.offset)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(100);

    fn source(input: &'static str) -> JsonLinesSource<BufReader<&'static [u8]>> {
        JsonLinesSource::new(BufReader::new(input.as_bytes()))
    }

    #[tokio::test]
    async fn test_lines_become_messages() {
        let mut src = source("{\"a\":1}\n\n  \n{\"b\":2}\n");
        let first = src.fetch_next(WAIT).await.unwrap();
        assert_eq!(first.offset, 1);
        assert_eq!(first.payload, b"{\"a\":1}");

        let second = src.fetch_next(WAIT).await.unwrap();
        assert_eq!(second.offset, 4);

        assert_eq!(src.fetch_next(WAIT).await, Err(SourceError::Closed));
    }

    #[tokio::test]
    async fn test_acknowledge_advances_watermark() {
        let mut src = source("x\ny\n");
        let x = src.fetch_next(WAIT).await.unwrap();
        let y = src.fetch_next(WAIT).await.unwrap();
        assert_eq!(src.committed_offset(), None);

        src.acknowledge(&y).await.unwrap();
        src.acknowledge(&x).await.unwrap();
        assert_eq!(src.committed_offset(), Some(2));
    }

    #[tokio::test]
    async fn test_open_missing_file_is_transport_error() {
        let result = JsonLinesSource::open("/nonexistent/orders.jsonl").await;
        assert!(matches!(result, Err(SourceError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_delivered_and_counted() {
        let mut src = JsonLinesSource::new(BufReader::new(&b"\xff\xfe\n{\"a\":1}\r\n"[..]));

        let garbage = src.fetch_next(WAIT).await.unwrap();
        assert_eq!(garbage.offset, 1);
        assert_eq!(garbage.payload, b"\xff\xfe");

        let next = src.fetch_next(WAIT).await.unwrap();
        assert_eq!(next.offset, 2);
        assert_eq!(next.payload, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_threaded_reader_yields_lines_then_closes() {
        let reader =
            ThreadedReader::spawn("lines-test", io::Cursor::new(b"{\"a\":1}\n{\"b\":2}".to_vec()))
                .unwrap();
        let mut src = JsonLinesSource::new(BufReader::new(reader));

        assert_eq!(src.fetch_next(WAIT).await.unwrap().offset, 1);
        let last = src.fetch_next(WAIT).await.unwrap();
        assert_eq!(last.offset, 2);
        assert_eq!(last.payload, b"{\"b\":2}");
        assert_eq!(src.fetch_next(WAIT).await, Err(SourceError::Closed));
    }

    /// Blocks in `read` until its sender is dropped.
    struct Stalled(std::sync::mpsc::Receiver<()>);

    impl Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn test_stalled_reader_does_not_block_runtime_shutdown() {
        let (release, stalled) = std::sync::mpsc::channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let result = runtime.block_on(async {
            let reader = ThreadedReader::spawn("stalled-test", Stalled(stalled)).unwrap();
            let mut src = JsonLinesSource::new(BufReader::new(reader));
            src.fetch_next(Duration::from_millis(20)).await
        });
        assert_eq!(result, Err(SourceError::Timeout));

        // Returns while the reader thread is still parked in `read`.
        drop(runtime);
        drop(release);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_reader_times_out() {
        let (reader, _writer) = tokio::io::duplex(64);
        let mut src = JsonLinesSource::new(BufReader::new(reader));
        assert_eq!(
            src.fetch_next(Duration::from_secs(5)).await,
            Err(SourceError::Timeout)
        );
    }
}
