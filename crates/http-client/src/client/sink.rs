//! Consumers of a streamed response body.

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

/// Receives the body of a streaming request piece by piece, in arrival order.
///
/// Returning `false` asks the reader to stop: the request is cancelled and
/// no further chunk is delivered.
#[cfg_attr(test, mockall::automock)]
pub trait BodySink {
    fn on_chunk(&mut self, chunk: &Bytes) -> bool;
}

impl<F> BodySink for F
where
    F: FnMut(&[u8]) -> bool,
{
    fn on_chunk(&mut self, chunk: &Bytes) -> bool {
        self(chunk.as_ref())
    }
}

/// Splits a streamed body into `\n` terminated lines.
///
/// Newline delimited JSON and server-sent events arrive in arbitrary pieces;
/// this sink buffers the unfinished tail of each chunk and calls `on_line`
/// once per complete line, without the terminator and a trailing `\r`.
/// Empty lines are skipped. Invalid UTF-8 is replaced, not rejected.
///
/// ```
/// use bytes::Bytes;
/// use micro_http_client::client::{BodySink, LineSink};
///
/// let mut lines = Vec::new();
/// let mut sink = LineSink::new(|line: &str| {
///     lines.push(line.to_string());
///     true
/// });
/// sink.on_chunk(&Bytes::from_static(b"{\"done\":fal"));
/// sink.on_chunk(&Bytes::from_static(b"se}\r\n{\"done\":true}"));
/// sink.finish();
/// drop(sink);
/// assert_eq!(lines, ["{\"done\":false}", "{\"done\":true}"]);
/// ```
#[derive(Debug)]
pub struct LineSink<F> {
    pending: BytesMut,
    on_line: F,
}

impl<F> LineSink<F>
where
    F: FnMut(&str) -> bool,
{
    pub fn new(on_line: F) -> Self {
        Self { pending: BytesMut::new(), on_line }
    }

    /// Delivers a final line that was not terminated by `\n`.
    ///
    /// Returns what the callback returned, or `true` if nothing was pending.
    pub fn finish(&mut self) -> bool {
        if self.pending.is_empty() {
            return true;
        }
        let line = self.pending.split();
        self.deliver(&line)
    }

    fn deliver(&mut self, line: &[u8]) -> bool {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            return true;
        }
        (self.on_line)(&String::from_utf8_lossy(line))
    }
}

impl<F> BodySink for LineSink<F>
where
    F: FnMut(&str) -> bool,
{
    fn on_chunk(&mut self, chunk: &Bytes) -> bool {
        self.pending.extend_from_slice(chunk);

        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line = self.pending.split_to(end);
            self.pending.advance(1);
            if !self.deliver(&line) {
                trace!(buffered = self.pending.len(), "line consumer stopped the stream");
                return false;
            }
        }
        true
    }
}
