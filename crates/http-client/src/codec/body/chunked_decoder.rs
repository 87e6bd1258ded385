//! Decoder for response bodies sent with chunked transfer encoding.
//!
//! Follows [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1):
//! every chunk is a hexadecimal size line (optionally carrying extensions),
//! the chunk data and a CRLF. A zero sized chunk ends the body; trailer fields
//! after it are read and dropped.
//!
//! The decoder hands out chunk data as soon as it is buffered, so a chunk
//! that spans several socket reads is delivered in several pieces.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{ParseError, PayloadItem};
use ChunkedState::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining: u64,
    /// at least one hex digit of the current size line was read
    size_digits: bool,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, remaining: 0, size_digits: false }
    }

    /// Returns true once the terminating zero sized chunk and trailers were read.
    pub fn is_finished(&self) -> bool {
        self.state == End
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// hex digits of the chunk size
    Size,
    /// whitespace between the size and the extensions or CR
    SizeLws,
    /// `;name=value` chunk extensions, ignored
    Extension,
    /// LF closing the size line
    SizeLf,
    /// chunk data
    Body,
    /// CR after chunk data
    BodyCr,
    /// LF after chunk data
    BodyLf,
    /// a trailer field line, ignored
    Trailer,
    /// LF closing a trailer line
    TrailerLf,
    /// CR of the final empty line, or the first byte of a trailer
    EndCr,
    /// LF of the final empty line
    EndLf,
    End,
}

/// What one step of the state machine produced.
enum Step {
    Next(ChunkedState),
    Data(ChunkedState, bytes::Bytes),
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when chunk data is available
    /// - `Ok(Some(PayloadItem::Eof))` once the last chunk has been read
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the chunk framing is malformed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            match self.step(src)? {
                Step::Next(state) => self.state = state,
                Step::Data(state, bytes) => {
                    self.state = state;
                    trace!(len = bytes.len(), "read chunked bytes");
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(ParseError::truncated_body(format!("chunked body ended in state {:?}", self.state))),
        }
    }
}

impl ChunkedDecoder {
    /// Consumes bytes of `src` for the current state. `src` is never empty here.
    fn step(&mut self, src: &mut BytesMut) -> Result<Step, ParseError> {
        if self.state == Body {
            return Ok(self.read_body(src));
        }

        let byte = src.get_u8();
        let next = match (self.state, byte) {
            (Size, b) if b.is_ascii_hexdigit() => {
                self.push_size_digit(b)?;
                Size
            }
            // a size line needs at least one digit
            (Size, b'\t' | b' ' | b';' | b'\r') if !self.size_digits => {
                return Err(ParseError::invalid_body("missing chunk size"));
            }
            (Size | SizeLws, b'\t' | b' ') => SizeLws,
            (Size | SizeLws, b';') => Extension,
            (Size | SizeLws | Extension, b'\r') => SizeLf,
            (Size, _) => return Err(ParseError::invalid_body("invalid chunk size line")),
            (SizeLws, _) => return Err(ParseError::invalid_body("invalid chunk size linear white space")),

            // a bare LF inside an extension would let a lax peer smuggle a chunk
            (Extension, b'\n') => return Err(ParseError::invalid_body("invalid chunk extension contains newline")),
            (Extension, _) => Extension,

            (SizeLf, b'\n') if self.remaining == 0 => EndCr,
            (SizeLf, b'\n') => Body,
            (SizeLf, _) => return Err(ParseError::invalid_body("invalid chunk size LF")),

            (BodyCr, b'\r') => BodyLf,
            (BodyCr, _) => return Err(ParseError::invalid_body("invalid chunk body CR")),
            (BodyLf, b'\n') => {
                self.size_digits = false;
                Size
            }
            (BodyLf, _) => return Err(ParseError::invalid_body("invalid chunk body LF")),

            (Trailer, b'\r') => TrailerLf,
            (Trailer, _) => Trailer,
            (TrailerLf, b'\n') => EndCr,
            (TrailerLf, _) => return Err(ParseError::invalid_body("invalid trailer end LF")),

            (EndCr, b'\r') => EndLf,
            (EndCr, _) => Trailer,
            (EndLf, b'\n') => End,
            (EndLf, _) => return Err(ParseError::invalid_body("invalid chunk end LF")),

            (Body | End, _) => unreachable!("handled before reading a byte"),
        };

        Ok(Step::Next(next))
    }

    fn push_size_digit(&mut self, digit: u8) -> Result<(), ParseError> {
        let value = match digit {
            b'0'..=b'9' => digit - b'0',
            b'a'..=b'f' => digit - b'a' + 10,
            _ => digit - b'A' + 10,
        };
        self.size_digits = true;

        self.remaining = self
            .remaining
            .checked_mul(16)
            .and_then(|size| size.checked_add(u64::from(value)))
            .ok_or_else(|| ParseError::invalid_body("invalid overflow chunked length"))?;
        Ok(())
    }

    fn read_body(&mut self, src: &mut BytesMut) -> Step {
        let available = src.len() as u64;
        let read_size = self.remaining.min(available);
        self.remaining -= read_size;

        // read_size <= src.len(), so it fits usize
        let bytes = src.split_to(usize::try_from(read_size).unwrap_or(src.len())).freeze();
        let next = if self.remaining == 0 { BodyCr } else { Body };
        Step::Data(next, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn collect(decoder: &mut ChunkedDecoder, buffer: &mut BytesMut) -> (Vec<u8>, bool) {
        let mut body = Vec::new();
        while let Some(item) = decoder.decode(buffer).unwrap() {
            match item {
                PayloadItem::Chunk(bytes) => body.extend_from_slice(&bytes),
                PayloadItem::Eof => return (body, true),
            }
        }
        (body, false)
    }

    #[test]
    fn test_basic() {
        let mut buffer = BytesMut::from(&b"10\r\n1234567890abcdef\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"1234567890abcdef"));

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_multiple_chunks() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n"[..]);
        let (body, eof) = collect(&mut ChunkedDecoder::new(), &mut buffer);
        assert_eq!(body, b"hello, world");
        assert!(eof);
    }

    #[test]
    fn test_uppercase_size_and_extensions() {
        let mut buffer = BytesMut::from(&b"A;name=value\r\n0123456789\r\n0 ;last\r\n\r\n"[..]);
        let (body, eof) = collect(&mut ChunkedDecoder::new(), &mut buffer);
        assert_eq!(body, b"0123456789");
        assert!(eof);
    }

    #[test]
    fn test_trailers_are_dropped() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n0\r\nX-Checksum: abc\r\nX-Other: 1\r\n\r\n"[..]);
        let (body, eof) = collect(&mut ChunkedDecoder::new(), &mut buffer);
        assert_eq!(body, b"hello");
        assert!(eof);
    }

    #[test]
    fn test_split_across_reads() {
        let mut decoder = ChunkedDecoder::new();
        let mut buffer = BytesMut::from(&b"5\r\nhel"[..]);

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hel"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"lo\r");
        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"lo"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"\n0\r\n\r\n");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_invalid_chunk_size() {
        let mut buffer = BytesMut::from(&b"xyz\r\n"[..]);
        assert!(matches!(ChunkedDecoder::new().decode(&mut buffer), Err(ParseError::InvalidBody { .. })));
    }

    #[test]
    fn test_missing_crlf() {
        let mut buffer = BytesMut::from(&b"5\r\nhelloBad"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_chunk());
        assert!(decoder.decode(&mut buffer).is_err());
    }

    #[test]
    fn test_missing_chunk_size() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n\r\n\r\n5\r\nworld\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert_eq!(decoder.decode(&mut buffer).unwrap().unwrap().into_bytes().unwrap(), "hello");
        assert!(matches!(decoder.decode(&mut buffer), Err(ParseError::InvalidBody { .. })));
        assert!(!decoder.is_finished());

        let mut buffer = BytesMut::from(&b";ext\r\n\r\n"[..]);
        assert!(matches!(ChunkedDecoder::new().decode(&mut buffer), Err(ParseError::InvalidBody { .. })));

        let mut buffer = BytesMut::from(&b" 5\r\nhello\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }

    #[test]
    fn test_size_overflow() {
        let mut buffer = BytesMut::from(&b"fffffffffffffffff\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }

    #[test]
    fn test_newline_in_extension() {
        let mut buffer = BytesMut::from(&b"5;ext\nhello\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }

    #[test]
    fn test_eof_before_last_chunk_is_truncated() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_chunk());
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert!(matches!(decoder.decode_eof(&mut buffer), Err(ParseError::TruncatedBody { .. })));
    }

    #[test]
    fn test_large_chunk() {
        let size = 1024 * 1024;
        let mut data = format!("{size:x}\r\n").into_bytes();
        data.extend(vec![b'A'; size]);
        data.extend(b"\r\n0\r\n\r\n");

        let mut buffer = BytesMut::from(&data[..]);
        let (body, eof) = collect(&mut ChunkedDecoder::new(), &mut buffer);
        assert_eq!(body.len(), size);
        assert!(body.iter().all(|&b| b == b'A'));
        assert!(eof);
    }
}
