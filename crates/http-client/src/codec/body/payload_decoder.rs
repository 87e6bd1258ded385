//! Decoder for HTTP response payloads.
//!
//! This module provides a unified decoder for the ways a response body can be framed:
//! - Content-Length based payloads
//! - Chunked transfer encoding
//! - Bodies delimited by connection close
//! - Messages with no body
//!
//! The header decoder picks the strategy; see [`PayloadSize`].

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::codec::body::until_close_decoder::UntilCloseDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A unified decoder for handling HTTP response payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    /// The specific decoding strategy to use
    kind: Kind,
}

/// Enum representing different payload decoding strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Decode payload using chunked transfer encoding
    Chunked(ChunkedDecoder),

    /// Everything until the connection closes
    UntilClose(UntilCloseDecoder),

    /// Handle messages with no body
    NoBody,
}

impl PayloadDecoder {
    /// Creates a PayloadDecoder for messages with no body.
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    /// Creates a PayloadDecoder for chunked transfer encoding.
    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    /// Creates a PayloadDecoder for a fixed-length payload.
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    /// Creates a PayloadDecoder that reads until end of stream.
    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose(UntilCloseDecoder) }
    }

    /// Returns whether this decoder handles chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    /// Returns whether this decoder handles messages with no body.
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }

    /// Returns whether this decoder handles fixed-length payloads.
    pub fn is_fix_length(&self) -> bool {
        matches!(self.kind, Kind::Length(_))
    }

    /// Returns whether the body ends with the connection.
    pub fn is_until_close(&self) -> bool {
        matches!(self.kind, Kind::UntilClose(_))
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(n) => PayloadDecoder::fix_length(n),
            PayloadSize::Chunked => PayloadDecoder::chunked(),
            PayloadSize::UntilClose => PayloadDecoder::until_close(),
            PayloadSize::Empty => PayloadDecoder::empty(),
        }
    }
}

/// Delegates to the decoder selected for this payload.
impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::UntilClose(until_close_decoder) => until_close_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }

    /// Same as [`decode`](Self::decode), called once the peer closed the stream.
    ///
    /// A fixed-length or chunked body that has not been completed is an error here.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode_eof(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode_eof(src),
            Kind::UntilClose(until_close_decoder) => until_close_decoder.decode_eof(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_decoder_from_payload_size() {
        assert!(PayloadDecoder::from(PayloadSize::Length(3)).is_fix_length());
        assert!(PayloadDecoder::from(PayloadSize::Chunked).is_chunked());
        assert!(PayloadDecoder::from(PayloadSize::UntilClose).is_until_close());
        assert!(PayloadDecoder::from(PayloadSize::Empty).is_empty());
    }

    #[test]
    fn no_body_is_immediately_eof() {
        let mut buffer = BytesMut::from(&b"ignored"[..]);
        assert!(PayloadDecoder::empty().decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(&buffer[..], b"ignored");
    }
}
