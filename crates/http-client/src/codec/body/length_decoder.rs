//! Decoder for response bodies framed by a `Content-Length` header.
//!
//! See [RFC 9112 Section 6.2](https://www.rfc-editor.org/rfc/rfc9112#section-6.2).
//! Bytes past the announced length are left in the buffer and never handed out.

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Tracks the remaining bytes of a fixed-length body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// The number of bytes remaining to be read from the payload
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    pub fn remaining(&self) -> u64 {
        self.length
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// # Returns
    /// * `Ok(Some(PayloadItem::Eof))` when all bytes have been read
    /// * `Ok(Some(PayloadItem::Chunk(bytes)))` with at most the remaining length
    /// * `Ok(None)` when more data is needed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.length, src.len() as u64);
        // len <= src.len()
        let bytes = src.split_to(usize::try_from(len).unwrap_or(src.len())).freeze();

        self.length -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(ParseError::truncated_body(format!("{} bytes of content-length still missing", self.length))),
        }
    }
}
