//! Decoder for response bodies that end when the server closes the connection.
//!
//! Used when a response carries neither `Content-Length` nor chunked
//! `Transfer-Encoding` ([RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3), rule 8).
//! Whatever is buffered is handed out as one chunk; only end of stream ends the body.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UntilCloseDecoder;

impl Decoder for UntilCloseDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        Ok(Some(PayloadItem::Chunk(src.split().freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Ok(Some(PayloadItem::Eof)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_out_everything_buffered() {
        let mut buffer = BytesMut::from(&b"partial body"[..]);
        let item = UntilCloseDecoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.into_bytes().unwrap(), "partial body");
        assert!(buffer.is_empty());
        assert!(UntilCloseDecoder.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn end_of_stream_is_eof() {
        let mut buffer = BytesMut::from(&b"tail"[..]);
        assert!(UntilCloseDecoder.decode_eof(&mut buffer).unwrap().unwrap().is_chunk());
        assert!(UntilCloseDecoder.decode_eof(&mut buffer).unwrap().unwrap().is_eof());
    }
}
