//! HTTP response decoder module
//!
//! Decodes a response in two phases, the way the reader drives it:
//! 1. Header parsing with [`ResponseHeadDecoder`]
//! 2. Payload decoding with the [`PayloadDecoder`] the head selected
//!
//! Interim `1xx` heads (for example `100 Continue`) are consumed silently; the
//! first final head is the one reported.
//!
//! # Example
//!
//! ```
//! use micro_http_client::codec::ResponseDecoder;
//! use micro_http_client::protocol::{Message, PayloadItem};
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = ResponseDecoder::new();
//! let mut buffer = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");
//!
//! let head = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert!(head.is_header());
//! let body = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(body.into_payload_item(), Some(PayloadItem::Chunk("ok".into())));
//! ```

use crate::codec::body::PayloadDecoder;
use crate::codec::header::ResponseHeadDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHead};
use bytes::BytesMut;
use http::{Method, StatusCode};
use tokio_util::codec::Decoder;
use tracing::trace;

/// A decoder for HTTP responses that handles both the head and the payload
///
/// # State Machine
///
/// The decoder maintains its state through the `payload_decoder` field:
/// - `None`: Currently parsing the head
/// - `Some(PayloadDecoder)`: Currently parsing payload
#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: ResponseHeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
    head_request: bool,
    finished: bool,
}

impl ResponseDecoder {
    /// Creates a new `ResponseDecoder` instance
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a decoder for the response to a request made with `method`.
    ///
    /// Responses to `HEAD` never have a body, whatever their headers say.
    pub fn for_method(method: &Method) -> Self {
        Self { head_request: *method == Method::HEAD, ..Default::default() }
    }

    /// Returns true once the head has been decoded.
    pub fn is_head_decoded(&self) -> bool {
        self.payload_decoder.is_some() || self.finished
    }

    /// Returns true once the payload reached its end.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn decode_payload(&mut self, src: &mut BytesMut, eof: bool) -> Result<Option<Message<(ResponseHead, PayloadSize)>>, ParseError> {
        let Some(payload_decoder) = &mut self.payload_decoder else {
            return Ok(None);
        };

        let item = if eof { payload_decoder.decode_eof(src)? } else { payload_decoder.decode(src)? };
        let message = match item {
            Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
            Some(item @ PayloadItem::Eof) => {
                self.payload_decoder.take();
                self.finished = true;
                Some(Message::Payload(item))
            }
            None => None,
        };
        Ok(message)
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self { header_decoder: ResponseHeadDecoder, payload_decoder: None, head_request: false, finished: false }
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, PayloadSize)>;
    type Error = ParseError;

    /// Attempts to decode the next piece of the response from the buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: Successfully decoded the final response head
    /// - `Ok(Some(Message::Payload(_)))`: Successfully decoded a payload chunk or the end of it
    /// - `Ok(None)`: Need more data to proceed, or the response is finished
    /// - `Err(_)`: Encountered a parsing error
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            return Ok(None);
        }

        if self.payload_decoder.is_some() {
            return self.decode_payload(src, false);
        }

        loop {
            let Some((head, payload_size)) = self.header_decoder.decode(src)? else {
                return Ok(None);
            };

            // 101 switches protocols and is final; the other 1xx precede the real head
            if head.status().is_informational() && head.status() != StatusCode::SWITCHING_PROTOCOLS {
                trace!(status = head.status().as_u16(), "skipped interim response");
                continue;
            }

            let payload_size = if self.head_request { PayloadSize::new_empty() } else { payload_size };
            self.payload_decoder = Some(payload_size.into());
            return Ok(Some(Message::Header((head, payload_size))));
        }
    }

    /// Called once the server closed the connection.
    ///
    /// # Errors
    ///
    /// - [`ParseError::IncompleteHeader`] if the head never completed
    /// - [`ParseError::TruncatedBody`] if a framed body stopped short
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            return Ok(None);
        }

        if self.payload_decoder.is_some() {
            return self.decode_payload(src, true);
        }

        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None => Err(ParseError::IncompleteHeader),
        }
    }
}
