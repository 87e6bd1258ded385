//! HTTP response head decoder.
//!
//! Turns the status line and header fields at the front of a response into a
//! [`ResponseHead`] and decides how the body that follows is framed.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: 16KB
//! - Only HTTP/1.0 and HTTP/1.1 responses are accepted
//!
//! # Body framing
//!
//! Checked in this order:
//!
//! 1. `204 No Content`, `304 Not Modified` and `1xx` never carry a body
//! 2. `Content-Length: N` frames exactly `N` bytes
//! 3. `Transfer-Encoding` whose last coding is `chunked` is decoded chunk by chunk
//! 4. anything else runs until the server closes the connection

use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, ResponseHead};

/// Maximum number of headers allowed in a response
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Decoder for HTTP response heads implementing the [`Decoder`] trait.
///
/// On success the head bytes, including the terminating empty line, are
/// removed from the buffer; any body bytes that arrived with them stay.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseHeadDecoder;

impl Decoder for ResponseHeadDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ParseError;

    /// # Returns
    ///
    /// - `Ok(Some((head, payload_size)))` if a complete head was parsed
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if parsing failed or the head is too large
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut resp = httparse::Response::new(&mut headers);

        let parsed_result = resp.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        let body_offset = match parsed_result? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, "parsed response head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match resp.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let status = resp
            .code
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or(ParseError::InvalidStatus(resp.code))?;

        let mut header_map = HeaderMap::with_capacity(resp.headers.len());
        for header in resp.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
            header_map.append(name, value);
        }

        let mut head = Response::new(());
        *head.status_mut() = status;
        *head.version_mut() = version;
        *head.headers_mut() = header_map;

        let _ = src.split_to(body_offset);
        let payload_size = parse_payload(&head)?;

        Ok(Some((head, payload_size)))
    }
}

/// Determines how the body of `head` is framed.
///
/// # Errors
///
/// Returns `ParseError` if `Content-Length` is not a number, or is repeated
/// with different values.
fn parse_payload(head: &ResponseHead) -> Result<PayloadSize, ParseError> {
    let status = head.status();
    if status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return Ok(PayloadSize::new_empty());
    }

    if let Some(length) = content_length(head.headers())? {
        return Ok(PayloadSize::new_length(length));
    }

    if is_chunked(head.headers().get(http::header::TRANSFER_ENCODING)) {
        return Ok(PayloadSize::new_chunked());
    }

    Ok(PayloadSize::new_until_close())
}

fn content_length(headers: &HeaderMap) -> Result<Option<u64>, ParseError> {
    let mut length = None;
    for value in headers.get_all(http::header::CONTENT_LENGTH) {
        let cl_str = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
        // `Content-Length: 42, 42` is a legal list of identical values
        for part in cl_str.split(',') {
            let parsed = part
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;
            match length {
                Some(existing) if existing != parsed => {
                    return Err(ParseError::invalid_content_length(format!("conflicting values {existing} and {parsed}")));
                }
                _ => length = Some(parsed),
            }
        }
    }
    Ok(length)
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 9112, chunked must be the last encoding if present.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    header_value
        .and_then(|value| value.as_bytes().rsplit(|b| *b == b',').next())
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(CHUNKED))
}
