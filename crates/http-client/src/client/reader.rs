//! Blocking response readers.
//!
//! Both readers pull bytes from any [`Read`] in reads of
//! [`ClientConfig::read_size`] bytes, feed them to a [`ResponseDecoder`] and
//! check the request's [`CancelHandle`] before every read.
//!
//! - [`read_body`] collects the whole body and returns it
//! - [`read_streaming`] hands every piece of the body to a [`BodySink`] as
//!   soon as it arrives
//!
//! A status of 400 or above is reported as [`ClientError::Http`] carrying
//! the start of the error body, read with the same framing rules. An error
//! body that only ends when the server closes is cut at what arrived with
//! the head, so a server holding the socket open can't delay the error.

use std::io::{self, Read};

use bytes::{Bytes, BytesMut};
use http::Method;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::client::BodySink;
use crate::codec::ResponseDecoder;
use crate::config::ClientConfig;
use crate::connection::CancelHandle;
use crate::ensure;
use crate::protocol::{ClientError, Message, ParseError, PayloadItem, PayloadSize, ResponseHead};

/// Reads a complete response and returns its body.
///
/// # Errors
///
/// - [`ClientError::Http`] for a status of 400 or above
/// - [`ClientError::Protocol`] for malformed framing, or a stream that ended
///   before the head or the announced body was complete
/// - [`ClientError::Cancelled`] once the cancel handle fired
/// - [`ClientError::Io`] if reading failed
pub fn read_body<R: Read>(
    reader: &mut R,
    method: &Method,
    cancel: &CancelHandle,
    config: &ClientConfig,
) -> Result<Bytes, ClientError> {
    let mut response = ResponseReader::new(reader, method, cancel, config);
    let (head, payload_size) = response.read_head()?;
    check_status(&head, payload_size, &mut response, config)?;

    let mut body = BytesMut::with_capacity(initial_capacity(payload_size, config));
    while let Some(chunk) = response.next_chunk()? {
        body.extend_from_slice(&chunk);
    }

    trace!(status = head.status().as_u16(), len = body.len(), "read response body");
    Ok(body.freeze())
}

/// Reads a response and delivers its body to `sink` piece by piece.
///
/// Body bytes that arrived together with the head form the first piece;
/// after that each read yields one piece (chunked bodies are delivered as
/// decoded chunk data). The call returns `Ok(())` when the body ends, when the
/// sink returns `false` (which also cancels the request), or when the request
/// was cancelled.
///
/// # Errors
///
/// Same as [`read_body`], except that cancellation is not an error. The sink
/// is never invoked for an error status.
pub fn read_streaming<R, S>(
    reader: &mut R,
    method: &Method,
    cancel: &CancelHandle,
    config: &ClientConfig,
    sink: &mut S,
) -> Result<(), ClientError>
where
    R: Read,
    S: BodySink + ?Sized,
{
    let mut response = ResponseReader::new(reader, method, cancel, config);
    match stream_body(&mut response, config, sink) {
        Err(ClientError::Cancelled) => {
            debug!("streaming request cancelled");
            Ok(())
        }
        result => result,
    }
}

fn stream_body<R, S>(response: &mut ResponseReader<'_, R>, config: &ClientConfig, sink: &mut S) -> Result<(), ClientError>
where
    R: Read,
    S: BodySink + ?Sized,
{
    let (head, payload_size) = response.read_head()?;
    check_status(&head, payload_size, response, config)?;

    let mut delivered = 0usize;
    while let Some(chunk) = response.next_chunk()? {
        delivered += chunk.len();
        if !sink.on_chunk(&chunk) {
            debug!(delivered, "sink declined more data, cancelling request");
            response.cancel.cancel();
            return Ok(());
        }
    }

    trace!(delivered, "streamed response body");
    Ok(())
}

/// Turns an error status into [`ClientError::Http`].
fn check_status<R: Read>(
    head: &ResponseHead,
    payload_size: PayloadSize,
    response: &mut ResponseReader<'_, R>,
    config: &ClientConfig,
) -> Result<(), ClientError> {
    let status = head.status().as_u16();
    if status < 400 {
        return Ok(());
    }

    let body = match payload_size {
        PayloadSize::UntilClose => response.take_buffered(config.max_error_body),
        _ => collect_error_body(response, config.max_error_body)?,
    };
    debug!(status, body_len = body.len(), "server reported an error");
    Err(ClientError::http(status, body))
}

/// Collects at most `limit` bytes of an error body.
///
/// A body that breaks off early is still returned: the status is the news,
/// the body only explains it.
fn collect_error_body<R: Read>(response: &mut ResponseReader<'_, R>, limit: usize) -> Result<Bytes, ClientError> {
    let mut body = BytesMut::new();
    while body.len() < limit {
        match response.next_chunk() {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
            Err(e) => {
                debug!(cause = %e, "error body ended early");
                break;
            }
        }
    }
    Ok(body.freeze())
}

fn initial_capacity(payload_size: PayloadSize, config: &ClientConfig) -> usize {
    match payload_size {
        PayloadSize::Length(length) => usize::try_from(length).unwrap_or(usize::MAX).min(config.max_error_body.max(config.read_size())),
        PayloadSize::Empty => 0,
        PayloadSize::Chunked | PayloadSize::UntilClose => config.read_size(),
    }
}

/// Drives a [`ResponseDecoder`] from a blocking reader.
struct ResponseReader<'a, R> {
    reader: &'a mut R,
    decoder: ResponseDecoder,
    buffer: BytesMut,
    scratch: Vec<u8>,
    cancel: &'a CancelHandle,
    eof: bool,
}

impl<'a, R: Read> ResponseReader<'a, R> {
    fn new(reader: &'a mut R, method: &Method, cancel: &'a CancelHandle, config: &ClientConfig) -> Self {
        let read_size = config.read_size();
        Self {
            reader,
            decoder: ResponseDecoder::for_method(method),
            buffer: BytesMut::with_capacity(read_size),
            scratch: vec![0; read_size],
            cancel,
            eof: false,
        }
    }

    fn read_head(&mut self) -> Result<(ResponseHead, PayloadSize), ClientError> {
        match self.next_message()? {
            Some(Message::Header(head)) => Ok(head),
            _ => Err(ParseError::IncompleteHeader.into()),
        }
    }

    /// Returns the next piece of the body, `None` once it is complete.
    fn next_chunk(&mut self) -> Result<Option<Bytes>, ClientError> {
        match self.next_message()? {
            Some(Message::Payload(PayloadItem::Chunk(bytes))) => Ok(Some(bytes)),
            Some(Message::Payload(PayloadItem::Eof)) | None => Ok(None),
            Some(Message::Header(_)) => Err(ParseError::invalid_header("second final response head").into()),
        }
    }

    fn next_message(&mut self) -> Result<Option<Message<(ResponseHead, PayloadSize)>>, ClientError> {
        loop {
            ensure!(!self.cancel.is_cancelled(), ClientError::Cancelled);

            let message =
                if self.eof { self.decoder.decode_eof(&mut self.buffer)? } else { self.decoder.decode(&mut self.buffer)? };
            if message.is_some() || self.eof || self.decoder.is_finished() {
                return Ok(message);
            }

            self.fill()?;
        }
    }

    /// Takes at most `limit` raw bytes already buffered, without reading more.
    fn take_buffered(&mut self, limit: usize) -> Bytes {
        let take = self.buffer.len().min(limit);
        self.buffer.split_to(take).freeze()
    }

    fn fill(&mut self) -> Result<(), ClientError> {
        let read = loop {
            match self.reader.read(&mut self.scratch) {
                Ok(read) => break read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                // a cancel shuts the socket down under the reader
                Err(_) if self.cancel.is_cancelled() => return Err(ClientError::Cancelled),
                Err(e) => return Err(e.into()),
            }
        };

        trace!(read, "read from connection");
        if read == 0 {
            self.eof = true;
        } else {
            self.buffer.extend_from_slice(&self.scratch[..read]);
        }
        Ok(())
    }
}
