//! The blocking client facade.

use std::io::Write;

use bytes::{Bytes, BytesMut};
use http::Method;
use tokio_util::codec::Encoder;
use tracing::{debug, warn};

use crate::client::{BodySink, read_body, read_streaming};
use crate::codec::{RequestEncoder, RequestFrame};
use crate::config::{ClientConfig, HttpsPolicy};
use crate::connection::{CancelHandle, Connection};
use crate::protocol::{ClientError, HeaderSet, ParseError, Scheme, UrlParts};

/// A blocking HTTP/1.1 client that opens one connection per request.
///
/// Headers set on the client are sent with every request until cleared.
/// Requests take `&mut self`, so a client runs one request at a time; use
/// [`cancel_handle`](Self::cancel_handle) to abort it from another thread.
///
/// ```no_run
/// use micro_http_client::HttpClient;
///
/// let mut client = HttpClient::new();
/// client.set_header("Authorization", "Bearer sk-test");
/// let models = client.get("http://localhost:11434/api/tags").unwrap();
///
/// client.post_streaming("http://localhost:11434/api/chat", br#"{"model":"llama3"}"#, &mut |chunk: &[u8]| {
///     print!("{}", String::from_utf8_lossy(chunk));
///     true
/// }).unwrap();
/// ```
#[derive(Debug)]
pub struct HttpClient {
    headers: HeaderSet,
    config: ClientConfig,
    encoder: RequestEncoder,
    cancel: CancelHandle,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self { headers: HeaderSet::new(), encoder: RequestEncoder::from_config(&config), config, cancel: CancelHandle::new() }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Sets a header sent with every following request, replacing a previous
    /// value under the exact same name.
    pub fn set_header<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.headers.set(name, value);
    }

    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    /// `GET url` and return the body as text.
    pub fn get(&mut self, url: &str) -> Result<String, ClientError> {
        let body = self.send(Method::GET, url, b"")?;
        into_text(body)
    }

    /// `POST url` with `body` and return the response body as text.
    pub fn post(&mut self, url: &str, body: &[u8]) -> Result<String, ClientError> {
        let body = self.send(Method::POST, url, body)?;
        into_text(body)
    }

    /// Sends any request and returns the raw response body.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidUrl`] / [`ClientError::UnsupportedScheme`] for a bad target
    /// - [`ClientError::InvalidHeader`] if a configured header can't be sent
    /// - [`ClientError::Connection`] if connecting fails
    /// - [`ClientError::Http`] for a status of 400 or above
    /// - [`ClientError::Protocol`] for a malformed or incomplete response
    /// - [`ClientError::Cancelled`] if [`cancel_request`](Self::cancel_request) was called
    /// - [`ClientError::Io`] if the connection failed mid-request
    pub fn send(&mut self, method: Method, url: &str, body: &[u8]) -> Result<Bytes, ClientError> {
        let mut connection = self.start(&method, url, body)?;
        let response = read_body(&mut connection, &method, &self.cancel, &self.config);
        connection.close();
        response
    }

    /// `POST url` and hand the response body to `sink` as it arrives.
    ///
    /// The call returns `Ok(())` once the body ended, the sink returned
    /// `false`, or the request was cancelled. Errors are the same as
    /// [`send`](Self::send), except that a cancel during the response is not one.
    pub fn post_streaming<S>(&mut self, url: &str, body: &[u8], sink: &mut S) -> Result<(), ClientError>
    where
        S: BodySink + ?Sized,
    {
        let method = Method::POST;
        let mut connection = self.start(&method, url, body)?;
        let result = read_streaming(&mut connection, &method, &self.cancel, &self.config, sink);
        connection.close();
        result
    }

    /// Aborts the request in flight, if any. Safe to call at any time.
    pub fn cancel_request(&self) {
        self.cancel.cancel();
    }

    /// A handle that cancels this client's requests from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Resolves the target, connects and writes the request.
    fn start(&mut self, method: &Method, url: &str, body: &[u8]) -> Result<Connection, ClientError> {
        self.cancel.reset();
        if self.cancel.is_retired() {
            debug!(url, "client was retired, not sending");
            return Err(ClientError::Cancelled);
        }

        let url = UrlParts::parse(url)?;
        self.check_scheme(&url)?;

        let mut request = BytesMut::new();
        self.encoder.encode(RequestFrame { method, url: &url, headers: &self.headers, body }, &mut request)?;

        debug!(%method, %url, body_len = body.len(), "sending request");
        let mut connection = Connection::open(url.host(), url.port(), &self.config, &self.cancel)?;

        if let Err(e) = connection.write_all(&request) {
            return Err(if self.cancel.is_cancelled() { ClientError::Cancelled } else { e.into() });
        }
        Ok(connection)
    }

    fn check_scheme(&self, url: &UrlParts) -> Result<(), ClientError> {
        if url.scheme() != Scheme::Https {
            return Ok(());
        }

        match self.config.https {
            HttpsPolicy::Reject => Err(ClientError::UnsupportedScheme { scheme: url.scheme().to_string() }),
            HttpsPolicy::Plaintext => {
                warn!(%url, "no TLS transport, sending https request in plaintext");
                Ok(())
            }
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn into_text(body: Bytes) -> Result<String, ClientError> {
    String::from_utf8(body.to_vec()).map_err(|e| ParseError::invalid_body(format!("response body is not utf-8: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_persist_until_cleared() {
        let mut client = HttpClient::new();
        client.set_header("Authorization", "Bearer a");
        client.set_header("Authorization", "Bearer b");
        client.set_header("X-Title", "chat");
        assert_eq!(client.headers().len(), 2);
        assert_eq!(client.headers().get("Authorization"), Some("Bearer b"));

        client.clear_headers();
        assert!(client.headers().is_empty());
    }

    #[test]
    fn invalid_url_fails_before_connecting() {
        let error = HttpClient::new().get("localhost:8080/api").unwrap_err();
        assert!(matches!(error, ClientError::InvalidUrl { .. }));
    }

    #[test]
    fn https_is_rejected_by_default() {
        let error = HttpClient::new().post("https://api.openai.com/v1/chat/completions", b"{}").unwrap_err();
        assert!(matches!(error, ClientError::UnsupportedScheme { ref scheme } if scheme == "https"));
    }

    #[test]
    fn invalid_header_fails_before_connecting() {
        let mut client = HttpClient::new();
        client.set_header("X-Bad", "line\nbreak");
        // nothing listens on port 9, the header check must come first
        let error = client.get("http://127.0.0.1:9/").unwrap_err();
        assert!(matches!(error, ClientError::InvalidHeader { .. }));
    }

    #[test]
    fn cancel_without_request_is_harmless() {
        let client = HttpClient::new();
        client.cancel_request();
        client.cancel_request();
        assert!(client.cancel_handle().is_cancelled());
    }

    #[test]
    fn retired_client_never_connects() {
        let mut client = HttpClient::new();
        client.cancel_handle().retire();
        // nothing listens on port 9, a connect attempt would be a Connection error
        assert!(client.get("http://127.0.0.1:9/").unwrap_err().is_cancelled());
        assert!(client.get("http://127.0.0.1:9/").unwrap_err().is_cancelled());
    }

    #[test]
    fn non_utf8_body_is_a_protocol_error() {
        let error = into_text(Bytes::from_static(&[0xff, 0xfe])).unwrap_err();
        assert!(matches!(error, ClientError::Protocol { .. }));
    }
}
