use std::io;
use thiserror::Error;

/// Every failure the client surfaces to its caller.
///
/// The client never retries; the `Display` output of each variant is stable
/// and meant to be shown to a user as-is.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme {scheme}: no tls transport is available")]
    UnsupportedScheme { scheme: String },

    #[error("connection failed to {host}:{port}: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("protocol error: {source}")]
    Protocol {
        #[from]
        source: ParseError,
    },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ClientError {
    pub fn invalid_url<U: ToString, S: ToString>(url: U, reason: S) -> Self {
        Self::InvalidUrl { url: url.to_string(), reason: reason.to_string() }
    }

    pub fn connection<H: ToString>(host: H, port: u16, source: io::Error) -> Self {
        Self::Connection { host: host.to_string(), port, source }
    }

    pub fn http<B: AsRef<[u8]>>(status: u16, body: B) -> Self {
        Self::Http { status, body: String::from_utf8_lossy(body.as_ref()).into_owned() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    /// The status code of an `Http` failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid status code: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("connection closed before the response header was complete")]
    IncompleteHeader,

    #[error("connection closed before the body was complete: {reason}")]
    TruncatedBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn truncated_body<S: ToString>(str: S) -> Self {
        Self::TruncatedBody { reason: str.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_message_carries_status_and_body() {
        let error = ClientError::http(404, b"not found");
        assert_eq!(error.to_string(), "HTTP error 404: not found");
        assert_eq!(error.status(), Some(404));
    }

    #[test]
    fn protocol_error_wraps_parse_error() {
        let error: ClientError = ParseError::IncompleteHeader.into();
        assert!(matches!(error, ClientError::Protocol { .. }));
        assert_eq!(error.to_string(), "protocol error: connection closed before the response header was complete");
    }

    #[test]
    fn connection_error_names_the_target() {
        let error = ClientError::connection("localhost", 11434, io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(error.to_string().starts_with("connection failed to localhost:11434: "));
    }
}
