//! HTTP/1.1 request framing.
//!
//! Serializes a request line, the caller's headers, the framing headers the
//! client owns and an optional body into one buffer:
//!
//! ```text
//! <METHOD> <path> HTTP/1.1\r\n
//! Host: <host>\r\n
//! <each caller header>: <value>\r\n
//! [User-Agent: <configured agent>\r\n]
//! [Content-Length: <len(body)>\r\n]
//! [Content-Type: <default content type>\r\n]
//! Connection: close\r\n
//! \r\n
//! <body>
//! ```
//!
//! `Content-Length` is written whenever the body is non-empty, the default
//! `Content-Type` only when the caller did not set one. `Host`,
//! `Content-Length`, `Transfer-Encoding` and `Connection` belong to the
//! framer: caller values for them are dropped.

use std::io;
use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderName, HeaderValue, Method};
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::config::ClientConfig;
use crate::protocol::{ClientError, HeaderSet, UrlParts};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 1024;

/// Header names the framer writes itself.
const FRAMER_OWNED: [&str; 4] = ["Host", "Content-Length", "Transfer-Encoding", "Connection"];

/// Everything needed to frame one request.
#[derive(Debug, Clone, Copy)]
pub struct RequestFrame<'a> {
    pub method: &'a Method,
    pub url: &'a UrlParts,
    pub headers: &'a HeaderSet,
    pub body: &'a [u8],
}

/// Encoder for HTTP/1.1 requests implementing the [`Encoder`] trait.
#[derive(Debug, Clone)]
pub struct RequestEncoder {
    default_content_type: String,
    user_agent: Option<String>,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self { default_content_type: config.default_content_type.clone(), user_agent: config.user_agent.clone() }
    }
}

impl Default for RequestEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<RequestFrame<'_>> for RequestEncoder {
    type Error = ClientError;

    /// Encodes the request into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHeader`] if a caller header name is not a
    /// valid token or a value contains control characters such as CR or LF.
    fn encode(&mut self, item: RequestFrame<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let RequestFrame { method, url, headers, body } = item;

        for (name, value) in headers.iter() {
            validate_header(name, value)?;
        }

        dst.reserve(INIT_HEADER_SIZE + body.len());
        write!(FastWrite(&mut *dst), "{} {} HTTP/1.1\r\n", method.as_str(), url.path())?;
        put_header(dst, "Host", url.host());

        for (name, value) in headers.iter() {
            if FRAMER_OWNED.iter().any(|owned| owned.eq_ignore_ascii_case(name)) {
                warn!(header = name, "dropped caller header, the framer writes it");
                continue;
            }
            put_header(dst, name, value);
        }

        if let Some(user_agent) = &self.user_agent {
            if !headers.contains_ignore_case("User-Agent") {
                put_header(dst, "User-Agent", user_agent);
            }
        }

        if !body.is_empty() {
            write!(FastWrite(&mut *dst), "Content-Length: {}\r\n", body.len())?;
            if !headers.contains_ignore_case("Content-Type") {
                put_header(dst, "Content-Type", &self.default_content_type);
            }
        }

        dst.put_slice(b"Connection: close\r\n\r\n");
        dst.put_slice(body);
        Ok(())
    }
}

/// Frames one request with the default configuration.
pub fn frame(method: &Method, url: &UrlParts, headers: &HeaderSet, body: &[u8]) -> Result<Bytes, ClientError> {
    let mut dst = BytesMut::new();
    RequestEncoder::new().encode(RequestFrame { method, url, headers, body }, &mut dst)?;
    Ok(dst.freeze())
}

fn validate_header(name: &str, value: &str) -> Result<(), ClientError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::invalid_header(format!("{name:?}: {e}")))?;
    HeaderValue::from_bytes(value.as_bytes()).map_err(|e| ClientError::invalid_header(format!("value of {name}: {e}")))?;
    Ok(())
}

fn put_header(dst: &mut BytesMut, name: &str, value: &str) {
    dst.put_slice(name.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(value.as_bytes());
    dst.put_slice(b"\r\n");
}

/// `io::Write` over a `BytesMut` whose capacity is already reserved.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn url(s: &str) -> UrlParts {
        UrlParts::parse(s).unwrap()
    }

    fn text(bytes: &Bytes) -> &str {
        std::str::from_utf8(bytes).unwrap()
    }

    #[test]
    fn get_without_body() {
        let framed = frame(&Method::GET, &url("http://localhost:11434/api/tags"), &HeaderSet::new(), b"").unwrap();
        assert_eq!(text(&framed), "GET /api/tags HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    }

    #[test]
    fn post_injects_length_and_default_content_type() {
        let headers: HeaderSet = [("Authorization", "Bearer sk-test")].into_iter().collect();
        let framed = frame(&Method::POST, &url("http://example.com/v1/chat"), &headers, br#"{"a":1}"#).unwrap();

        let expected = indoc! {r#"
            POST /v1/chat HTTP/1.1
            Host: example.com
            Authorization: Bearer sk-test
            Content-Length: 7
            Content-Type: application/json
            Connection: close

            {"a":1}"#}
        .replace('\n', "\r\n");
        // the body itself contains no newline, so only the head was rewritten
        assert_eq!(text(&framed), expected);
    }

    #[test]
    fn caller_content_type_is_kept() {
        let headers: HeaderSet = [("content-type", "text/plain")].into_iter().collect();
        let framed = frame(&Method::POST, &url("http://example.com/"), &headers, b"hi").unwrap();
        let framed = text(&framed);
        assert!(framed.contains("content-type: text/plain\r\n"));
        assert!(!framed.contains("application/json"));
        assert!(framed.contains("Content-Length: 2\r\n"));
    }

    #[test]
    fn empty_body_has_no_framing_headers() {
        let framed = frame(&Method::POST, &url("http://example.com/"), &HeaderSet::new(), b"").unwrap();
        let framed = text(&framed);
        assert!(!framed.contains("Content-Length"));
        assert!(!framed.contains("Content-Type"));
    }

    #[test]
    fn framer_owned_headers_are_not_duplicated() {
        let headers: HeaderSet = [("Host", "evil"), ("Content-Length", "1"), ("connection", "keep-alive")].into_iter().collect();
        let framed = frame(&Method::POST, &url("http://example.com/"), &headers, b"abc").unwrap();
        let framed = text(&framed);
        assert_eq!(framed.matches("Host:").count(), 1);
        assert!(framed.contains("Host: example.com\r\n"));
        assert!(framed.contains("Content-Length: 3\r\n"));
        assert!(!framed.contains("keep-alive"));
    }

    #[test]
    fn configured_user_agent() {
        let config = ClientConfig::default().with_user_agent("chat/1.0");
        let mut dst = BytesMut::new();
        let url = url("http://example.com/");
        let headers = HeaderSet::new();
        RequestEncoder::from_config(&config)
            .encode(RequestFrame { method: &Method::GET, url: &url, headers: &headers, body: b"" }, &mut dst)
            .unwrap();
        assert!(std::str::from_utf8(&dst).unwrap().contains("User-Agent: chat/1.0\r\n"));
    }

    #[test]
    fn header_injection_is_rejected() {
        let headers: HeaderSet = [("X-Test", "a\r\nInjected: yes")].into_iter().collect();
        let error = frame(&Method::GET, &url("http://example.com/"), &headers, b"").unwrap_err();
        assert!(matches!(error, ClientError::InvalidHeader { .. }));

        let headers: HeaderSet = [("Bad Name", "v")].into_iter().collect();
        assert!(frame(&Method::GET, &url("http://example.com/"), &headers, b"").is_err());
    }

    #[test]
    fn frame_parses_back_as_the_same_request() {
        let headers: HeaderSet =
            [("Authorization", "Bearer sk-test"), ("X-Title", "chat"), ("Accept", "text/event-stream")].into_iter().collect();
        let body = br#"{"model":"llama3","stream":true}"#;
        let target = url("http://127.0.0.1:8080/api/chat?stream=1");

        let framed = frame(&Method::POST, &target, &headers, body).unwrap();

        let mut parsed_headers = [httparse::EMPTY_HEADER; 16];
        let mut request = httparse::Request::new(&mut parsed_headers);
        let httparse::Status::Complete(body_offset) = request.parse(&framed).unwrap() else {
            panic!("request head incomplete");
        };

        assert_eq!(request.method, Some("POST"));
        assert_eq!(request.path, Some("/api/chat?stream=1"));
        assert_eq!(request.version, Some(1));

        let mut recovered = HeaderSet::new();
        for header in request.headers.iter() {
            let value = std::str::from_utf8(header.value).unwrap();
            match header.name {
                "Host" => assert_eq!(value, "127.0.0.1"),
                "Content-Length" => assert_eq!(value, body.len().to_string()),
                "Content-Type" => assert_eq!(value, "application/json"),
                "Connection" => assert_eq!(value, "close"),
                name => recovered.set(name, value),
            }
        }
        assert_eq!(recovered, headers);
        assert_eq!(&framed[body_offset..], &body[..]);
    }
}
