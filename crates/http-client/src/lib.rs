//! A blocking micro HTTP/1.1 client
//!
//! This crate speaks HTTP/1.1 directly over a TCP socket, one connection per
//! request. It is built for talking to model provider APIs from a desktop
//! chat client: small JSON requests, answers that are either read whole or
//! streamed piece by piece, and a user who may hit "stop" at any moment.
//!
//! # Features
//!
//! - Absolute `http://` URL parsing with default ports
//! - Request framing with `Host`, `Content-Length`, a default `Content-Type`
//!   and `Connection: close`
//! - Response bodies framed by `Content-Length`, chunked transfer encoding or
//!   connection close
//! - Blocking and streaming reads
//! - Cancellation from any thread, which also unblocks a pending read
//! - A tokio based dispatcher that supersedes the previous request
//!
//! # Example
//!
//! ```no_run
//! use micro_http_client::client::LineSink;
//! use micro_http_client::{ClientError, HttpClient};
//!
//! fn main() -> Result<(), ClientError> {
//!     let mut client = HttpClient::new();
//!     client.set_header("Accept", "application/x-ndjson");
//!
//!     let mut sink = LineSink::new(|line: &str| {
//!         println!("{line}");
//!         !line.contains(r#""done":true"#)
//!     });
//!     let body = br#"{"model":"llama3","messages":[{"role":"user","content":"hi"}]}"#;
//!     client.post_streaming("http://localhost:11434/api/chat", body, &mut sink)?;
//!     sink.finish();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: URL, header set, decoded message and error types
//! - [`codec`]: request encoder and response decoder over `BytesMut`
//! - [`connection`]: the per-request TCP connection and [`CancelHandle`]
//! - [`client`]: [`HttpClient`], the blocking and streaming readers and body sinks
//! - [`dispatch`]: one request in flight at a time, on tokio's blocking pool
//! - [`config`]: [`ClientConfig`]
//!
//! # Error Handling
//!
//! Every operation returns [`ClientError`]. Malformed responses are reported as
//! [`ClientError::Protocol`] wrapping a [`protocol::ParseError`]. The client
//! never retries.
//!
//! # Limitations
//!
//! - HTTP/1.1 only, no keep-alive
//! - No TLS: `https://` URLs are rejected unless
//!   [`HttpsPolicy::Plaintext`](config::HttpsPolicy::Plaintext) is configured
//! - Maximum response head size: 16KB
//! - Maximum number of response headers: 64

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;

pub use client::HttpClient;
pub use config::ClientConfig;
pub use connection::CancelHandle;
pub use protocol::ClientError;
