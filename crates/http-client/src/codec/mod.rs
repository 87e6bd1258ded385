//! HTTP/1.1 wire codec for the client side of a connection.
//!
//! Requests go out through [`RequestEncoder`], responses come back through
//! [`ResponseDecoder`]. Both implement the `tokio_util::codec` traits over a
//! `BytesMut`, but nothing here touches a socket: the blocking readers in
//! [`client`](crate::client) feed the decoder whatever bytes each read
//! returned, so the codec is equally usable on an in-memory buffer.
//!
//! - Request handling:
//!   - [`RequestEncoder`] / [`frame`]: request line, headers and body
//!
//! - Response handling:
//!   - [`ResponseDecoder`]: head first, then the body
//!   - Header parsing via the `header` module
//!   - Body decoding via the `body` module (content-length, chunked, until close)
//!
//! # Example
//!
//! ```
//! use http::Method;
//! use micro_http_client::codec::frame;
//! use micro_http_client::protocol::{HeaderSet, UrlParts};
//!
//! let url = UrlParts::parse("http://localhost:11434/api/tags").unwrap();
//! let request = frame(&Method::GET, &url, &HeaderSet::new(), b"").unwrap();
//! assert!(request.starts_with(b"GET /api/tags HTTP/1.1\r\nHost: localhost\r\n"));
//! ```

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub use body::{ChunkedDecoder, LengthDecoder, PayloadDecoder, UntilCloseDecoder};
pub use header::ResponseHeadDecoder;
pub use request_encoder::{RequestEncoder, RequestFrame, frame};
pub use response_decoder::ResponseDecoder;
