//! HTTP response head decoding.
//!
//! - [`ResponseHeadDecoder`]: Decodes the status line and header fields
//!   - Supports HTTP/1.0 and HTTP/1.1 responses
//!   - Enforces header count and size limits
//!   - Picks the body framing from `Content-Length` / `Transfer-Encoding`

mod response_head_decoder;

pub use response_head_decoder::ResponseHeadDecoder;
