//! HTTP response body decoding.
//!
//! # Components
//!
//! - [`ChunkedDecoder`]: Handles chunked transfer encoded payloads
//! - [`LengthDecoder`]: Processes fixed-length payloads
//! - [`UntilCloseDecoder`]: Takes everything until the connection closes
//! - [`PayloadDecoder`]: Main decoder that coordinates different decoding strategies
//!
//! All of them implement `tokio_util::codec::Decoder` over a `BytesMut` and
//! report an incomplete body from `decode_eof`.

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;
mod until_close_decoder;

pub use chunked_decoder::ChunkedDecoder;
pub use length_decoder::LengthDecoder;
pub use payload_decoder::PayloadDecoder;
pub use until_close_decoder::UntilCloseDecoder;
