//! The blocking HTTP client.
//!
//! - [`HttpClient`]: headers, `get`/`post`/`send` and `post_streaming`
//! - [`read_body`] / [`read_streaming`]: the response readers it is built
//!   on, usable with any `std::io::Read`
//! - [`BodySink`] / [`LineSink`]: consumers of a streamed body

mod http_client;
mod reader;
mod sink;

pub use http_client::HttpClient;
pub use reader::{read_body, read_streaming};
#[cfg(test)]
pub use sink::MockBodySink;
pub use sink::{BodySink, LineSink};
