//! HTTP response header handling.
//!
//! The head of a response (status line and header fields) is represented with
//! the standard `http::Response` type and an empty body placeholder. The
//! readers decide what to do with the body once the head is known.

use http::Response;

/// Type alias for HTTP response headers.
///
/// This type represents the header portion of an HTTP response, using
/// `http::Response<()>` with an empty body placeholder.
pub type ResponseHead = Response<()>;
