//! Core HTTP protocol types shared by the codec, connection and client layers.
//!
//! # Architecture
//!
//! - **Message Handling** ([`message`]): decoded response pieces
//!   - [`Message`]: Represents either a response head or payload chunks
//!   - [`PayloadItem`]: Handles individual payload chunks and EOF
//!   - [`PayloadSize`]: How the end of the body is found
//!
//! - **Request Target** ([`url`]): absolute URL decomposition
//!   - [`UrlParts`]: scheme, host, port and path of a request
//!   - [`Scheme`]: `http` or `https`
//!
//! - **Request Headers** ([`header_set`]): caller supplied headers
//!   - [`HeaderSet`]: case-sensitive, last-write-wins, deterministic order
//!
//! - **Response Processing** ([`response`]): Response header handling
//!   - [`ResponseHead`]: Type alias for response headers before body attachment
//!
//! - **Error Handling** ([`error`]):
//!   - [`ClientError`]: Top-level error type returned to callers
//!   - [`ParseError`]: Response framing errors

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod url;
pub use url::Scheme;
pub use url::UrlParts;

mod header_set;
pub use header_set::HeaderSet;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::ClientError;
pub use error::ParseError;
