//! Connection lifecycle and cancellation.
//!
//! - [`Connection`]: a TCP stream opened for exactly one request and closed
//!   on every exit path
//! - [`CancelHandle`]: the flag and forced shutdown that abort a request from
//!   another thread

mod cancel;
#[allow(clippy::module_inception, reason = "the module is named after its only type")]
mod connection;

pub use cancel::CancelHandle;
pub use connection::Connection;
