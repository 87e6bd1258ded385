//! Cancellation shared between a request and the threads that may abort it.
//!
//! A [`CancelHandle`] is a flag plus the socket of the request in flight.
//! Cancelling sets the flag and shuts the socket down in both directions,
//! which makes a read blocked on it return immediately. Readers check the
//! flag before every read and stop at the next check point.

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

/// Cloneable, thread safe handle that cancels the request it belongs to.
///
/// Cancelling is idempotent and never fails. The flag stays set until the
/// next request on the same client starts and calls [`reset`](Self::reset).
/// [`retire`](Self::retire) cancels for good: no later `reset` clears it.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    retired: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag and force-closes the registered connection, if any.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);

        if let Some(stream) = self.stream().take() {
            debug!("cancel requested, shutting down the in-flight connection");
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                trace!(cause = %e, "connection was already closed");
            }
        }
    }

    /// Cancels the request in flight and every request started after it.
    pub fn retire(&self) {
        self.inner.retired.store(true, Ordering::SeqCst);
        self.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst) || self.is_retired()
    }

    pub fn is_retired(&self) -> bool {
        self.inner.retired.load(Ordering::SeqCst)
    }

    /// Clears the flag at the start of a new request. A retired handle stays cancelled.
    pub fn reset(&self) {
        self.inner.cancelled.store(false, Ordering::SeqCst);
    }

    /// Makes `stream` the one [`cancel`](Self::cancel) shuts down.
    pub(crate) fn register(&self, stream: TcpStream) {
        *self.stream() = Some(stream);
    }

    pub(crate) fn unregister(&self) {
        self.stream().take();
    }

    fn stream(&self) -> MutexGuard<'_, Option<TcpStream>> {
        // the guarded value is a plain slot, a panic while holding it leaves nothing half written
        self.inner.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
