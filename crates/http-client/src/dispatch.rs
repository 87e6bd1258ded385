//! Running blocking requests off the async executor.
//!
//! A chat front end sends one request at a time and a new message supersedes
//! the one still streaming. [`Dispatcher::dispatch`] captures that: it
//! cancels whatever it dispatched before, then runs the new request on
//! tokio's blocking pool with a fresh [`HttpClient`].
//!
//! Dispatched clients are single use, so their cancels are
//! [`retire`](CancelHandle::retire)s: a task still queued, or still building
//! its body, fails with [`ClientError::Cancelled`] as soon as it starts a request.
//!
//! ```no_run
//! use micro_http_client::dispatch::Dispatcher;
//! use micro_http_client::protocol::HeaderSet;
//! use micro_http_client::ClientConfig;
//!
//! # async fn run() -> Result<(), micro_http_client::ClientError> {
//! let mut dispatcher = Dispatcher::new(ClientConfig::default());
//! let task = dispatcher.dispatch(HeaderSet::new(), |client| client.get("http://localhost:11434/api/tags"));
//! let _models = task.join().await?;
//! # Ok(())
//! # }
//! ```

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::HttpClient;
use crate::config::ClientConfig;
use crate::connection::CancelHandle;
use crate::protocol::{ClientError, HeaderSet};

/// Dispatches requests so that at most one is in flight.
#[derive(Debug)]
pub struct Dispatcher {
    config: ClientConfig,
    current: Option<CancelHandle>,
}

impl Dispatcher {
    pub fn new(config: ClientConfig) -> Self {
        Self { config, current: None }
    }

    /// Cancels the previously dispatched request and starts `request` on a
    /// new client carrying `headers`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn dispatch<T, F>(&mut self, headers: HeaderSet, request: F) -> RequestTask<T>
    where
        F: FnOnce(&mut HttpClient) -> Result<T, ClientError> + Send + 'static,
        T: Send + 'static,
    {
        if let Some(previous) = self.current.take() {
            debug!("superseding the request in flight");
            previous.retire();
        }

        let mut client = HttpClient::with_config(self.config.clone());
        for (name, value) in headers.iter() {
            client.set_header(name, value);
        }

        let cancel = client.cancel_handle();
        self.current = Some(cancel.clone());

        let handle = tokio::task::spawn_blocking(move || request(&mut client));
        RequestTask { handle, cancel }
    }

    /// Cancels the request in flight, if any.
    pub fn cancel(&self) {
        if let Some(current) = &self.current {
            current.retire();
        }
    }
}

/// A request running on the blocking pool.
///
/// Dropping the task does not stop the request; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct RequestTask<T> {
    handle: JoinHandle<Result<T, ClientError>>,
    cancel: CancelHandle,
}

impl<T> RequestTask<T> {
    pub fn cancel(&self) {
        self.cancel.retire();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the request and returns its result.
    ///
    /// A request that panicked is reported as [`ClientError::Cancelled`].
    pub async fn join(self) -> Result<T, ClientError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!(cause = %e, "request task did not complete");
                Err(ClientError::Cancelled)
            }
        }
    }
}
