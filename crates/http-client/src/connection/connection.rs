//! One TCP connection per request.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::connection::CancelHandle;
use crate::protocol::ClientError;

/// An open byte stream to one `(host, port)` pair.
///
/// The connection is registered with the request's [`CancelHandle`] for as
/// long as it is open, so a cancel from another thread can shut it down.
/// It is closed when dropped; [`close`](Self::close) may be called earlier
/// and any number of times.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    cancel: CancelHandle,
    host: String,
    port: u16,
    closed: bool,
}

impl Connection {
    /// Connects to `host:port`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Connection`] if resolving or connecting fails
    /// - [`ClientError::Cancelled`] if the request was cancelled while connecting
    pub fn open(host: &str, port: u16, config: &ClientConfig, cancel: &CancelHandle) -> Result<Self, ClientError> {
        let stream = match config.connect_timeout() {
            Some(timeout) => connect_timeout(host, port, timeout),
            None => TcpStream::connect((host, port)),
        }
        .map_err(|e| ClientError::connection(host, port, e))?;

        if let Err(e) = stream.set_nodelay(true) {
            trace!(cause = %e, "can't set TCP_NODELAY");
        }

        let registered = stream.try_clone().map_err(|e| ClientError::connection(host, port, e))?;
        cancel.register(registered);

        let connection = Self { stream, cancel: cancel.clone(), host: host.to_string(), port, closed: false };
        debug!(host, port, "connection established");

        // a cancel that raced the connect found no socket to shut down
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        Ok(connection)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.unregister();

        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            trace!(cause = %e, "connection was already shut down");
        }
        debug!(host = %self.host, port = self.port, "connection closed");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Tries every resolved address in turn, each bounded by `timeout`.
fn connect_timeout(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                trace!(%addr, cause = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no address")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn open_write_read_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            peer.read_exact(&mut buf).unwrap();
            peer.write_all(&buf).unwrap();
        });

        let cancel = CancelHandle::new();
        let mut connection = Connection::open("127.0.0.1", port, &ClientConfig::default(), &cancel).unwrap();
        assert_eq!(connection.port(), port);
        connection.write_all(b"ping").unwrap();

        let mut echoed = [0u8; 4];
        connection.read_exact(&mut echoed).unwrap();
        assert_eq!(&echoed, b"ping");

        connection.close();
        connection.close();
        server.join().unwrap();
    }

    #[test]
    fn refused_connection_names_the_target() {
        // bind then drop to get a port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();

        let error = Connection::open("127.0.0.1", port, &ClientConfig::default(), &CancelHandle::new()).unwrap_err();
        let ClientError::Connection { host, port: failed_port, .. } = error else {
            panic!("expected a connection error, got {error:?}");
        };
        assert_eq!(host, "127.0.0.1");
        assert_eq!(failed_port, port);
    }

    #[test]
    fn connect_with_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ClientConfig::default().with_connect_timeout(Duration::from_secs(2));

        let connection = Connection::open("127.0.0.1", port, &config, &CancelHandle::new()).unwrap();
        assert_eq!(connection.host(), "127.0.0.1");
    }

    #[test]
    fn cancelled_before_connect_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let cancel = CancelHandle::new();
        cancel.cancel();

        let result = Connection::open("127.0.0.1", port, &ClientConfig::default(), &cancel);
        assert!(matches!(result, Err(ClientError::Cancelled)));
    }
}
