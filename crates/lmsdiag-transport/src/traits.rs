use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Streams whose blocking reads can be bounded by a timeout.
///
/// The framer uses this to enforce receive deadlines and to keep `flush`
/// short. Streams without it still work, but reads block for as long as the
/// stream itself decides.
pub trait ReadTimeout {
    /// The currently configured read timeout (`None` blocks forever).
    fn read_timeout(&self) -> Result<Option<Duration>>;

    /// Set the read timeout. `Some(Duration::ZERO)` is rejected.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()>;
}

/// A connected device stream. Implements Read + Write.
///
/// Wraps the TCP socket to the device. Cloned handles share the socket, so
/// shutting one down unblocks a read pending on another.
pub struct DeviceStream {
    inner: TcpStream,
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for DeviceStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl DeviceStream {
    /// Wrap an already connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self { inner: stream }
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        if timeout == Some(Duration::ZERO) {
            return Err(TransportError::InvalidTimeout);
        }
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Disable Nagle's algorithm so short commands leave immediately.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.inner.set_nodelay(nodelay).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new socket handle).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from_tcp(cloned))
    }

    /// Shut down both directions of the socket.
    ///
    /// Any read blocked on this socket, through any handle, returns.
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown_how(Shutdown::Both)
    }

    /// Shut down only the read half.
    ///
    /// Blocked reads return end-of-stream while writes keep working, so a
    /// final command can still reach the device.
    pub fn shutdown_read(&self) -> Result<()> {
        self.shutdown_how(Shutdown::Read)
    }

    fn shutdown_how(&self, how: Shutdown) -> Result<()> {
        match self.inner.shutdown(how) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Address of the connected device.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr().map_err(Into::into)
    }
}

impl ReadTimeout for DeviceStream {
    fn read_timeout(&self) -> Result<Option<Duration>> {
        self.inner.read_timeout().map_err(Into::into)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        ReadTimeout::set_read_timeout(&self.inner, timeout)
    }
}

impl ReadTimeout for TcpStream {
    fn read_timeout(&self) -> Result<Option<Duration>> {
        TcpStream::read_timeout(self).map_err(Into::into)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        if timeout == Some(Duration::ZERO) {
            return Err(TransportError::InvalidTimeout);
        }
        TcpStream::set_read_timeout(self, timeout).map_err(Into::into)
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("DeviceStream");
        match self.inner.peer_addr() {
            Ok(addr) => dbg.field("peer", &addr),
            Err(_) => dbg.field("peer", &"<disconnected>"),
        };
        dbg.finish()
    }
}
