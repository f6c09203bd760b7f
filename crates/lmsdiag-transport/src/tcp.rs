use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::DeviceStream;

/// TCP port the LMS family serves its ASCII telegram protocol on.
pub const DEFAULT_PORT: u16 = 2112;

/// TCP transport to a device.
pub struct TcpTransport;

impl TcpTransport {
    /// Connect to a device (blocking, OS default connect timeout).
    pub fn connect(addr: SocketAddr) -> Result<DeviceStream> {
        let stream = TcpStream::connect(addr)
            .map_err(|source| TransportError::Connect { addr, source })?;
        Self::finish(addr, stream)
    }

    /// Connect to a device, giving up after `timeout`.
    pub fn connect_timeout(addr: SocketAddr, timeout: Duration) -> Result<DeviceStream> {
        if timeout.is_zero() {
            return Err(TransportError::InvalidTimeout);
        }
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|source| TransportError::Connect { addr, source })?;
        Self::finish(addr, stream)
    }

    fn finish(addr: SocketAddr, stream: TcpStream) -> Result<DeviceStream> {
        let stream = DeviceStream::from_tcp(stream);
        stream.set_nodelay(true)?;
        debug!(%addr, "connected to device");
        Ok(stream)
    }

    /// Transport name for diagnostics.
    pub fn transport_name() -> &'static str {
        "tcp"
    }
}
