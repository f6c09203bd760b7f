use std::net::SocketAddr;

use lmsdiag_transport::TcpTransport;
use tracing::info;

use crate::error::Result;
use crate::session::{Session, SessionConfig};

/// Connect to a device with default configuration.
pub fn connect(addr: SocketAddr) -> Result<Session> {
    connect_with_config(addr, &SessionConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(addr: SocketAddr, config: &SessionConfig) -> Result<Session> {
    let stream = TcpTransport::connect_timeout(addr, config.connect_timeout)?;
    stream.set_write_timeout(config.frame.write_timeout)?;

    let session = Session::new(stream, config.clone())?;
    info!(
        %addr,
        transport = TcpTransport::transport_name(),
        "session established"
    );
    Ok(session)
}
