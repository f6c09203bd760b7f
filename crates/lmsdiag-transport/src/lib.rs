//! Blocking TCP transport for talking to a laser rangefinder.
//!
//! This is the lowest layer of lmsdiag. The framer only needs `Read + Write`
//! plus the optional [`ReadTimeout`] seam; [`DeviceStream`] is the concrete
//! stream returned by [`TcpTransport::connect`].

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::{TcpTransport, DEFAULT_PORT};
pub use traits::{DeviceStream, ReadTimeout};
