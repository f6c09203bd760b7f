//! Command/response sessions with a SICK LMS device.
//!
//! Connect, send commands, read replies and telegrams, check strict
//! acknowledgements. One session owns one socket and one framer.

pub mod connector;
pub mod error;
pub mod session;

pub use connector::{connect, connect_with_config};
pub use error::{Result, SessionError};
pub use session::{Session, SessionConfig, ShutdownHandle};
