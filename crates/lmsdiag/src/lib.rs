//! Diagnostic client for SICK LMS laser rangefinders.
//!
//! lmsdiag talks the device's ASCII telegram protocol over TCP: every
//! message is wrapped in STX/ETX markers, scan telegrams carry positional,
//! space-separated fields.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connection to the device
//! - [`frame`]: STX/ETX framing over an arbitrarily chunked stream
//! - [`telegram`]: Positional field decoding and the command vocabulary
//! - [`session`]: Command/response sessions (`request`, `expect`, `flush`)

/// Re-export transport types.
pub mod transport {
    pub use lmsdiag_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use lmsdiag_frame::*;
}

/// Re-export telegram types.
pub mod telegram {
    pub use lmsdiag_telegram::*;
}

/// Re-export session types.
pub mod session {
    pub use lmsdiag_session::*;
}
