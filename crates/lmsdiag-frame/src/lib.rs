//! STX/ETX stream framing for SICK LMS ASCII telegrams.
//!
//! Every message on the wire is `0x02 <ascii> 0x03`. A single socket read may
//! return part of a message, one message, or several back to back, so the
//! [`Framer`] keeps a carry-over buffer across calls and hands out one
//! complete [`Frame`] at a time.
//!
//! Framing anomalies (garbage around markers, missing or inverted markers)
//! never abort a read. They are attached to the returned frame as
//! [`MalformedFrame`] diagnostics and logged.

pub mod codec;
pub mod error;
pub mod framer;
pub mod pretty;

pub use codec::{
    encode_frame, extract_frame, Frame, FrameConfig, MalformedFrame, MalformedKind,
    DEFAULT_MAX_BUFFER, DEFAULT_READ_CHUNK, ETX, STX,
};
pub use error::{FrameError, Result};
pub use framer::Framer;
pub use pretty::{pretty, Pretty};
