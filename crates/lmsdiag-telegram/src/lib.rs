//! Positional field decoding for SICK LMS ASCII telegrams.
//!
//! A telegram body is a run of whitespace-separated tokens. Decoding labels
//! the leading tokens with an ordered list of field names; values stay raw
//! token text.

pub mod command;
pub mod schema;

pub use command::{Command, FrameKind, SCAN_DATA};
pub use schema::{decode, decode_scan_data, FieldMap, LMD_SCANDATA_FIELDS};
