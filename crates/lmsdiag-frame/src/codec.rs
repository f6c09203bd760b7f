use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::pretty::Pretty;

/// Start-of-text marker that opens every message.
pub const STX: u8 = 0x02;

/// End-of-text marker that closes every message.
pub const ETX: u8 = 0x03;

/// Bytes requested per socket read.
pub const DEFAULT_READ_CHUNK: usize = 1000;

/// Buffered bytes tolerated without an end marker: 1 MiB.
pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024;

/// Which framing rule a received message broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MalformedKind {
    /// No start marker precedes the end marker; the frame is degraded.
    MissingStart,
    /// Bytes sat in front of the start marker.
    LeadingGarbage,
    /// Bytes after the end marker do not open a new message.
    TrailingGarbage,
    /// The first start marker lies after the first end marker.
    InvertedMarkers,
}

impl MalformedKind {
    /// Stable snake_case name, used in logs and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            MalformedKind::MissingStart => "missing_start",
            MalformedKind::LeadingGarbage => "leading_garbage",
            MalformedKind::TrailingGarbage => "trailing_garbage",
            MalformedKind::InvertedMarkers => "inverted_markers",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            MalformedKind::MissingStart => "could not find STX in buffer",
            MalformedKind::LeadingGarbage => "garbage data before STX",
            MalformedKind::TrailingGarbage => "extra garbage after ETX",
            MalformedKind::InvertedMarkers => "found ETX before STX",
        }
    }
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal framing anomaly observed while extracting a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedFrame {
    pub kind: MalformedKind,
    /// The offending bytes, markers included where relevant.
    pub excerpt: Bytes,
}

impl MalformedFrame {
    pub fn new(kind: MalformedKind, excerpt: impl Into<Bytes>) -> Self {
        Self {
            kind,
            excerpt: excerpt.into(),
        }
    }
}

impl fmt::Display for MalformedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.describe(), Pretty(&self.excerpt))
    }
}

impl std::error::Error for MalformedFrame {}

/// One message carved out of the stream, markers stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Bytes strictly between the start and end marker.
    pub payload: Bytes,
    /// Anomalies seen while extracting this frame, in detection order.
    pub diagnostics: Vec<MalformedFrame>,
}

impl Frame {
    /// Create a clean frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            diagnostics: Vec::new(),
        }
    }

    /// The payload as text (lossy for non-UTF-8 bytes).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// True when the frame was extracted without any anomaly.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Whether a given anomaly was raised for this frame.
    pub fn has(&self, kind: MalformedKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    /// The size of this frame on the wire (markers + payload).
    pub fn wire_size(&self) -> usize {
        self.payload.len() + 2
    }
}

/// Encode a message into the wire format.
///
/// ```text
/// ┌──────┬─────────────────────────┬──────┐
/// │ 0x02 │ ASCII command/telegram  │ 0x03 │
/// └──────┴─────────────────────────┴──────┘
/// ```
pub fn encode_frame(message: &[u8], dst: &mut BytesMut) -> Result<()> {
    if let Some(offset) = message.iter().position(|&b| b == STX || b == ETX) {
        return Err(FrameError::MarkerInMessage {
            byte: message[offset],
            offset,
        });
    }
    dst.reserve(message.len() + 2);
    dst.put_u8(STX);
    dst.put_slice(message);
    dst.put_u8(ETX);
    Ok(())
}

/// Extract the next frame from a buffer.
///
/// Returns `None` while the buffer holds no end marker. Otherwise consumes
/// everything up to and including the first end marker and returns the
/// bytes between the start marker and that end marker. When no start marker
/// precedes the end marker, the whole prefix is returned as a degraded frame.
/// That includes a start marker sitting after the end marker: the frame is
/// the prefix, flagged `MissingStart` and `InvertedMarkers`.
pub fn extract_frame(src: &mut BytesMut) -> Option<Frame> {
    let end = src.iter().position(|&b| b == ETX)?;
    let start = src.iter().position(|&b| b == STX);
    let mut diagnostics = Vec::new();

    let body_start = match start {
        Some(start) if start < end => {
            if start > 0 {
                diagnostics.push(MalformedFrame::new(
                    MalformedKind::LeadingGarbage,
                    Bytes::copy_from_slice(&src[..start]),
                ));
            }
            start + 1
        }
        Some(start) => {
            diagnostics.push(MalformedFrame::new(
                MalformedKind::MissingStart,
                Bytes::copy_from_slice(&src[..=end]),
            ));
            diagnostics.push(MalformedFrame::new(
                MalformedKind::InvertedMarkers,
                Bytes::copy_from_slice(&src[..=start]),
            ));
            0
        }
        None => {
            diagnostics.push(MalformedFrame::new(
                MalformedKind::MissingStart,
                Bytes::copy_from_slice(&src[..=end]),
            ));
            0
        }
    };

    let mut consumed = src.split_to(end + 1);
    consumed.truncate(end);
    let payload = consumed.split_off(body_start).freeze();

    if src.first().is_some_and(|&b| b != STX) {
        diagnostics.push(MalformedFrame::new(
            MalformedKind::TrailingGarbage,
            Bytes::copy_from_slice(&src[..]),
        ));
    }

    Some(Frame {
        payload,
        diagnostics,
    })
}

/// Configuration for the framer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Bytes requested per read. Default: 1000.
    pub read_chunk_size: usize,
    /// Read timeout applied to the transport. Default: 1 s.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to the transport. Default: 1 s.
    pub write_timeout: Option<Duration>,
    /// Upper bound on how long `flush` drains the transport. Default: 250 ms.
    pub flush_timeout: Duration,
    /// Buffered bytes tolerated without an end marker. Default: 1 MiB.
    pub max_buffer_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK,
            read_timeout: Some(Duration::from_secs(1)),
            write_timeout: Some(Duration::from_secs(1)),
            flush_timeout: Duration::from_millis(250),
            max_buffer_size: DEFAULT_MAX_BUFFER,
        }
    }
}
