use lmsdiag_transport::TransportError;

/// Errors that can occur while sending or receiving frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No end marker arrived within the read window. Buffered bytes are kept.
    #[error("timed out waiting for a complete frame")]
    Timeout,

    /// The peer closed the stream.
    #[error("connection closed")]
    ConnectionClosed,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Adjusting the transport (timeouts) failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An outgoing message contains a marker byte and cannot be framed.
    #[error("message contains marker byte 0x{byte:02x} at offset {offset}")]
    MarkerInMessage { byte: u8, offset: usize },

    /// The buffer grew past its limit without an end marker; it was discarded.
    #[error("no end marker within {size} buffered bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

impl FrameError {
    /// Whether the caller may simply retry the read.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FrameError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
