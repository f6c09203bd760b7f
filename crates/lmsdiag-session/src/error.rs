use lmsdiag_frame::FrameError;
use lmsdiag_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The device answered a strict exchange with something else.
    #[error("expected {expected:?}, got {actual:?}")]
    UnexpectedResponse { expected: String, actual: String },
}

impl SessionError {
    /// Whether this is a read timeout the caller may retry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Frame(err) if err.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
