use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use lmsdiag_frame::{Frame, FrameConfig, Framer};
use lmsdiag_telegram::Command;
use lmsdiag_transport::{DeviceStream, ReadTimeout};
use tracing::{debug, info};

use crate::error::{Result, SessionError};

/// Runtime configuration for a device session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long to wait for the TCP connection.
    pub connect_timeout: Duration,
    /// Pause before `settle_and_flush` drains the socket, giving the device
    /// time to answer the preceding command.
    pub settle_delay: Duration,
    /// Framer settings, timeouts included.
    pub frame: FrameConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_millis(100),
            frame: FrameConfig::default(),
        }
    }
}

/// A command/response session over one framed stream.
pub struct Session<T = DeviceStream> {
    framer: Framer<T>,
    config: SessionConfig,
}

impl<T: Read + Write + ReadTimeout> Session<T> {
    /// Wrap a connected stream, applying the configured read timeout.
    pub fn new(stream: T, config: SessionConfig) -> Result<Self> {
        let framer = Framer::with_config_timeouts(stream, config.frame.clone())?;
        Ok(Self { framer, config })
    }

    /// Send a raw command. Does not wait for a reply.
    pub fn send(&mut self, message: &str) -> Result<()> {
        self.framer.send(message).map_err(Into::into)
    }

    /// Send one of the known commands.
    pub fn send_command(&mut self, command: Command) -> Result<()> {
        self.send(&command.to_string())
    }

    /// Receive the next frame within the configured read timeout.
    pub fn recv(&mut self) -> Result<Frame> {
        match self.config.frame.read_timeout {
            Some(timeout) => self.recv_timeout(timeout),
            None => self.framer.recv().map_err(Into::into),
        }
    }

    /// Receive the next frame within `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Frame> {
        self.framer.recv_timeout(timeout).map_err(Into::into)
    }

    /// Send `message` and return the next frame.
    pub fn request(&mut self, message: &str) -> Result<Frame> {
        self.send(message)?;
        self.recv()
    }

    /// Send `message` and require the next frame body to equal `expected`.
    ///
    /// Framing diagnostics on the reply do not affect the comparison.
    pub fn expect(&mut self, message: &str, expected: &str) -> Result<Frame> {
        let frame = self.request(message)?;
        if frame.payload.as_ref() != expected.as_bytes() {
            return Err(SessionError::UnexpectedResponse {
                expected: expected.to_string(),
                actual: frame.text().into_owned(),
            });
        }
        debug!(command = message, "acknowledged");
        Ok(frame)
    }

    /// [`Session::expect`] for a command with a fixed acknowledgement.
    ///
    /// Commands without one are sent as a plain request.
    pub fn expect_command(&mut self, command: Command) -> Result<Frame> {
        match command.expected_reply() {
            Some(expected) => self.expect(&command.to_string(), &expected),
            None => self.request(&command.to_string()),
        }
    }

    /// Discard anything the device has sent that nobody asked for.
    pub fn flush(&mut self) -> Result<usize> {
        self.framer.flush().map_err(Into::into)
    }

    /// Wait `settle_delay`, then [`Session::flush`].
    pub fn settle_and_flush(&mut self) -> Result<usize> {
        std::thread::sleep(self.config.settle_delay);
        let discarded = self.flush()?;
        info!(bytes = discarded, "settled");
        Ok(discarded)
    }

    /// The framer, e.g. to inspect buffered bytes.
    pub fn framer(&self) -> &Framer<T> {
        &self.framer
    }

    pub fn framer_mut(&mut self) -> &mut Framer<T> {
        &mut self.framer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Consume the session and return the stream. Buffered bytes are lost.
    pub fn into_inner(self) -> T {
        self.framer.into_inner()
    }
}

impl Session<DeviceStream> {
    /// Address of the connected device.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.framer.get_ref().peer_addr().map_err(Into::into)
    }

    /// A handle that can close the socket from another thread.
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let stream = self.framer.get_ref().try_clone()?;
        Ok(ShutdownHandle { stream })
    }
}

/// Closes a session's socket from outside the session.
///
/// A read blocked in the session then fails with a transport error.
#[derive(Debug)]
pub struct ShutdownHandle {
    stream: DeviceStream,
}

impl ShutdownHandle {
    pub fn shutdown(&self) -> Result<()> {
        self.stream.shutdown().map_err(Into::into)
    }

    /// Close only the read half. A blocked read returns
    /// `FrameError::ConnectionClosed`; the session can still send.
    pub fn shutdown_read(&self) -> Result<()> {
        self.stream.shutdown_read().map_err(Into::into)
    }
}
