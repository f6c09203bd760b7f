use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use lmsdiag_transport::ReadTimeout;
use tracing::{debug, info, warn};

use crate::codec::{encode_frame, extract_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::pretty::Pretty;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Incremental frame assembler over one duplex stream.
///
/// Owns the stream and the carry-over buffer. Bytes read past the end of one
/// frame stay buffered and are served by the next `recv`, so frame boundaries
/// survive any chunking the transport applies.
pub struct Framer<T> {
    inner: T,
    buf: BytesMut,
    out: BytesMut,
    chunk: Vec<u8>,
    config: FrameConfig,
}

impl<T: Read + Write> Framer<T> {
    /// Create a new framer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new framer with explicit configuration.
    ///
    /// Timeouts in `config` are not applied to `inner`; see
    /// [`Framer::with_config_timeouts`].
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            out: BytesMut::with_capacity(256),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
            config,
        }
    }

    /// Wrap `message` in STX/ETX and write it (blocking).
    ///
    /// The whole frame is encoded first and written from one buffer.
    pub fn send(&mut self, message: impl AsRef<[u8]>) -> Result<()> {
        let message = message.as_ref();
        self.out.clear();
        encode_frame(message, &mut self.out)?;

        let mut offset = 0usize;
        while offset < self.out.len() {
            match self.inner.write(&self.out[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Err(FrameError::Timeout),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        self.flush_stream()?;

        debug!(message = %Pretty(message), "sent frame");
        Ok(())
    }

    /// Read the next complete frame (blocking).
    ///
    /// Reads are bounded only by whatever timeout the stream itself has.
    /// A read timing out yields `FrameError::Timeout` with buffered bytes kept.
    pub fn recv(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.try_extract()? {
                return Ok(frame);
            }
            self.read_chunk()?;
        }
    }

    /// Extract a frame from already buffered bytes without reading.
    pub fn try_extract(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = extract_frame(&mut self.buf) {
            report(&frame);
            return Ok(Some(frame));
        }
        if self.buf.len() > self.config.max_buffer_size {
            let size = self.buf.len();
            self.buf.clear();
            return Err(FrameError::FrameTooLarge {
                size,
                max: self.config.max_buffer_size,
            });
        }
        Ok(None)
    }

    /// Number of bytes buffered but not yet consumed into a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// The buffered bytes themselves.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the framer and return the inner stream. Buffered bytes are lost.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn read_chunk(&mut self) -> Result<usize> {
        loop {
            match self.inner.read(&mut self.chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => {
                    self.buf.extend_from_slice(&self.chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Err(FrameError::Timeout),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    fn flush_stream(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Err(FrameError::Timeout),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }
}

impl<T: Read + Write + ReadTimeout> Framer<T> {
    /// Create a framer and apply the configured read timeout to `inner`.
    pub fn with_config_timeouts(inner: T, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }

    /// Read the next complete frame, giving up once `timeout` has elapsed.
    ///
    /// The deadline covers the whole call, so a peer trickling bytes without
    /// ever sending an end marker still times out. The stream's own read
    /// timeout is restored before returning.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Frame> {
        if let Some(frame) = self.try_extract()? {
            return Ok(frame);
        }
        let previous = self.inner.read_timeout()?;
        let result = self.recv_until(Instant::now() + timeout);
        self.inner.set_read_timeout(previous)?;
        result
    }

    /// Discard unsolicited data.
    ///
    /// Drains whatever the stream delivers within `flush_timeout` into the
    /// buffer, then empties the buffer. A quiet stream is not an error.
    /// Returns the number of bytes discarded.
    pub fn flush(&mut self) -> Result<usize> {
        let previous = self.inner.read_timeout()?;
        let drained = self.drain_until(Instant::now() + self.config.flush_timeout);
        let restored = self.inner.set_read_timeout(previous);

        let discarded = self.buf.len();
        if discarded > 0 {
            info!(bytes = discarded, data = %Pretty(&self.buf), "flushed");
        }
        self.buf.clear();

        drained?;
        restored?;
        Ok(discarded)
    }

    fn recv_until(&mut self, deadline: Instant) -> Result<Frame> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FrameError::Timeout);
            }
            self.inner.set_read_timeout(Some(remaining))?;
            self.read_chunk()?;
            if let Some(frame) = self.try_extract()? {
                return Ok(frame);
            }
        }
    }

    fn drain_until(&mut self, deadline: Instant) -> Result<()> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            self.inner.set_read_timeout(Some(remaining))?;
            match self.read_chunk() {
                Ok(_) => continue,
                Err(FrameError::Timeout) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn report(frame: &Frame) {
    for diag in &frame.diagnostics {
        warn!(
            kind = diag.kind.as_str(),
            excerpt = %Pretty(&diag.excerpt),
            "malformed frame"
        );
    }
    debug!(
        size = frame.payload.len(),
        body = %Pretty(&frame.payload),
        "received frame"
    );
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::net::{TcpListener, TcpStream};

    use lmsdiag_transport::TransportError;

    use super::*;
    use crate::codec::{MalformedKind, ETX, STX};

    enum Step {
        Data(Vec<u8>),
        Fail(ErrorKind),
        Eof,
    }

    /// Replays scripted reads; goes quiet (`WouldBlock`) once exhausted.
    struct ScriptedStream {
        steps: VecDeque<Step>,
        written: Vec<u8>,
        timeout: Cell<Option<Duration>>,
        timeout_sets: Cell<usize>,
    }

    impl ScriptedStream {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
                written: Vec::new(),
                timeout: Cell::new(None),
                timeout_sets: Cell::new(0),
            }
        }

        fn chunks(chunks: &[&[u8]]) -> Self {
            Self::new(chunks.iter().map(|c| Step::Data(c.to_vec())).collect())
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.steps.pop_front() {
                Some(Step::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.push_front(Step::Data(data.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Step::Fail(kind)) => Err(std::io::Error::from(kind)),
                Some(Step::Eof) => Ok(0),
                None => Err(std::io::Error::from(ErrorKind::WouldBlock)),
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl ReadTimeout for ScriptedStream {
        fn read_timeout(&self) -> lmsdiag_transport::Result<Option<Duration>> {
            Ok(self.timeout.get())
        }

        fn set_read_timeout(&self, timeout: Option<Duration>) -> lmsdiag_transport::Result<()> {
            if timeout == Some(Duration::ZERO) {
                return Err(TransportError::InvalidTimeout);
            }
            self.timeout.set(timeout);
            self.timeout_sets.set(self.timeout_sets.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn recv_single_frame() {
        let mut framer = Framer::new(Cursor::new(b"\x02sEA LMDscandata 0\x03".to_vec()));
        let frame = framer.recv().unwrap();

        assert_eq!(frame.payload.as_ref(), b"sEA LMDscandata 0");
        assert!(frame.is_clean());
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn every_chunking_yields_both_frames_in_order() {
        let wire: &[u8] = &[STX, b'A', ETX, STX, b'B', ETX];
        let gaps = wire.len() - 1;

        // Bit i set: a chunk boundary after byte i.
        for cuts in 0u32..(1 << gaps) {
            let mut chunks: Vec<&[u8]> = Vec::new();
            let mut from = 0;
            for i in 0..gaps {
                if cuts & (1 << i) != 0 {
                    chunks.push(&wire[from..=i]);
                    from = i + 1;
                }
            }
            chunks.push(&wire[from..]);

            let mut framer = Framer::new(ScriptedStream::chunks(&chunks));
            let a = framer.recv().unwrap();
            let b = framer.recv().unwrap();

            assert_eq!(a.payload.as_ref(), b"A", "cuts {cuts:05b}");
            assert_eq!(b.payload.as_ref(), b"B", "cuts {cuts:05b}");
            assert!(a.is_clean() && b.is_clean(), "cuts {cuts:05b}");
            assert_eq!(framer.pending(), 0);
        }
    }

    #[test]
    fn byte_by_byte_delivery() {
        let wire = b"\x02sRA LMDscandata 1 0\x03";
        let steps = wire.iter().map(|b| Step::Data(vec![*b])).collect();
        let mut framer = Framer::new(ScriptedStream::new(steps));

        let frame = framer.recv().unwrap();
        assert_eq!(frame.payload.as_ref(), b"sRA LMDscandata 1 0");
    }

    #[test]
    fn small_read_chunks_split_large_reads() {
        let config = FrameConfig {
            read_chunk_size: 3,
            ..FrameConfig::default()
        };
        let stream = ScriptedStream::chunks(&[b"\x02one\x03\x02two\x03"]);
        let mut framer = Framer::with_config(stream, config);

        assert_eq!(framer.recv().unwrap().payload.as_ref(), b"one");
        assert_eq!(framer.recv().unwrap().payload.as_ref(), b"two");
    }

    #[test]
    fn interrupted_read_retries() {
        let stream = ScriptedStream::new(vec![
            Step::Fail(ErrorKind::Interrupted),
            Step::Data(b"\x02ok\x03".to_vec()),
        ]);
        let mut framer = Framer::new(stream);

        assert_eq!(framer.recv().unwrap().payload.as_ref(), b"ok");
    }

    #[test]
    fn timeout_keeps_partial_frame() {
        let stream = ScriptedStream::new(vec![
            Step::Data(b"\x02sRA".to_vec()),
            Step::Fail(ErrorKind::WouldBlock),
            Step::Data(b" LMDscandata\x03".to_vec()),
        ]);
        let mut framer = Framer::new(stream);

        let err = framer.recv().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(framer.buffered(), b"\x02sRA");

        let frame = framer.recv().unwrap();
        assert_eq!(frame.payload.as_ref(), b"sRA LMDscandata");
    }

    #[test]
    fn timed_out_kind_maps_to_timeout() {
        let stream = ScriptedStream::new(vec![Step::Fail(ErrorKind::TimedOut)]);
        let mut framer = Framer::new(stream);
        assert!(matches!(framer.recv(), Err(FrameError::Timeout)));
    }

    #[test]
    fn eof_is_connection_closed() {
        let stream = ScriptedStream::new(vec![Step::Data(b"\x02partial".to_vec()), Step::Eof]);
        let mut framer = Framer::new(stream);
        assert!(matches!(framer.recv(), Err(FrameError::ConnectionClosed)));
    }

    #[test]
    fn other_io_errors_propagate() {
        let stream = ScriptedStream::new(vec![Step::Fail(ErrorKind::ConnectionReset)]);
        let mut framer = Framer::new(stream);
        let err = framer.recv().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
    }

    #[test]
    fn leading_garbage_is_reported_not_fatal() {
        let stream = ScriptedStream::chunks(&[b"noise\x02M\x03"]);
        let mut framer = Framer::new(stream);

        let frame = framer.recv().unwrap();
        assert_eq!(frame.payload.as_ref(), b"M");
        assert_eq!(frame.diagnostics.len(), 1);
        assert_eq!(frame.diagnostics[0].kind, MalformedKind::LeadingGarbage);
    }

    #[test]
    fn missing_start_returns_degraded_frame() {
        let stream = ScriptedStream::chunks(&[b"X\x03"]);
        let mut framer = Framer::new(stream);

        let frame = framer.recv().unwrap();
        assert_eq!(frame.payload.as_ref(), b"X");
        assert!(frame.has(MalformedKind::MissingStart));
    }

    #[test]
    fn buffer_limit_discards_runaway_data() {
        let config = FrameConfig {
            max_buffer_size: 8,
            ..FrameConfig::default()
        };
        let stream = ScriptedStream::chunks(&[b"\x02no end marker in sight"]);
        let mut framer = Framer::with_config(stream, config);

        let err = framer.recv().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { max: 8, .. }));
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn send_wraps_message_in_markers() {
        let mut framer = Framer::new(Cursor::new(Vec::<u8>::new()));
        framer.send("sRN LMDscandata").unwrap();

        let wire = framer.into_inner().into_inner();
        assert_eq!(wire, b"\x02sRN LMDscandata\x03");
    }

    #[test]
    fn send_rejects_marker_in_message() {
        let mut framer = Framer::new(ScriptedStream::new(Vec::new()));
        let err = framer.send("bad\x02cmd").unwrap_err();

        assert!(matches!(err, FrameError::MarkerInMessage { offset: 3, .. }));
        assert!(framer.get_ref().written.is_empty());
    }

    #[test]
    fn flush_discards_buffered_and_pending_data() {
        let stream = ScriptedStream::new(vec![
            Step::Data(b"\x02sRA LMDscandata 1".to_vec()),
            Step::Fail(ErrorKind::WouldBlock),
            Step::Data(b" 2 3\x03\x02sSN LMD".to_vec()),
            Step::Data(b"scandata 4\x03".to_vec()),
        ]);
        let mut framer = Framer::new(stream);

        assert!(framer.recv().unwrap_err().is_timeout());
        assert_eq!(framer.pending(), 18);

        let discarded = framer.flush().unwrap();
        assert_eq!(discarded, 18 + 13 + 11);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn flush_twice_is_idempotent() {
        let stream = ScriptedStream::chunks(&[b"\x02sEA LMDscandata 0\x03"]);
        let mut framer = Framer::new(stream);

        assert_eq!(framer.flush().unwrap(), 19);
        assert_eq!(framer.pending(), 0);
        assert_eq!(framer.flush().unwrap(), 0);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn flush_restores_read_timeout() {
        let stream = ScriptedStream::new(Vec::new());
        stream
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        let mut framer = Framer::new(stream);

        framer.flush().unwrap();
        assert_eq!(
            framer.get_ref().read_timeout().unwrap(),
            Some(Duration::from_secs(1))
        );
        assert!(framer.get_ref().timeout_sets.get() >= 2);
    }

    #[test]
    fn flush_propagates_connection_closed() {
        let stream = ScriptedStream::new(vec![Step::Data(b"leftover".to_vec()), Step::Eof]);
        let mut framer = Framer::new(stream);

        assert!(matches!(framer.flush(), Err(FrameError::ConnectionClosed)));
        assert_eq!(framer.pending(), 0);
    }

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn recv_timeout_expires_on_quiet_socket() {
        let (client, _server) = tcp_pair();
        let config = FrameConfig {
            read_timeout: Some(Duration::from_secs(5)),
            ..FrameConfig::default()
        };
        let mut framer = Framer::with_config_timeouts(client, config).unwrap();

        let started = Instant::now();
        let err = framer.recv_timeout(Duration::from_millis(100)).unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            ReadTimeout::read_timeout(framer.get_ref()).unwrap(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn roundtrip_over_tcp_with_fragmented_writes() {
        let (client, mut server) = tcp_pair();
        let mut framer = Framer::with_config_timeouts(client, FrameConfig::default()).unwrap();

        let device = std::thread::spawn(move || {
            let mut reader = Framer::new(server.try_clone().unwrap());
            let command = reader.recv().unwrap();
            assert_eq!(command.payload.as_ref(), b"sRN LMDscandata");

            let pieces: [&[u8]; 3] = [
                b"\x02sRA LMD",
                b"scandata 1 0\x03\x02sEA",
                b" LMDscandata 0\x03",
            ];
            for piece in pieces {
                server.write_all(piece).unwrap();
                std::thread::sleep(Duration::from_millis(10));
            }
        });

        framer.send("sRN LMDscandata").unwrap();
        let telegram = framer.recv_timeout(Duration::from_secs(2)).unwrap();
        let ack = framer.recv_timeout(Duration::from_secs(2)).unwrap();

        assert_eq!(telegram.payload.as_ref(), b"sRA LMDscandata 1 0");
        assert_eq!(ack.payload.as_ref(), b"sEA LMDscandata 0");

        device.join().unwrap();
    }
}
