use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lmsdiag_frame::FrameConfig;
use lmsdiag_session::{connect_with_config, Session, SessionConfig, ShutdownHandle};
use lmsdiag_telegram::{Command, FrameKind};

use crate::duration::parse_duration;
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// What to watch and how.
#[derive(Debug)]
pub struct MonitorArgs {
    pub address: Ipv4Addr,
    pub port: u16,
    pub stream: bool,
    pub interval: String,
    pub count: Option<usize>,
    pub connect_timeout: String,
    pub read_timeout: String,
}

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let config = SessionConfig {
        connect_timeout: parse_duration(&args.connect_timeout)?,
        frame: FrameConfig {
            read_timeout: Some(parse_duration(&args.read_timeout)?),
            ..FrameConfig::default()
        },
        ..SessionConfig::default()
    };

    let addr = SocketAddr::from((args.address, args.port));
    let mut session =
        connect_with_config(addr, &config).map_err(|err| session_error("connect failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    let handle = session
        .shutdown_handle()
        .map_err(|err| session_error("socket setup failed", err))?;
    install_ctrlc_handler(running.clone(), handle)?;

    // Quiet the device and drop whatever it was already sending.
    session
        .send_command(Command::ScanDataStreaming(false))
        .map_err(|err| session_error("stop streaming failed", err))?;
    session
        .settle_and_flush()
        .map_err(|err| session_error("flush failed", err))?;

    if args.stream {
        session
            .expect_command(Command::ScanDataStreaming(true))
            .map_err(|err| session_error("enable streaming failed", err))?;
    }

    let mut telegrams = 0usize;
    while running.load(Ordering::SeqCst) {
        if !args.stream {
            if let Err(err) = session.send_command(Command::ReadScanData) {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                return Err(session_error("poll failed", err));
            }
        }

        let frame = match session.recv() {
            Ok(frame) => frame,
            Err(err) if err.is_timeout() => {
                tracing::warn!("no frame within read timeout");
                continue;
            }
            Err(_) if !running.load(Ordering::SeqCst) => break,
            Err(err) => return Err(session_error("receive failed", err)),
        };

        if print_frame(&frame, format) == FrameKind::ScanData {
            telegrams = telegrams.saturating_add(1);
            if args.count.is_some_and(|count| telegrams >= count) {
                stop_streaming(&mut session, args.stream);
                return Ok(SUCCESS);
            }
        }

        if !args.stream {
            sleep_while_running(interval, &running);
        }
    }

    tracing::info!(telegrams, "interrupted");
    stop_streaming(&mut session, args.stream);
    Ok(SUCCESS)
}

fn stop_streaming(session: &mut Session, streaming: bool) {
    if !streaming {
        return;
    }
    if let Err(err) = session.send_command(Command::ScanDataStreaming(false)) {
        tracing::warn!(error = %err, "failed to stop streaming");
    }
}

fn sleep_while_running(total: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        std::thread::sleep(remaining.min(SLEEP_SLICE));
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>, handle: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        // Reads only: the stop command still has to go out.
        if let Err(err) = handle.shutdown_read() {
            tracing::debug!(error = %err, "socket shutdown failed");
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
