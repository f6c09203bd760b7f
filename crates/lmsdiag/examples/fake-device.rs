//! Minimal device emulator: answers scan requests like an LMS would.
//!
//! Run with:
//!   cargo run --example fake-device -- 127.0.0.1:2112
//!
//! In another terminal:
//!   cargo run -- 127.0.0.1 --count 3
//!   cargo run -- 127.0.0.1 --stream --count 3

use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use lmsdiag::frame::{FrameError, Framer};
use lmsdiag::telegram::SCAN_DATA;

const STREAM_PERIOD: Duration = Duration::from_millis(200);

fn telegram(command_type: &str, counter: u32) -> String {
    format!(
        "{command_type} {SCAN_DATA} 1 0 12345 0 0 {counter} {counter} 9 0 0 0 0 0 0 5000 5000 1 2"
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:2112".to_string());

    let listener = TcpListener::bind(&addr)?;
    eprintln!("Listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept()?;
        eprintln!("Client connected: {peer}");
        if let Err(e) = serve(Framer::new(stream)) {
            eprintln!("Client disconnected: {e}");
        }
    }
}

/// Answer one client until it hangs up.
fn serve(mut device: Framer<TcpStream>) -> Result<(), FrameError> {
    let mut streaming = false;
    let mut counter = 0u32;

    loop {
        let frame = match device.recv_timeout(STREAM_PERIOD) {
            Ok(frame) => frame,
            Err(FrameError::Timeout) => {
                if streaming {
                    counter = counter.wrapping_add(1);
                    device.send(telegram("sSN", counter))?;
                }
                continue;
            }
            Err(e) => return Err(e),
        };

        let body = frame.text();
        eprintln!("Received {body:?}");
        match &*body {
            "sRN LMDscandata" => {
                counter = counter.wrapping_add(1);
                device.send(telegram("sRA", counter))?;
            }
            "sEN LMDscandata 0" => {
                streaming = false;
                device.send("sEA LMDscandata 0")?;
            }
            "sEN LMDscandata 1" => {
                streaming = true;
                device.send("sEA LMDscandata 1")?;
            }
            _ => device.send("sFA 1")?,
        }
    }
}
