mod duration;
mod exit;
mod logging;
mod monitor;
mod output;

use std::net::Ipv4Addr;

use clap::error::ErrorKind;
use clap::Parser;
use lmsdiag_transport::DEFAULT_PORT;

use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::monitor::MonitorArgs;
use crate::output::OutputFormat;

const USAGE_HINT: &str = "Usage: lmsdiag <ADDRESS>\nExample: lmsdiag 10.42.42.24";

#[derive(Parser, Debug)]
#[command(
    name = "lmsdiag",
    version,
    about = "Read and decode scan telegrams from a SICK LMS rangefinder"
)]
struct Cli {
    /// IPv4 address of the device.
    #[arg(value_name = "ADDRESS")]
    address: Ipv4Addr,

    /// TCP port of the telegram interface.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Ask the device to stream telegrams instead of polling.
    #[arg(long)]
    stream: bool,

    /// Delay between polls (e.g. 500ms, 2s).
    #[arg(long, default_value = "1s")]
    interval: String,

    /// Exit after this many scan telegrams.
    #[arg(long)]
    count: Option<usize>,

    /// Connect timeout (e.g. 500ms, 5s).
    #[arg(long, default_value = "5s")]
    connect_timeout: String,

    /// Per-frame read timeout (e.g. 500ms, 1s).
    #[arg(long, default_value = "1s")]
    read_timeout: String,

    /// Output format.
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

impl Cli {
    fn monitor_args(self) -> MonitorArgs {
        MonitorArgs {
            address: self.address,
            port: self.port,
            stream: self.stream,
            interval: self.interval,
            count: self.count,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.kind() == ErrorKind::MissingRequiredArgument => {
            eprintln!("{USAGE_HINT}");
            std::process::exit(exit::FAILURE);
        }
        Err(err) => err.exit(),
    };
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = monitor::run(cli.monitor_args(), format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
