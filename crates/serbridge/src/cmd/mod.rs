use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::config::{self, Overrides, Settings};
use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod discover;
pub mod listen;
pub mod ping;
pub mod ports;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message to the device.
    Send(SendArgs),
    /// Ping the device and report the round trip.
    Ping(PingArgs),
    /// Print received messages.
    Listen(ListenArgs),
    /// Find the port the device is attached to.
    Discover(DiscoverArgs),
    /// List serial ports in probing order.
    Ports,
    /// Show version information.
    Version(VersionArgs),
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub format: OutputFormat,
    pub config_path: Option<PathBuf>,
    pub overrides: Overrides,
}

impl Context {
    pub fn settings(&self) -> CliResult<Settings> {
        config::load(self.config_path.as_deref(), &self.overrides)
    }
}

pub fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, ctx),
        Command::Ping(args) => ping::run(args, ctx),
        Command::Listen(args) => listen::run(args, ctx),
        Command::Discover(args) => discover::run(args, ctx),
        Command::Ports => ports::run(ctx),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// ack, nak, ping, raw, or a numeric code (decimal or 0x hex).
    pub command: String,
    /// String payload, encoded per format.encoding (utf-8, ascii or latin-1).
    #[arg(short = 's', long = "string", conflicts_with = "hex")]
    pub string: Option<String>,
    /// Hex payload, e.g. "01 02 0a" or "01020a".
    #[arg(short = 'x', long = "hex", conflicts_with = "string")]
    pub hex: Option<String>,
    /// Message id.
    #[arg(long, default_value = "0")]
    pub id: u8,
    /// Wait for one reply and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// How long to wait for the echo (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// How long each port has to answer the ping (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }
}
