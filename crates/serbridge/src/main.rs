mod cmd;
mod config;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{Command, Context};
use crate::config::Overrides;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "serbridge", version, about = "Framed serial messaging CLI")]
struct Cli {
    /// Configuration file (TOML). Defaults to ./config.toml when present.
    #[arg(long, value_name = "PATH", global = true, env = "SERBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port, overriding serial.port.
    #[arg(long, short = 'p', value_name = "PORT", global = true)]
    port: Option<String>,

    /// Line speed, overriding serial.baudrate.
    #[arg(long, value_name = "BAUD", global = true)]
    baudrate: Option<u32>,

    /// Require a valid checksum on received frames, overriding hdlc.crc_enabled.
    #[arg(long, global = true)]
    crc: bool,

    /// Largest payload per frame, overriding hdlc.max_payload.
    #[arg(long, value_name = "BYTES", global = true)]
    max_payload: Option<usize>,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let ctx = Context {
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
        config_path: cli.config,
        overrides: Overrides {
            port: cli.port,
            baudrate: cli.baudrate,
            crc: cli.crc,
            max_payload: cli.max_payload,
        },
    };
    let result = cmd::run(cli.command, &ctx);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
