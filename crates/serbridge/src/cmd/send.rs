use std::io::Read;
use std::time::Instant;

use bytes::Bytes;
use serbridge_frame::{Command, Message};
use serbridge_link::Link;
use tracing::{debug, warn};

use crate::cmd::{parse_duration, Context, SendArgs};
use crate::config::TextEncoding;
use crate::exit::{io_error, link_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::print_message;

pub fn run(args: SendArgs, ctx: &Context) -> CliResult<i32> {
    let command = parse_command(&args.command)?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let settings = ctx.settings()?;
    let payload = resolve_payload(&args, settings.encoding)?;
    let port = settings.require_port()?;

    let mut link = Link::open(port, &settings.link).map_err(|err| link_error("open failed", err))?;
    let message = Message::new(command, args.id, payload);
    let written = link
        .send(&message)
        .map_err(|err| link_error("send failed", err))?;
    debug!(port, command = %command, id = args.id, written, "message sent");

    if !args.wait {
        return Ok(SUCCESS);
    }

    let deadline = Instant::now() + wait_timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match link.receive_message(Some(remaining)) {
            Ok(Some(reply)) => {
                print_message(&reply, port, None, ctx.format);
                return Ok(SUCCESS);
            }
            Ok(None) if remaining.is_zero() => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no reply within {wait_timeout:?}"),
                ))
            }
            // Timed out or not a message; the next pass settles which.
            Ok(None) => {}
            Err(err) if err.is_checksum_mismatch() => {
                warn!(error = %err, "discarding corrupt reply");
            }
            Err(err) => return Err(link_error("receive failed", err)),
        }
    }
}

/// Parse a symbolic name, `0x` hex, or decimal command code.
pub fn parse_command(value: &str) -> CliResult<Command> {
    let name = value.trim().to_ascii_lowercase();
    match name.as_str() {
        "ack" => return Ok(Command::Ack),
        "nak" => return Ok(Command::Nak),
        "ping" => return Ok(Command::Ping),
        "raw" => return Ok(Command::Raw),
        _ => {}
    }

    let code = match name.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => name.parse::<u32>(),
    }
    .map_err(|_| CliError::new(USAGE, format!("invalid command: {value}")))?;

    u16::try_from(code)
        .map(Command::from)
        .map_err(|_| CliError::new(USAGE, format!("command out of range (0..=65535): {value}")))
}

fn resolve_payload(args: &SendArgs, encoding: TextEncoding) -> CliResult<Bytes> {
    if let Some(text) = &args.string {
        return encoding.encode(text);
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(Bytes::from(buf))
}

/// Decode a hex string; whitespace between digits is ignored.
pub fn parse_hex(input: &str) -> CliResult<Bytes> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits)
        .map(Bytes::from)
        .map_err(|err| CliError::new(USAGE, format!("invalid hex string: {err}")))
}
