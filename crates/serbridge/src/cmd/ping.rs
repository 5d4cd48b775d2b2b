use std::time::Instant;

use serbridge_frame::{Command, Message};
use serbridge_link::Link;
use tracing::{debug, warn};

use crate::cmd::{parse_duration, Context, PingArgs};
use crate::exit::{link_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::print_message;

pub fn run(args: PingArgs, ctx: &Context) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let settings = ctx.settings()?;
    let port = settings.require_port()?;

    let mut link = Link::open(port, &settings.link).map_err(|err| link_error("open failed", err))?;
    let id = rand::random::<u8>();
    let started = Instant::now();
    link.send(&Message::ping(id))
        .map_err(|err| link_error("send failed", err))?;
    debug!(port, id, "ping sent");

    let deadline = started + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match link.receive_message(Some(remaining)) {
            Ok(Some(reply)) if reply.command == Command::Ping && reply.id == id => {
                print_message(&reply, port, Some(started.elapsed()), ctx.format);
                return Ok(SUCCESS);
            }
            Ok(Some(reply)) => {
                debug!(command = %reply.command, id = reply.id, "ignoring unrelated message");
            }
            Ok(None) if remaining.is_zero() => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no ping reply from {port} within {timeout:?}"),
                ))
            }
            Ok(None) => {}
            Err(err) if err.is_checksum_mismatch() => {
                warn!(error = %err, "discarding corrupt reply");
            }
            Err(err) => return Err(link_error("receive failed", err)),
        }
    }
}
