use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serbridge_link::Link;
use tracing::{info, warn};

use crate::cmd::{Context, ListenArgs};
use crate::exit::{link_error, CliError, CliResult, SUCCESS};
use crate::output::print_message;

// Bounds how long a Ctrl-C goes unnoticed while the line is quiet.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(args: ListenArgs, ctx: &Context) -> CliResult<i32> {
    let settings = ctx.settings()?;
    let port = settings.require_port()?;
    let mut link = Link::open(port, &settings.link).map_err(|err| link_error("open failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    let mut corrupt = 0usize;

    while running.load(Ordering::SeqCst) {
        let message = match link.receive_message(Some(POLL_INTERVAL)) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(err) if err.is_checksum_mismatch() => {
                corrupt = corrupt.saturating_add(1);
                warn!(error = %err, corrupt, "checksum failure");
                continue;
            }
            Err(err) => return Err(link_error("receive failed", err)),
        };

        print_message(&message, port, None, ctx.format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    info!(received = printed, corrupt, "listen finished");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
