use serbridge_link::{Discovery, LinkConfig};
use tracing::warn;

use crate::cmd::{parse_duration, Context, DiscoverArgs};
use crate::exit::{link_error, CliResult, FAILURE, SUCCESS};
use crate::output::print_discovery;

pub fn run(args: DiscoverArgs, ctx: &Context) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let config = match ctx.settings() {
        Ok(settings) => settings.link,
        Err(err) => {
            warn!(error = %err, "using default serial settings");
            LinkConfig::default()
        }
    };

    let discovery = Discovery::new(config).with_probe_timeout(timeout);
    let candidates = discovery
        .candidates()
        .map_err(|err| link_error("port enumeration failed", err))?;
    let found = discovery.run_with(&candidates, |port, config| {
        serbridge_transport::SerialStream::open(port, &config.serial)
    });

    print_discovery(found.as_deref(), candidates.len(), ctx.format);
    Ok(if found.is_some() { SUCCESS } else { FAILURE })
}
