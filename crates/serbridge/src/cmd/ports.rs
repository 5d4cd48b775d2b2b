use serbridge_link::{rank_ports, Platform};
use serbridge_transport::available_ports;

use crate::cmd::Context;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::print_ports;

pub fn run(ctx: &Context) -> CliResult<i32> {
    let ports = available_ports().map_err(|err| transport_error("port enumeration failed", err))?;
    let names: Vec<&str> = ports.iter().map(|port| port.name.as_str()).collect();

    let ranked: Vec<_> = rank_ports(Platform::current(), &names)
        .into_iter()
        .filter_map(|name| ports.iter().find(|port| port.name == name))
        .map(|port| (port.name.as_str(), &port.kind))
        .collect();

    print_ports(&ranked, ctx.format);
    Ok(SUCCESS)
}
