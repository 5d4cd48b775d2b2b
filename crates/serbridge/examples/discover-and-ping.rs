//! Find the attached device and ping it a few times.
//!
//! Run with:
//!   cargo run --example discover-and-ping
//!
//! The device must echo PING messages with the same id.

use std::time::{Duration, Instant};

use serbridge::frame::{Command, Message};
use serbridge::link::{Discovery, Link, LinkConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LinkConfig::default();

    let Some(port) = Discovery::new(config.clone()).run()? else {
        eprintln!("No device found");
        return Ok(());
    };
    eprintln!("Device on {port}");

    let mut link = Link::open(&port, &config)?;
    for id in 0..4u8 {
        let started = Instant::now();
        link.send(&Message::ping(id))?;
        match link.receive_message(Some(Duration::from_secs(1)))? {
            Some(reply) if reply.command == Command::Ping && reply.id == id => {
                eprintln!("ping {id}: {:?}", started.elapsed());
            }
            Some(reply) => eprintln!("ping {id}: unexpected {} id={}", reply.command, reply.id),
            None => eprintln!("ping {id}: timed out"),
        }
    }

    Ok(())
}
