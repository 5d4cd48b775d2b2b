use std::io::{IsTerminal, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serbridge_frame::Message;
use serbridge_transport::PortKind;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    port: &'a str,
    command: u16,
    command_name: String,
    id: u8,
    fragments: u16,
    fragment: u16,
    length: usize,
    payload: String,
    payload_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<f64>,
    timestamp: String,
}

pub fn print_message(
    message: &Message,
    port: &str,
    latency: Option<Duration>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                port,
                command: message.command.code(),
                command_name: message.command.to_string(),
                id: message.id,
                fragments: message.fragments,
                fragment: message.fragment,
                length: message.length(),
                payload: payload_preview(&message.payload),
                payload_hex: hex::encode(&message.payload),
                latency_ms: latency.map(|d| d.as_secs_f64() * 1000.0),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut header = vec!["COMMAND", "ID", "FRAGMENT", "SIZE", "PAYLOAD"];
            let mut row = vec![
                message.command.to_string(),
                message.id.to_string(),
                format!("{}/{}", message.fragment, message.fragments),
                message.length().to_string(),
                payload_preview(&message.payload),
            ];
            if let Some(latency) = latency {
                header.push("LATENCY");
                row.push(format!("{latency:?}"));
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header)
                .add_row(row);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = format!(
                "command={} id={} fragment={}/{} size={} payload={}",
                message.command,
                message.id,
                message.fragment,
                message.fragments,
                message.length(),
                payload_preview(&message.payload)
            );
            if let Some(latency) = latency {
                line.push_str(&format!(" latency={latency:?}"));
            }
            println!("{line}");
        }
        OutputFormat::Raw => {
            print_raw(&message.payload);
        }
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    vid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl<'a> PortOutput<'a> {
    fn new(name: &'a str, kind: &'a PortKind) -> Self {
        match kind {
            PortKind::Usb {
                vid,
                pid,
                serial_number,
                manufacturer,
                product,
            } => Self {
                name,
                kind: kind.label(),
                vid: Some(format!("{vid:04x}")),
                pid: Some(format!("{pid:04x}")),
                description: describe_usb(
                    manufacturer.as_deref(),
                    product.as_deref(),
                    serial_number.as_deref(),
                ),
            },
            other => Self {
                name,
                kind: other.label(),
                vid: None,
                pid: None,
                description: None,
            },
        }
    }
}

/// Print enumerated ports, in the order given.
pub fn print_ports(ports: &[(&str, &PortKind)], format: OutputFormat) {
    let rows: Vec<PortOutput<'_>> = ports
        .iter()
        .map(|(name, kind)| PortOutput::new(name, kind))
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "KIND", "VID:PID", "DESCRIPTION"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.kind.to_string(),
                    usb_id(row),
                    row.description.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                match &row.description {
                    Some(description) => {
                        println!("{}\t{}\t{}\t{}", row.name, row.kind, usb_id(row), description)
                    }
                    None => println!("{}\t{}", row.name, row.kind),
                }
            }
        }
    }
}

#[derive(Serialize)]
struct DiscoveryOutput<'a> {
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<&'a str>,
    candidates: usize,
}

/// Print the outcome of a discovery run.
pub fn print_discovery(port: Option<&str>, candidates: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DiscoveryOutput {
                found: port.is_some(),
                port,
                candidates,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["PORT", "CANDIDATES"])
                .add_row(vec![
                    port.unwrap_or("-").to_string(),
                    candidates.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            if let Some(port) = port {
                println!("{port}");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn usb_id(row: &PortOutput<'_>) -> String {
    match (&row.vid, &row.pid) {
        (Some(vid), Some(pid)) => format!("{vid}:{pid}"),
        _ => String::new(),
    }
}

fn describe_usb(
    manufacturer: Option<&str>,
    product: Option<&str>,
    serial_number: Option<&str>,
) -> Option<String> {
    let mut parts: Vec<String> = [manufacturer, product]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    if let Some(serial) = serial_number {
        parts.push(format!("(sn {serial})"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_description() {
        assert_eq!(
            describe_usb(Some("FTDI"), Some("FT232R"), Some("A50285BI")).as_deref(),
            Some("FTDI FT232R (sn A50285BI)")
        );
        assert_eq!(describe_usb(None, None, None), None);
    }

    #[test]
    fn port_output_for_usb() {
        let kind = PortKind::Usb {
            vid: 0x0403,
            pid: 0x6001,
            serial_number: None,
            manufacturer: Some("FTDI".to_string()),
            product: None,
        };
        let row = PortOutput::new("/dev/ttyUSB0", &kind);
        assert_eq!(row.kind, "usb");
        assert_eq!(usb_id(&row), "0403:6001");

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["vid"], "0403");
        assert_eq!(json["description"], "FTDI");
    }

    #[test]
    fn binary_payload_preview() {
        assert_eq!(payload_preview(b"ok"), "ok");
        assert_eq!(payload_preview(&[0xff, 0xfe]), "<binary 2 bytes>");
    }
}
