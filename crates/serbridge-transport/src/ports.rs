//! Enumeration of the serial ports visible to the host.

use serialport::SerialPortType;
use tracing::debug;

use crate::error::{Result, TransportError};

/// What kind of device backs a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    /// USB serial adapter or CDC-ACM device.
    Usb {
        vid: u16,
        pid: u16,
        serial_number: Option<String>,
        manufacturer: Option<String>,
        product: Option<String>,
    },
    Pci,
    Bluetooth,
    Unknown,
}

impl PortKind {
    /// Short label for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            PortKind::Usb { .. } => "usb",
            PortKind::Pci => "pci",
            PortKind::Bluetooth => "bluetooth",
            PortKind::Unknown => "unknown",
        }
    }
}

impl From<SerialPortType> for PortKind {
    fn from(kind: SerialPortType) -> Self {
        match kind {
            SerialPortType::UsbPort(info) => PortKind::Usb {
                vid: info.vid,
                pid: info.pid,
                serial_number: info.serial_number,
                manufacturer: info.manufacturer,
                product: info.product,
            },
            SerialPortType::PciPort => PortKind::Pci,
            SerialPortType::BluetoothPort => PortKind::Bluetooth,
            SerialPortType::Unknown => PortKind::Unknown,
        }
    }
}

/// A port the host can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path or name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub name: String,
    pub kind: PortKind,
}

impl PortInfo {
    pub fn new(name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// List every serial port visible to the host, in driver order.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports
        .into_iter()
        .map(|port| PortInfo::new(port.port_name, port.port_type.into()))
        .collect())
}
