use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use serbridge_link::LinkConfig;
use serbridge_transport::SerialSettings;
use serde::Deserialize;
use tracing::debug;

use crate::exit::{io_error, CliError, CliResult, USAGE};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

const DEFAULT_TIMEOUT_SECS: f64 = 0.2;

/// On-disk configuration.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub serial: SerialSection,
    pub hdlc: HdlcSection,
    pub format: FormatSection,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialSection {
    pub port: Option<String>,
    pub baudrate: u32,
    /// Per-read timeout in seconds.
    pub timeout: f64,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: None,
            baudrate: serbridge_transport::DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HdlcSection {
    pub crc_enabled: bool,
    pub max_payload: usize,
}

impl Default for HdlcSection {
    fn default() -> Self {
        Self {
            crc_enabled: false,
            max_payload: serbridge_link::DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormatSection {
    /// Text encoding for `send --string` payloads.
    pub encoding: String,
}

impl Default for FormatSection {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
        }
    }
}

/// How `send --string` turns text into payload bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
}

impl FromStr for TextEncoding {
    type Err = CliError;

    fn from_str(name: &str) -> CliResult<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            _ => Err(CliError::new(
                USAGE,
                format!("unsupported format.encoding: {name} (use utf-8, ascii or latin-1)"),
            )),
        }
    }
}

impl TextEncoding {
    /// Encode `text`; characters outside the encoding are a usage error.
    pub fn encode(self, text: &str) -> CliResult<Bytes> {
        let limit = match self {
            Self::Utf8 => return Ok(Bytes::copy_from_slice(text.as_bytes())),
            Self::Ascii => 0x7F,
            Self::Latin1 => 0xFF,
        };
        text.chars()
            .map(|c| {
                u8::try_from(u32::from(c))
                    .ok()
                    .filter(|&byte| u32::from(byte) <= limit)
                    .ok_or_else(|| {
                        CliError::new(USAGE, format!("{c:?} cannot be encoded as {self:?}"))
                    })
            })
            .collect::<CliResult<Vec<u8>>>()
            .map(Bytes::from)
    }
}

/// Values given on the command line, applied over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<String>,
    pub baudrate: Option<u32>,
    pub crc: bool,
    pub max_payload: Option<usize>,
}

/// Fully resolved serial and link settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: Option<String>,
    pub link: LinkConfig,
    pub encoding: TextEncoding,
}

impl Settings {
    /// Port to open; fails when none is configured.
    pub fn require_port(&self) -> CliResult<&str> {
        self.port.as_deref().ok_or_else(|| {
            CliError::new(
                USAGE,
                "no serial port configured (set serial.port in the config file or pass --port)",
            )
        })
    }
}

/// Parse a configuration file body.
pub fn parse(text: &str) -> CliResult<FileConfig> {
    toml::from_str(text)
        .map_err(|err| CliError::new(USAGE, format!("failed to parse config: {err}")))
}

/// Load settings from `path` and apply `overrides`.
///
/// An explicitly named file must exist. The default file may be missing,
/// in which case built-in defaults are used.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> CliResult<Settings> {
    let explicit = path.is_some();
    let path: PathBuf = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), Path::to_path_buf);

    let file = match std::fs::read_to_string(&path) {
        Ok(text) => parse(&text)?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => {
            debug!(path = %path.display(), "no config file; using defaults");
            FileConfig::default()
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(CliError::new(
                USAGE,
                format!("config file not found: {}", path.display()),
            ))
        }
        Err(err) => return Err(io_error(&format!("failed reading {}", path.display()), err)),
    };

    resolve(file, overrides)
}

/// Merge a parsed file with command-line overrides and validate the result.
pub fn resolve(file: FileConfig, overrides: &Overrides) -> CliResult<Settings> {
    let timeout = file.serial.timeout;
    let read_timeout = Duration::try_from_secs_f64(timeout)
        .ok()
        .filter(|timeout| !timeout.is_zero())
        .ok_or_else(|| {
            let msg = format!("serial.timeout must be a positive number of seconds, got {timeout}");
            CliError::new(USAGE, msg)
        })?;

    let link = LinkConfig {
        max_payload: overrides.max_payload.unwrap_or(file.hdlc.max_payload),
        require_crc: overrides.crc || file.hdlc.crc_enabled,
        serial: SerialSettings {
            baud_rate: overrides.baudrate.unwrap_or(file.serial.baudrate),
            timeout: read_timeout,
        },
    };
    link.validate()
        .map_err(|err| CliError::new(USAGE, err.to_string()))?;

    Ok(Settings {
        port: overrides.port.clone().or(file.serial.port),
        link,
        encoding: file.format.encoding.parse()?,
    })
}
