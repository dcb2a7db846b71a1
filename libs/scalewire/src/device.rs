//! Device descriptors for weighing indicators
//!
//! A [`DeviceDescriptor`] is everything the gateway knows about one scale:
//! identity, vendor protocol, how to reach it, the per-device command map and
//! the exchange timeout. Descriptors come from the external device store and
//! are validated before a session is built on top of them.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{WireError, WireResult};

/// Vendor protocol spoken by a device.
///
/// Closed set on purpose: protocol dispatch is an exhaustive `match`, not a
/// plugin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ScaleProtocol {
    /// Rinstrum token command protocol
    #[serde(rename = "RINCMD")]
    Rincmd,
    /// Dini Argeo DFW comma-separated ASCII protocol
    #[serde(rename = "DFW_ASCII")]
    DfwAscii,
}

impl ScaleProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleProtocol::Rincmd => "RINCMD",
            ScaleProtocol::DfwAscii => "DFW_ASCII",
        }
    }
}

impl fmt::Display for ScaleProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical command set exposed to upstream callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum LogicalCommand {
    ReadGross,
    ReadNet,
    Tare,
    Zero,
}

impl LogicalCommand {
    pub const ALL: [LogicalCommand; 4] = [
        LogicalCommand::ReadGross,
        LogicalCommand::ReadNet,
        LogicalCommand::Tare,
        LogicalCommand::Zero,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalCommand::ReadGross => "readGross",
            LogicalCommand::ReadNet => "readNet",
            LogicalCommand::Tare => "tare",
            LogicalCommand::Zero => "zero",
        }
    }

    /// Weight queries carry a reading back; tare/zero only acknowledge
    pub fn expects_weight(&self) -> bool {
        matches!(self, LogicalCommand::ReadGross | LogicalCommand::ReadNet)
    }
}

impl fmt::Display for LogicalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalCommand {
    type Err = WireError;

    fn from_str(s: &str) -> WireResult<Self> {
        match s {
            "readGross" => Ok(LogicalCommand::ReadGross),
            "readNet" => Ok(LogicalCommand::ReadNet),
            "tare" => Ok(LogicalCommand::Tare),
            "zero" => Ok(LogicalCommand::Zero),
            other => Err(WireError::config(format!("Unknown command: {}", other))),
        }
    }
}

/// Per-device map from logical command to protocol wire token.
///
/// Keys are closed; any entry may be absent, which surfaces as a
/// command-not-mapped failure at execution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CommandMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_gross: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_net: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tare: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero: Option<String>,
}

impl CommandMap {
    /// Wire token for a logical command, if mapped
    pub fn token(&self, command: LogicalCommand) -> Option<&str> {
        match command {
            LogicalCommand::ReadGross => self.read_gross.as_deref(),
            LogicalCommand::ReadNet => self.read_net.as_deref(),
            LogicalCommand::Tare => self.tare.as_deref(),
            LogicalCommand::Zero => self.zero.as_deref(),
        }
    }

    /// Factory map for Rinstrum indicators (R320/C320 register set)
    pub fn rincmd_defaults() -> Self {
        Self {
            read_gross: Some("20050026".to_string()),
            read_net: Some("20050025".to_string()),
            tare: Some("21120008:0C".to_string()),
            zero: Some("21120008:0B".to_string()),
        }
    }

    /// Factory map for Dini Argeo DFW indicators
    pub fn dfw_defaults() -> Self {
        Self {
            read_gross: Some("READ".to_string()),
            read_net: Some("REXT".to_string()),
            tare: Some("TARE".to_string()),
            zero: Some("ZERO".to_string()),
        }
    }
}

/// Serial parity setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Serial stop bits setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// Serial flow control setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

/// How the gateway reaches a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "connection_type", rename_all = "lowercase")]
pub enum ConnectionSettings {
    Tcp {
        #[serde(default = "default_tcp_host")]
        host: String,
        #[serde(default = "default_tcp_port")]
        port: u16,
    },
    Serial {
        #[serde(default = "default_serial_port")]
        port_path: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        #[serde(default = "default_data_bits")]
        data_bits: u8,
        #[serde(default)]
        stop_bits: StopBits,
        #[serde(default)]
        parity: Parity,
        #[serde(default)]
        flow_control: FlowControl,
    },
}

impl ConnectionSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionSettings::Tcp { .. } => "tcp",
            ConnectionSettings::Serial { .. } => "serial",
        }
    }

    /// Human-readable endpoint for logs
    pub fn endpoint(&self) -> String {
        match self {
            ConnectionSettings::Tcp { host, port } => format!("{}:{}", host, port),
            ConnectionSettings::Serial {
                port_path,
                baud_rate,
                ..
            } => format!("{}@{}", port_path, baud_rate),
        }
    }
}

/// Full description of one weighing device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeviceDescriptor {
    /// Unique registry key
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    pub protocol: ScaleProtocol,
    pub connection: ConnectionSettings,
    /// Budget per phase (connect, then each exchange), milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub command_map: CommandMap,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl DeviceDescriptor {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate invariants the rest of the library relies on
    pub fn validate(&self) -> WireResult<()> {
        if self.id.trim().is_empty() {
            return Err(WireError::config("Device id cannot be empty"));
        }

        if self.name.trim().is_empty() {
            return Err(WireError::config(format!(
                "Device {}: name cannot be empty",
                self.id
            )));
        }

        if self.timeout_ms == 0 {
            return Err(WireError::config(format!(
                "Device {}: timeout must be greater than zero",
                self.id
            )));
        }

        match &self.connection {
            ConnectionSettings::Tcp { host, port } => {
                if host.trim().is_empty() {
                    return Err(WireError::config(format!(
                        "Device {}: TCP host cannot be empty",
                        self.id
                    )));
                }
                if *port == 0 {
                    return Err(WireError::config(format!(
                        "Device {}: TCP port must be greater than zero",
                        self.id
                    )));
                }
            }
            ConnectionSettings::Serial {
                port_path,
                baud_rate,
                data_bits,
                ..
            } => {
                if port_path.trim().is_empty() {
                    return Err(WireError::config(format!(
                        "Device {}: serial port path cannot be empty",
                        self.id
                    )));
                }
                if *baud_rate == 0 {
                    return Err(WireError::config(format!(
                        "Device {}: baud rate must be greater than zero",
                        self.id
                    )));
                }
                if ![5, 6, 7, 8].contains(data_bits) {
                    return Err(WireError::config(format!(
                        "Device {}: data bits must be 5, 6, 7, or 8",
                        self.id
                    )));
                }
            }
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_tcp_host() -> String {
    "192.168.1.254".to_string()
}

fn default_tcp_port() -> u16 {
    4001
}

fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}
