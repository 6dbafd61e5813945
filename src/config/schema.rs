//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Every section has defaults, so an empty file is a valid configuration.

use super::error::{ConfigError, ConfigResult};
use crate::identifier::DEFAULT_GATEWAY_PORT;
use crate::port::{
    DataBits, FlowControl, GatewaySettings, Parity, PortOptions, SerialSettings, StopBits,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port sharing and gateway timing
    pub ports: PortsConfig,
    /// Line settings for local serial devices
    pub serial: SerialDefaults,
    /// Friendly names mapped to port identifiers
    pub aliases: BTreeMap<String, String>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values that would make every port unusable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::validation("serial.baud_rate", "must be greater than 0"));
        }
        if self.ports.create_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "ports.create_timeout_ms",
                "must be greater than 0",
            ));
        }
        if self.ports.gateway_port == 0 {
            return Err(ConfigError::validation("ports.gateway_port", "must be greater than 0"));
        }
        if let Some((name, _)) = self.aliases.iter().find(|(_, target)| target.trim().is_empty()) {
            return Err(ConfigError::validation(
                format!("aliases.{name}"),
                "target must not be empty",
            ));
        }
        Ok(())
    }

    /// Resolve a port name through aliases.
    pub fn resolve_port(&self, name: &str) -> String {
        self.aliases
            .get(name.trim())
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Construction options for ports opened with this configuration.
    pub fn port_options(&self) -> PortOptions {
        PortOptions {
            serial: self.serial.settings(),
            gateway: self.ports.gateway(),
            suspend_delay: self.ports.suspend_delay(),
            emulator: None,
        }
    }
}

/// Port sharing and gateway section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// Backoff after a failure, in milliseconds
    pub suspend_delay_ms: u64,
    /// Bound on connecting to a gateway, in milliseconds
    pub create_timeout_ms: u64,
    /// Gateway receive timeout used for polling reads, in milliseconds
    pub read_timeout_ms: u64,
    /// Upper bound on draining gateway input, in milliseconds
    pub drain_timeout_ms: u64,
    /// TCP port used when an identifier names only a host
    pub gateway_port: u16,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            suspend_delay_ms: 5000,
            create_timeout_ms: 5000,
            read_timeout_ms: 10,
            drain_timeout_ms: 5000,
            gateway_port: DEFAULT_GATEWAY_PORT,
        }
    }
}

impl PortsConfig {
    pub fn suspend_delay(&self) -> Duration {
        Duration::from_millis(self.suspend_delay_ms)
    }

    /// Gateway settings as used by the transport layer
    pub fn gateway(&self) -> GatewaySettings {
        GatewaySettings {
            default_port: self.gateway_port,
            create_timeout: Duration::from_millis(self.create_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
        }
    }
}

/// Serial line defaults section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialDefaults {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Read timeout in milliseconds, 0 for non-blocking reads
    pub timeout_ms: u64,
    /// Write timeout in milliseconds
    pub write_timeout_ms: u64,
}

impl Default for SerialDefaults {
    fn default() -> Self {
        let settings = SerialSettings::default();
        Self {
            baud_rate: settings.baud_rate,
            data_bits: settings.data_bits,
            parity: settings.parity,
            stop_bits: settings.stop_bits,
            flow_control: settings.flow_control,
            timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl SerialDefaults {
    pub fn settings(&self) -> SerialSettings {
        SerialSettings {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            timeout: Duration::from_millis(self.timeout_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. "info" or "shared_comport=debug"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}
