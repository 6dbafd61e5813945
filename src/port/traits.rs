//! Core traits for the transport abstraction.
//!
//! Defines the `Transport` trait implemented by local serial lines, TCP
//! gateways, emulated devices and the empty null object, together with the
//! serial line settings used when a local device is opened.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Serial line parameters for local devices.
///
/// Gateways ignore these: the line settings of a serial-to-Ethernet converter
/// are configured on the converter itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Read timeout. Zero means "return whatever is buffered".
    pub timeout: Duration,

    /// Write timeout.
    pub write_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::ZERO,
            write_timeout: Duration::ZERO,
        }
    }
}

impl SerialSettings {
    /// Apply one `key=value` parameter.
    ///
    /// Accepted keys: `baud_rate` (or `baudrate`), `data_bits` (or
    /// `bytesize`), `parity`, `stop_bits` (or `stopbits`), `timeout` and
    /// `write_timeout` (seconds, fractional allowed).
    pub fn apply_param(&mut self, key: &str, value: &str) -> Result<(), PortError> {
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        let bad = |what: &str| PortError::config(format!("invalid {what} '{value}'"));

        match key.trim() {
            "baud_rate" | "baudrate" | "baud" => {
                self.baud_rate = value.parse().map_err(|_| bad("baud rate"))?;
            }
            "data_bits" | "bytesize" => self.data_bits = value.parse()?,
            "parity" => self.parity = value.parse()?,
            "stop_bits" | "stopbits" => self.stop_bits = value.parse()?,
            "flow_control" => self.flow_control = value.parse()?,
            "timeout" => self.timeout = parse_seconds(value).ok_or_else(|| bad("timeout"))?,
            "write_timeout" => {
                self.write_timeout = parse_seconds(value).ok_or_else(|| bad("write_timeout"))?
            }
            other => return Err(PortError::config(format!("unknown serial parameter '{other}'"))),
        }
        Ok(())
    }
}

fn parse_seconds(value: &str) -> Option<Duration> {
    value
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl FromStr for DataBits {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "5" | "five" => Ok(Self::Five),
            "6" | "six" => Ok(Self::Six),
            "7" | "seven" => Ok(Self::Seven),
            "8" | "eight" => Ok(Self::Eight),
            _ => Err(PortError::config(format!("invalid data bits '{s}'"))),
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

impl FromStr for FlowControl {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "software" | "xonxoff" => Ok(Self::Software),
            "hardware" | "rtscts" => Ok(Self::Hardware),
            _ => Err(PortError::config(format!("invalid flow control '{s}'"))),
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl FromStr for Parity {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            _ => Err(PortError::config(format!("invalid parity '{s}'"))),
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl FromStr for StopBits {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "one" => Ok(Self::One),
            "2" | "two" => Ok(Self::Two),
            _ => Err(PortError::config(format!("invalid stop bits '{s}'"))),
        }
    }
}

/// Byte-stream operations shared by every channel type.
///
/// Reads and writes never wait for data: a read returns whatever is
/// immediately available (possibly nothing) and a write returns the number
/// of bytes the channel accepted.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + std::fmt::Debug {
    /// Establish the connection.
    fn open(&mut self) -> Result<(), PortError>;

    /// Release OS resources. Closing a closed transport succeeds.
    fn close(&mut self) -> Result<(), PortError>;

    /// Whether the channel is currently usable.
    fn is_open(&self) -> bool;

    /// Write bytes, returning how many were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read up to `max` immediately available bytes.
    fn read(&mut self, max: usize) -> Result<Vec<u8>, PortError>;

    /// Discard unread input.
    fn reset_input_buffer(&mut self) -> Result<(), PortError>;

    /// Discard unsent output.
    fn reset_output_buffer(&mut self) -> Result<(), PortError>;

    /// Bytes waiting to be read. Only a hint for some transports.
    fn bytes_available(&mut self) -> Result<usize, PortError>;

    /// Name of the device or endpoint.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SerialSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.flow_control, FlowControl::None);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.timeout, Duration::ZERO);
        assert_eq!(settings.write_timeout, Duration::ZERO);
    }

    #[test]
    fn test_data_bits_conversion() {
        let serialport_bits: serialport::DataBits = DataBits::Seven.into();
        assert_eq!(serialport_bits, serialport::DataBits::Seven);
    }

    #[test]
    fn test_parity_conversion() {
        let serialport_parity: serialport::Parity = Parity::Even.into();
        assert_eq!(serialport_parity, serialport::Parity::Even);
    }

    #[test]
    fn test_apply_terminal_params() {
        let mut settings = SerialSettings::default();
        settings.apply_param("baudrate", "115200").unwrap();
        settings.apply_param("bytesize", "7").unwrap();
        settings.apply_param("parity", "'E'").unwrap();
        settings.apply_param("stopbits", "2").unwrap();
        settings.apply_param("write_timeout", "0.5").unwrap();

        assert_eq!(settings.baud_rate, 115200);
        assert_eq!(settings.data_bits, DataBits::Seven);
        assert_eq!(settings.parity, Parity::Even);
        assert_eq!(settings.stop_bits, StopBits::Two);
        assert_eq!(settings.write_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_apply_param_rejects_garbage() {
        let mut settings = SerialSettings::default();
        assert!(settings.apply_param("baudrate", "fast").is_err());
        assert!(settings.apply_param("timeout", "-1").is_err());
        assert!(settings.apply_param("rtscts", "1").is_err());
        assert_eq!(settings, SerialSettings::default());
    }
}
