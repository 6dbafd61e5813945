//! Port identifiers.
//!
//! A [`PortId`] is the normalized registry key for one physical or logical
//! channel. The identifier prefix also decides which transport backs the
//! port, see [`TransportKind`].

use crate::port::PortError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// TCP port used by serial-to-Ethernet gateways when the identifier has none.
pub const DEFAULT_GATEWAY_PORT: u16 = 4001;

/// Which transport backs a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Externally supplied device double (`FAKE...`, `EMULATED...`).
    Emulated,
    /// Local serial line (`COMn`, `tty...`, `/dev/...`, `cua...`).
    LocalSerial,
    /// TCP connection to a serial-to-Ethernet gateway (`host[:port]`).
    TcpGateway,
    /// Null transport used when nothing could be constructed.
    Empty,
}

impl TransportKind {
    /// Classify a trimmed identifier by its prefix.
    pub fn classify(id: &str) -> Self {
        if id.starts_with("FAKE") || id.starts_with("EMULATED") {
            Self::Emulated
        } else if has_com_prefix(id)
            || id.starts_with("tty")
            || id.starts_with("/dev")
            || id.starts_with("cua")
        {
            Self::LocalSerial
        } else {
            Self::TcpGateway
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Emulated => "emulated",
            Self::LocalSerial => "local-serial",
            Self::TcpGateway => "tcp-gateway",
            Self::Empty => "empty",
        };
        f.write_str(name)
    }
}

fn has_com_prefix(id: &str) -> bool {
    id.get(..3)
        .map(|p| p.eq_ignore_ascii_case("com"))
        .unwrap_or(false)
}

/// Normalized port identifier.
///
/// Normalization trims whitespace, upper-cases `COM` names (Windows device
/// names are case-insensitive) and strips blanks around the `:` of gateway
/// identifiers. Device paths, host names and emulated names keep their case:
/// lower-casing a host could turn `TTY1` into the serial name `tty1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortId(String);

impl PortId {
    /// Normalize a raw identifier.
    pub fn parse(raw: &str) -> Result<Self, PortError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(PortError::config("port identifier is empty"));
        }

        let normalized = match TransportKind::classify(id) {
            TransportKind::LocalSerial if has_com_prefix(id) => id.to_ascii_uppercase(),
            TransportKind::TcpGateway => match id.split_once(':') {
                Some((host, port)) => format!("{}:{}", host.trim(), port.trim()),
                None => id.to_string(),
            },
            _ => id.to_string(),
        };

        Ok(Self(normalized))
    }

    /// The normalized identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Transport selected by this identifier.
    pub fn kind(&self) -> TransportKind {
        TransportKind::classify(&self.0)
    }
}

impl FromStr for PortId {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PortId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Host and TCP port of a serial-to-Ethernet gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayAddress {
    pub host: String,
    pub port: u16,
}

impl GatewayAddress {
    /// Parse `host[:port]`, falling back to `default_port` when no port is given.
    pub fn parse(id: &str, default_port: u16) -> Result<Self, PortError> {
        let (host, port) = match id.split_once(':') {
            Some((host, port)) => {
                let port = port.trim().parse::<u16>().map_err(|e| {
                    PortError::invalid_address(id, format!("bad port number: {e}"))
                })?;
                (host.trim(), port)
            }
            None => (id.trim(), default_port),
        };

        if host.is_empty() {
            return Err(PortError::invalid_address(id, "host is empty"));
        }
        if port == 0 {
            return Err(PortError::invalid_address(id, "port 0 is not connectable"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for GatewayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_com_names_are_case_insensitive() {
        let upper = PortId::parse("COM5").unwrap();
        let lower = PortId::parse("com5").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(lower.as_str(), "COM5");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(PortId::parse("  /dev/ttyUSB0\n").unwrap().as_str(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_device_paths_keep_case() {
        let id = PortId::parse("/dev/ttyACM0").unwrap();
        assert_eq!(id.as_str(), "/dev/ttyACM0");
        assert_ne!(id, PortId::parse("/dev/TTYACM0").unwrap());
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let err = PortId::parse("   ").unwrap_err();
        assert!(matches!(err, PortError::Configuration(_)));
    }

    #[test]
    fn test_classification() {
        assert_eq!(TransportKind::classify("FAKE1"), TransportKind::Emulated);
        assert_eq!(TransportKind::classify("EMULATED_PSU"), TransportKind::Emulated);
        assert_eq!(TransportKind::classify("COM3"), TransportKind::LocalSerial);
        assert_eq!(TransportKind::classify("com3"), TransportKind::LocalSerial);
        assert_eq!(TransportKind::classify("ttyS0"), TransportKind::LocalSerial);
        assert_eq!(TransportKind::classify("/dev/ttyUSB0"), TransportKind::LocalSerial);
        assert_eq!(TransportKind::classify("cuaU0"), TransportKind::LocalSerial);
        assert_eq!(TransportKind::classify("192.168.1.10"), TransportKind::TcpGateway);
        assert_eq!(TransportKind::classify("moxa-1:4002"), TransportKind::TcpGateway);
    }

    #[test]
    fn test_gateway_blanks_removed() {
        let id = PortId::parse("Moxa-Lab : 4002").unwrap();
        assert_eq!(id.as_str(), "Moxa-Lab:4002");
        assert_eq!(id.kind(), TransportKind::TcpGateway);
    }

    #[test]
    fn test_gateway_address_with_port() {
        let addr = GatewayAddress::parse("192.168.1.10:5001", DEFAULT_GATEWAY_PORT).unwrap();
        assert_eq!(addr.host, "192.168.1.10");
        assert_eq!(addr.port, 5001);
    }

    #[test]
    fn test_gateway_address_default_port() {
        let addr = GatewayAddress::parse("192.168.1.10", DEFAULT_GATEWAY_PORT).unwrap();
        assert_eq!(addr.host, "192.168.1.10");
        assert_eq!(addr.port, DEFAULT_GATEWAY_PORT);
        assert_eq!(addr.to_string(), "192.168.1.10:4001");
    }

    #[test]
    fn test_gateway_address_errors() {
        assert!(matches!(
            GatewayAddress::parse("host:abc", 4001),
            Err(PortError::InvalidAddress { .. })
        ));
        assert!(matches!(
            GatewayAddress::parse(":4001", 4001),
            Err(PortError::InvalidAddress { .. })
        ));
        assert!(matches!(
            GatewayAddress::parse("host:0", 4001),
            Err(PortError::InvalidAddress { .. })
        ));
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[ ]{0,2}[A-Za-z0-9/._:-]{1,24}[ ]{0,2}") {
            if let Ok(id) = PortId::parse(&raw) {
                let again = PortId::parse(id.as_str()).unwrap();
                prop_assert_eq!(again, id);
            }
        }

        #[test]
        fn com_case_never_splits_keys(n in 1u16..256) {
            let a = PortId::parse(&format!("COM{n}")).unwrap();
            let b = PortId::parse(&format!("com{n}")).unwrap();
            let c = PortId::parse(&format!("Com{n}")).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(&a, &c);
        }
    }
}
