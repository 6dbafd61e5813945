//! Port-specific error types.
//!
//! Transport operations return these errors; the shared port layer maps each
//! of them onto a [`FailureKind`] and turns it into suspension state plus a
//! safe default value. None of them reach callers of
//! [`PortHandle`](crate::shared::PortHandle).

use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The transport could not be created or opened.
    #[error("Failed to open {port}: {source}")]
    Construction {
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// The specified serial device was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The remote end closed the channel.
    #[error("Channel closed by peer: {0}")]
    Closed(String),

    /// Attempted to use a transport that's not open.
    #[error("Port is not open")]
    NotOpen,

    /// Malformed identifier or settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A `FAKE`/`EMULATED` port was requested without an emulated device factory.
    #[error("Emulated port class not defined for {0}")]
    MissingEmulator(String),

    /// A gateway address could not be parsed or resolved.
    #[error("Invalid gateway address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// The three failure classes the shared port distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The transport could not be created or opened.
    Construction,
    /// I/O failed on an established channel.
    Transport,
    /// The identifier or settings are unusable.
    Configuration,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Construction => write!(f, "construction"),
            Self::Transport => write!(f, "transport"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

impl PortError {
    /// Create a Construction error for a port from an I/O error.
    pub fn construction(port: impl Into<String>, source: std::io::Error) -> Self {
        Self::Construction {
            port: port.into(),
            source,
        }
    }

    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Configuration error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a Closed error for a port name.
    pub fn closed(port_name: impl Into<String>) -> Self {
        Self::Closed(port_name.into())
    }

    /// Create an InvalidAddress error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error.
    ///
    /// `Serial` errors raised while opening are wrapped in `Construction` or
    /// `NotFound` by the transports, so a bare `Serial` is a mid-operation fault.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Construction { .. } | Self::NotFound(_) => FailureKind::Construction,
            Self::Io(_) | Self::Serial(_) | Self::Closed(_) | Self::NotOpen => FailureKind::Transport,
            Self::Configuration(_) | Self::MissingEmulator(_) | Self::InvalidAddress { .. } => {
                FailureKind::Configuration
            }
        }
    }
}

/// Returns true for I/O errors that only mean "nothing available right now".
pub(crate) fn is_would_block(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial port not found: /dev/ttyUSB0");

        let err = PortError::config("empty identifier");
        assert_eq!(err.to_string(), "Configuration error: empty identifier");

        let err = PortError::MissingEmulator("FAKE1".into());
        assert_eq!(err.to_string(), "Emulated port class not defined for FAKE1");
    }

    #[test]
    fn test_kind_mapping() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            PortError::construction("10.0.0.1:4001", refused).kind(),
            FailureKind::Construction
        );
        assert_eq!(PortError::not_found("COM9").kind(), FailureKind::Construction);
        assert_eq!(PortError::closed("gw").kind(), FailureKind::Transport);
        assert_eq!(PortError::NotOpen.kind(), FailureKind::Transport);
        assert_eq!(
            PortError::invalid_address("host:x", "bad port").kind(),
            FailureKind::Configuration
        );
        assert_eq!(
            PortError::MissingEmulator("FAKE".into()).kind(),
            FailureKind::Configuration
        );
    }

    #[test]
    fn test_would_block_detection() {
        let err = std::io::Error::new(std::io::ErrorKind::WouldBlock, "empty");
        assert!(is_would_block(&err));
        let err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(!is_would_block(&err));
    }
}
