//! Transport layer.
//!
//! Provides the `Transport` trait and its implementations for local serial
//! lines, TCP serial gateways, emulated devices and the empty null object,
//! plus the factory that picks one from a port identifier.

pub mod empty;
pub mod error;
pub mod factory;
pub mod mock;
pub mod options;
pub mod serial;
pub mod tcp;
pub mod traits;

pub use empty::EmptyTransport;
pub use error::{FailureKind, PortError};
pub use factory::TransportHandle;
pub use mock::EmulatedDevice;
pub use options::{EmulatorFactory, GatewaySettings, PortOptions};
pub use serial::{device_exists, SerialTransport};
pub use tcp::TcpGatewayTransport;
pub use traits::*;
