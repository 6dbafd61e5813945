//! Shared, fault-tolerant communication ports.
//!
//! Several independent clients in one process can open the same physical or
//! logical channel (a local serial line, a TCP serial-to-Ethernet gateway or
//! an emulated device) and share a single connection to it. The library
//! hides transient faults: a failed operation puts the port into a timed
//! suspension and returns a safe default, and the port reconnects on its own
//! once the suspension has elapsed.
//!
//! # Modules
//!
//! - `identifier`: Port identifier normalization and transport selection
//! - `port`: Transport abstraction and its implementations
//! - `suspension`: Backoff after failures
//! - `shared`: Failure-tolerant shared ports and client handles
//! - `registry`: Identifier to port mapping with reference counting
//! - `config`: Configuration management with TOML support
//! - `logging`: Subscriber setup for binaries
//!
//! # Example
//!
//! ```
//! use shared_comport::port::{EmulatedDevice, PortOptions};
//! use shared_comport::{PortId, Registry};
//!
//! let device = EmulatedDevice::echo("FAKE1");
//! let options = PortOptions::default().with_emulator(device.factory());
//! let registry = Registry::new();
//!
//! let id: PortId = "FAKE1".parse().unwrap();
//! let port = registry.acquire(&id, &options);
//! assert_eq!(port.write(b"AT\r"), 3);
//! assert_eq!(port.read(10), b"AT\r");
//! ```

pub mod config;
pub mod identifier;
pub mod logging;
pub mod port;
pub mod registry;
pub mod shared;
pub mod suspension;

pub use identifier::{GatewayAddress, PortId, TransportKind, DEFAULT_GATEWAY_PORT};
pub use port::{FailureKind, PortError, PortOptions, SerialSettings, Transport};
pub use registry::Registry;
pub use shared::{PortHandle, SharedPort, WriteOutcome, NO_ADDRESS};
pub use suspension::{Suspension, DEFAULT_SUSPEND_DELAY};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
