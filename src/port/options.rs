//! Construction arguments for shared ports.

use super::error::PortError;
use super::traits::{SerialSettings, Transport};
use crate::identifier::{PortId, DEFAULT_GATEWAY_PORT};
use crate::suspension::DEFAULT_SUSPEND_DELAY;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Builds the transport for `FAKE`/`EMULATED` identifiers.
pub type EmulatorFactory =
    Arc<dyn Fn(&PortId) -> Result<Box<dyn Transport>, PortError> + Send + Sync>;

/// Timing knobs of serial-to-Ethernet gateway connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    /// TCP port used when the identifier does not name one.
    pub default_port: u16,
    /// Bound on establishing the TCP connection.
    pub create_timeout: Duration,
    /// Receive timeout used for polling reads.
    pub read_timeout: Duration,
    /// Upper bound on draining input during `reset_input_buffer`.
    pub drain_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_GATEWAY_PORT,
            create_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_millis(10),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Everything needed to construct (and later rebuild) a port's transport.
///
/// Only the options of the first client that opens a port are used; clients
/// sharing a physical port must agree on its configuration out of band.
#[derive(Clone)]
pub struct PortOptions {
    pub serial: SerialSettings,
    pub gateway: GatewaySettings,
    /// Backoff after a failure before I/O or reconnects are attempted again.
    pub suspend_delay: Duration,
    /// Device double for emulated identifiers.
    pub emulator: Option<EmulatorFactory>,
}

impl Default for PortOptions {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            gateway: GatewaySettings::default(),
            suspend_delay: DEFAULT_SUSPEND_DELAY,
            emulator: None,
        }
    }
}

impl PortOptions {
    /// Use `factory` to build transports for emulated identifiers.
    pub fn with_emulator<F>(mut self, factory: F) -> Self
    where
        F: Fn(&PortId) -> Result<Box<dyn Transport>, PortError> + Send + Sync + 'static,
    {
        self.emulator = Some(Arc::new(factory));
        self
    }

    /// Override the suspension backoff.
    pub fn with_suspend_delay(mut self, delay: Duration) -> Self {
        self.suspend_delay = delay;
        self
    }

    /// Override the serial line settings.
    pub fn with_serial(mut self, serial: SerialSettings) -> Self {
        self.serial = serial;
        self
    }
}

impl fmt::Debug for PortOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortOptions")
            .field("serial", &self.serial)
            .field("gateway", &self.gateway)
            .field("suspend_delay", &self.suspend_delay)
            .field("emulator", &self.emulator.is_some())
            .finish()
    }
}
