//! Transport selection.
//!
//! The transport behind a port is chosen once, from the identifier prefix,
//! when the port is constructed or rebuilt from the empty sentinel.

use super::empty::EmptyTransport;
use super::error::PortError;
use super::options::PortOptions;
use super::serial::SerialTransport;
use super::tcp::TcpGatewayTransport;
use super::traits::Transport;
use crate::identifier::{PortId, TransportKind};

/// The transport owned by a shared port.
#[derive(Debug)]
pub enum TransportHandle {
    LocalSerial(SerialTransport),
    TcpGateway(TcpGatewayTransport),
    Emulated(Box<dyn Transport>),
    Empty(EmptyTransport),
}

impl TransportHandle {
    /// Construct the transport selected by `id` without opening it.
    pub fn create(id: &PortId, options: &PortOptions) -> Result<Self, PortError> {
        let handle = match id.kind() {
            TransportKind::Emulated => {
                let factory = options
                    .emulator
                    .as_ref()
                    .ok_or_else(|| PortError::MissingEmulator(id.to_string()))?;
                Self::Emulated((**factory)(id)?)
            }
            TransportKind::LocalSerial => {
                Self::LocalSerial(SerialTransport::new(id.as_str(), options.serial.clone()))
            }
            TransportKind::TcpGateway => Self::TcpGateway(TcpGatewayTransport::new(
                id.as_str(),
                options.gateway.clone(),
            )?),
            TransportKind::Empty => Self::empty(id),
        };
        Ok(handle)
    }

    /// Construct and open the transport selected by `id`.
    pub fn build(id: &PortId, options: &PortOptions) -> Result<Self, PortError> {
        let mut handle = Self::create(id, options)?;
        handle.open()?;
        Ok(handle)
    }

    /// The null sentinel.
    pub fn empty(id: &PortId) -> Self {
        Self::Empty(EmptyTransport::new(id.as_str()))
    }

    /// Which variant this is.
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::LocalSerial(_) => TransportKind::LocalSerial,
            Self::TcpGateway(_) => TransportKind::TcpGateway,
            Self::Emulated(_) => TransportKind::Emulated,
            Self::Empty(_) => TransportKind::Empty,
        }
    }

    /// Whether this is the null sentinel.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }

    fn inner(&self) -> &dyn Transport {
        match self {
            Self::LocalSerial(t) => t,
            Self::TcpGateway(t) => t,
            Self::Emulated(t) => &**t,
            Self::Empty(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Transport {
        match self {
            Self::LocalSerial(t) => t,
            Self::TcpGateway(t) => t,
            Self::Emulated(t) => &mut **t,
            Self::Empty(t) => t,
        }
    }
}

impl Transport for TransportHandle {
    fn open(&mut self) -> Result<(), PortError> {
        self.inner_mut().open()
    }

    fn close(&mut self) -> Result<(), PortError> {
        self.inner_mut().close()
    }

    fn is_open(&self) -> bool {
        self.inner().is_open()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.inner_mut().write(data)
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, PortError> {
        self.inner_mut().read(max)
    }

    fn reset_input_buffer(&mut self) -> Result<(), PortError> {
        self.inner_mut().reset_input_buffer()
    }

    fn reset_output_buffer(&mut self) -> Result<(), PortError> {
        self.inner_mut().reset_output_buffer()
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        self.inner_mut().bytes_available()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}
