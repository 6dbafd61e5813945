//! TCP transport for serial-to-Ethernet gateways (Moxa NPort and similar).
//!
//! The gateway exposes its serial line as a raw TCP byte stream, so this
//! transport imposes no framing. Reads poll with a short receive timeout.

use super::error::{is_would_block, PortError};
use super::options::GatewaySettings;
use super::traits::Transport;
use crate::identifier::GatewayAddress;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Depth reported by `bytes_available`; the real queue depth is not observable.
pub const AVAILABLE_SENTINEL: usize = 1;

const DRAIN_CHUNK: usize = 4096;

/// TCP connection to a gateway.
pub struct TcpGatewayTransport {
    name: String,
    address: GatewayAddress,
    settings: GatewaySettings,
    stream: Option<TcpStream>,
}

impl TcpGatewayTransport {
    /// Create a closed transport for a `host[:port]` identifier.
    pub fn new(id: &str, settings: GatewaySettings) -> Result<Self, PortError> {
        let address = GatewayAddress::parse(id, settings.default_port)?;
        Ok(Self {
            name: id.to_string(),
            address,
            settings,
            stream: None,
        })
    }

    /// Parsed gateway endpoint.
    pub fn address(&self) -> &GatewayAddress {
        &self.address
    }

    fn connect(&self) -> Result<TcpStream, PortError> {
        let addrs = (self.address.host.as_str(), self.address.port)
            .to_socket_addrs()
            .map_err(|e| PortError::construction(self.address.to_string(), e))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.settings.create_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }

        let err = last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
        });
        Err(PortError::construction(self.address.to_string(), err))
    }

    fn configure(&self, stream: &TcpStream) -> std::io::Result<()> {
        let poll = self.settings.read_timeout;
        if poll.is_zero() {
            stream.set_nonblocking(true)?;
        } else {
            stream.set_read_timeout(Some(poll))?;
            stream.set_write_timeout(Some(poll))?;
        }
        stream.set_nodelay(true)
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, PortError> {
        self.stream.as_mut().ok_or(PortError::NotOpen)
    }

    /// Drop the connection after a fatal error so the next readiness probe reconnects.
    fn fail(&mut self, err: std::io::Error) -> PortError {
        self.stream = None;
        tracing::debug!(port = %self.name, error = %err, "Gateway connection dropped");
        PortError::Io(err)
    }
}

impl Transport for TcpGatewayTransport {
    fn open(&mut self) -> Result<(), PortError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = self.connect()?;
        self.configure(&stream)
            .map_err(|e| PortError::construction(self.address.to_string(), e))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) -> Result<(), PortError> {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::trace!(port = %self.name, error = %e, "Shutdown on dead socket");
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let result = self.stream_mut()?.write(data);
        match result {
            Ok(n) => Ok(n),
            Err(e) if is_would_block(&e) => Ok(0),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, PortError> {
        let stream = self.stream_mut()?;
        if max == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; max];
        match stream.read(&mut buffer) {
            Ok(0) => {
                self.stream = None;
                Err(PortError::closed(&self.name))
            }
            Ok(n) => {
                buffer.truncate(n);
                Ok(buffer)
            }
            Err(e) if is_would_block(&e) => Ok(Vec::new()),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Drain input until two consecutive empty reads or the drain timeout.
    fn reset_input_buffer(&mut self) -> Result<(), PortError> {
        let deadline = Instant::now() + self.settings.drain_timeout;
        let mut empty_reads = 0;

        while empty_reads < 2 && Instant::now() < deadline {
            let chunk = self.read(DRAIN_CHUNK)?;
            if chunk.is_empty() {
                empty_reads += 1;
                if self.settings.read_timeout.is_zero() {
                    std::thread::sleep(Duration::from_millis(1));
                }
            } else {
                empty_reads = 0;
            }
        }
        Ok(())
    }

    fn reset_output_buffer(&mut self) -> Result<(), PortError> {
        // Nothing is buffered on our side of the socket.
        self.stream_mut().map(|_| ())
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        if self.stream.is_some() {
            Ok(AVAILABLE_SENTINEL)
        } else {
            Err(PortError::NotOpen)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for TcpGatewayTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpGatewayTransport")
            .field("address", &self.address.to_string())
            .field("open", &self.stream.is_some())
            .finish()
    }
}
