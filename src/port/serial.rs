//! Local serial line transport.
//!
//! Wraps the `serialport` crate. The device is opened with a zero read
//! timeout so reads only return what the OS has already buffered.

use super::error::{is_would_block, PortError};
use super::traits::{SerialSettings, Transport};
use std::io::{Read, Write};
use std::path::Path;

/// Serial device opened through `serialport`.
pub struct SerialTransport {
    /// Device name as given by the client (e.g. `COM3`, `/dev/ttyUSB0`).
    name: String,
    /// Path handed to the OS.
    path: String,
    settings: SerialSettings,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialTransport {
    /// Create a closed transport for `name`.
    pub fn new(name: &str, settings: SerialSettings) -> Self {
        Self {
            name: name.to_string(),
            path: device_path(name),
            settings,
            port: None,
        }
    }

    /// Line settings used when opening.
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Get a reference to the underlying serialport implementation.
    pub fn as_raw(&self) -> Option<&dyn serialport::SerialPort> {
        self.port.as_deref()
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, PortError> {
        self.port.as_mut().ok_or(PortError::NotOpen)
    }

    /// Drop the device handle after a fault so the next readiness probe reopens it.
    fn fail(&mut self, err: impl Into<PortError>) -> PortError {
        self.port = None;
        let err = err.into();
        tracing::debug!(port = %self.name, error = %err, "Serial device dropped");
        err
    }

    fn open_error(&self, e: serialport::Error) -> PortError {
        match e.kind() {
            serialport::ErrorKind::NoDevice => PortError::not_found(&self.name),
            serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
            serialport::ErrorKind::Io(kind) => {
                PortError::construction(&self.name, std::io::Error::new(kind, e.description))
            }
            serialport::ErrorKind::Unknown => {
                PortError::construction(&self.name, std::io::Error::other(e.description))
            }
        }
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<(), PortError> {
        if self.port.is_some() {
            return Ok(());
        }
        if !device_exists(&self.path) {
            tracing::debug!(port = %self.name, path = %self.path, "Serial device not listed, trying anyway");
        }

        let port = serialport::new(&self.path, self.settings.baud_rate)
            .data_bits(self.settings.data_bits.into())
            .flow_control(self.settings.flow_control.into())
            .parity(self.settings.parity.into())
            .stop_bits(self.settings.stop_bits.into())
            .timeout(self.settings.timeout)
            .open()
            .map_err(|e| self.open_error(e))?;

        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<(), PortError> {
        // Dropping the handle closes the device.
        self.port = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let read_timeout = self.settings.timeout;
        let write_timeout = self.settings.write_timeout;
        let swap = write_timeout != read_timeout;
        let port = self.port_mut()?;

        // serialport has one timeout for both directions.
        if swap {
            if let Err(e) = port.set_timeout(write_timeout) {
                return Err(self.fail(e));
            }
        }
        let result = port.write(data);
        if swap {
            if let Err(e) = port.set_timeout(read_timeout) {
                return Err(self.fail(e));
            }
        }

        match result {
            Ok(n) => Ok(n),
            Err(e) if is_would_block(&e) => Ok(0),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, PortError> {
        let port = self.port_mut()?;
        if max == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; max];
        match port.read(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                Ok(buffer)
            }
            Err(e) if is_would_block(&e) => Ok(Vec::new()),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn reset_input_buffer(&mut self) -> Result<(), PortError> {
        let result = self.port_mut()?.clear(serialport::ClearBuffer::Input);
        result.map_err(|e| self.fail(e))
    }

    fn reset_output_buffer(&mut self) -> Result<(), PortError> {
        let result = self.port_mut()?.clear(serialport::ClearBuffer::Output);
        result.map_err(|e| self.fail(e))
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        let result = self.port_mut()?.bytes_to_read();
        result.map(|n| n as usize).map_err(|e| self.fail(e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("baud_rate", &self.settings.baud_rate)
            .field("open", &self.port.is_some())
            .finish()
    }
}

/// OS path for a serial identifier.
///
/// Bare `tty*`/`cua*` names are looked up under `/dev` on Unix.
pub fn device_path(name: &str) -> String {
    if cfg!(unix) && !name.contains('/') && (name.starts_with("tty") || name.starts_with("cua")) {
        format!("/dev/{name}")
    } else {
        name.to_string()
    }
}

/// Basic existence check for a serial device.
///
/// True if `name` is an existing path or is listed by the OS port
/// enumeration. Never used to refuse an open.
pub fn device_exists(name: &str) -> bool {
    let path = device_path(name);
    if Path::new(&path).exists() {
        return true;
    }
    serialport::available_ports()
        .map(|ports| {
            ports
                .iter()
                .any(|p| p.port_name.eq_ignore_ascii_case(name) || p.port_name == path)
        })
        .unwrap_or(false)
}
