//! Null transport.
//!
//! Stands in for a transport that could not be constructed so the shared
//! port never has to special-case a missing handle.

use super::error::PortError;
use super::traits::Transport;

/// Transport that is never open and moves no bytes.
#[derive(Debug, Clone, Default)]
pub struct EmptyTransport {
    name: String,
}

impl EmptyTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Transport for EmptyTransport {
    fn open(&mut self) -> Result<(), PortError> {
        Err(PortError::NotOpen)
    }

    fn close(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        false
    }

    fn write(&mut self, _data: &[u8]) -> Result<usize, PortError> {
        Ok(0)
    }

    fn read(&mut self, _max: usize) -> Result<Vec<u8>, PortError> {
        Ok(Vec::new())
    }

    fn reset_input_buffer(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    fn reset_output_buffer(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        Ok(0)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
