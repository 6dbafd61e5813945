//! Emulated device for `FAKE`/`EMULATED` ports and tests.
//!
//! Provides an `EmulatedDevice` that behaves like a transport without any
//! hardware. Clones share state, so a test can keep one clone to script and
//! inspect the device while the shared port owns another.

use super::error::PortError;
use super::traits::Transport;
use crate::identifier::PortId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Inner state of the emulated device.
#[derive(Debug, Default)]
struct DeviceState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the device.
    write_log: Vec<Vec<u8>>,
    /// Written bytes are appended to the read queue.
    echo: bool,
    /// Whether the device is currently open.
    open: bool,
    /// Number of upcoming `open` calls that fail.
    failing_opens: u32,
    /// Whether the next read/write/reset fails.
    fail_next_io: bool,
    /// Maximum bytes accepted per write.
    write_limit: Option<usize>,
    /// Successful opens so far.
    opens: u32,
    /// Closes of an open device so far.
    closes: u32,
    /// Whether input has been reset since the flag was last cleared.
    buffers_cleared: bool,
}

/// Emulated device implementing [`Transport`].
///
/// # Example
/// ```
/// use shared_comport::port::{EmulatedDevice, Transport};
///
/// let mut device = EmulatedDevice::echo("FAKE1");
/// device.open().unwrap();
///
/// assert_eq!(device.write(b"AT\r").unwrap(), 3);
/// assert_eq!(device.read(10).unwrap(), b"AT\r");
/// assert_eq!(device.get_write_log(), vec![b"AT\r".to_vec()]);
/// ```
#[derive(Clone)]
pub struct EmulatedDevice {
    name: String,
    state: Arc<Mutex<DeviceState>>,
}

impl EmulatedDevice {
    /// Create a closed emulated device.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(DeviceState::default())),
        }
    }

    /// Create a device that echoes every write back to its reads.
    pub fn echo(name: impl Into<String>) -> Self {
        let device = Self::new(name);
        device.set_echo(true);
        device
    }

    /// Factory for [`PortOptions::with_emulator`](crate::port::PortOptions::with_emulator).
    ///
    /// Every transport it builds shares this device's state.
    pub fn factory(
        &self,
    ) -> impl Fn(&PortId) -> Result<Box<dyn Transport>, PortError> + Send + Sync + 'static {
        let device = self.clone();
        move |_id: &PortId| Ok(Box::new(device.clone()) as Box<dyn Transport>)
    }

    /// Enable or disable echo mode.
    pub fn set_echo(&self, echo: bool) {
        self.state.lock().echo = echo;
    }

    /// Enqueue bytes to be returned by subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Get a copy of all data written to the device.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Clear the write log.
    pub fn clear_write_log(&self) {
        self.state.lock().write_log.clear();
    }

    /// Make the next `count` opens fail.
    pub fn fail_next_opens(&self, count: u32) {
        self.state.lock().failing_opens = count;
    }

    /// Make the next read, write or reset fail with an I/O error.
    pub fn fail_next_io(&self) {
        self.state.lock().fail_next_io = true;
    }

    /// Accept at most `limit` bytes per write.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.state.lock().write_limit = limit;
    }

    /// Simulate the device disappearing (cable pulled, gateway rebooted).
    pub fn disconnect(&self) {
        self.state.lock().open = false;
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> u32 {
        self.state.lock().opens
    }

    /// Number of closes of an open device.
    pub fn close_count(&self) -> u32 {
        self.state.lock().closes
    }

    /// Whether input was reset since the last `reset_cleared_flag`.
    pub fn was_cleared(&self) -> bool {
        self.state.lock().buffers_cleared
    }

    /// Reset the "buffers cleared" flag.
    pub fn reset_cleared_flag(&self) {
        self.state.lock().buffers_cleared = false;
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

fn check_io(state: &mut DeviceState) -> Result<(), PortError> {
    if !state.open {
        return Err(PortError::NotOpen);
    }
    if state.fail_next_io {
        state.fail_next_io = false;
        return Err(PortError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "emulated I/O failure",
        )));
    }
    Ok(())
}

impl Transport for EmulatedDevice {
    fn open(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(PortError::construction(
                &self.name,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "emulated open failure"),
            ));
        }
        if !state.open {
            state.open = true;
            state.opens += 1;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.open {
            state.open = false;
            state.closes += 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        check_io(&mut state)?;

        let accepted = state.write_limit.map_or(data.len(), |l| l.min(data.len()));
        let written = &data[..accepted];
        state.write_log.push(written.to_vec());
        if state.echo {
            state.read_queue.extend(written);
        }
        Ok(accepted)
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, PortError> {
        let mut state = self.state.lock();
        check_io(&mut state)?;

        let n = max.min(state.read_queue.len());
        Ok(state.read_queue.drain(..n).collect())
    }

    fn reset_input_buffer(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        check_io(&mut state)?;
        state.read_queue.clear();
        state.buffers_cleared = true;
        Ok(())
    }

    fn reset_output_buffer(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        check_io(&mut state)
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        let state = self.state.lock();
        if !state.open {
            return Err(PortError::NotOpen);
        }
        Ok(state.read_queue.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for EmulatedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulatedDevice")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
