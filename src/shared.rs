//! Shared, failure-tolerant ports.
//!
//! A [`SharedPort`] owns one transport and is shared by every client that
//! acquired the same identifier. All access goes through a re-entrant lock,
//! and every operation is gated by [`PortHandle::ready`], which probes and
//! heals the connection. Transport faults never reach the caller: they start
//! a suspension window and the operation returns a safe default.
//!
//! # Lifecycle
//!
//! ```text
//!            failure                      window elapsed, probe fails
//!  Active ───────────────> Suspended <──────────────────────────┐
//!    ^                        │                                 │
//!    └────────────────────────┴─────────────────────────────────┘
//!            window elapsed, probe succeeds
//!
//!  reference count reaches 0 ──> Closed (transport torn down, port stays
//!                                registered and is reopened by the next acquire)
//! ```

use crate::identifier::{PortId, TransportKind};
use crate::port::{FailureKind, PortError, PortOptions, Transport, TransportHandle};
use crate::registry::Registry;
use crate::suspension::Suspension;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// `current_address` value meaning no RS-485 device is selected.
pub const NO_ADDRESS: i32 = -1;

/// Mutable part of a port, only touched with the access lock held.
#[derive(Debug)]
struct PortState {
    transport: TransportHandle,
    suspension: Suspension,
    current_address: i32,
}

/// One physical or logical channel shared by all of its clients.
pub struct SharedPort {
    id: PortId,
    /// First opener's construction arguments, kept to rebuild the transport.
    options: PortOptions,
    /// Changed only with the registry lock held.
    refs: AtomicUsize,
    state: ReentrantMutex<RefCell<PortState>>,
}

/// Result of a write through a shared port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The port was not ready; nothing was attempted.
    NotReady,
    /// The transport accepted this many bytes, possibly fewer than offered.
    Written(usize),
    /// The transport failed and the port is now suspended.
    Failed,
}

impl WriteOutcome {
    /// Byte count as seen by callers that do not care why nothing was written.
    pub fn bytes(self) -> usize {
        match self {
            Self::Written(n) => n,
            Self::NotReady | Self::Failed => 0,
        }
    }
}

impl SharedPort {
    pub(crate) fn new(id: PortId, options: PortOptions) -> Self {
        let state = PortState {
            transport: TransportHandle::empty(&id),
            suspension: Suspension::new(options.suspend_delay),
            current_address: NO_ADDRESS,
        };
        Self {
            id,
            options,
            refs: AtomicUsize::new(0),
            state: ReentrantMutex::new(RefCell::new(state)),
        }
    }

    pub fn id(&self) -> &PortId {
        &self.id
    }

    /// Options the port was constructed with.
    pub fn options(&self) -> &PortOptions {
        &self.options
    }

    /// Outstanding opens.
    pub fn reference_count(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }

    /// Whether the last client has released the port.
    pub fn is_closed(&self) -> bool {
        self.reference_count() == 0
    }

    /// Increment the reference count. Caller holds the registry lock.
    pub(crate) fn retain(&self) -> usize {
        self.refs.fetch_add(1, Ordering::SeqCst)
    }

    /// Decrement the reference count, clamped at zero. Caller holds the registry lock.
    ///
    /// Returns the remaining count, or `None` if the count was already zero.
    pub(crate) fn unretain(&self) -> Option<usize> {
        let current = self.refs.load(Ordering::SeqCst);
        if current == 0 {
            return None;
        }
        self.refs.store(current - 1, Ordering::SeqCst);
        Some(current - 1)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PortState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Probe and, if needed, heal the connection.
    pub fn ready(&self) -> bool {
        self.with_state(|state| self.ready_locked(state))
    }

    fn ready_locked(&self, state: &mut PortState) -> bool {
        if self.is_closed() || state.suspension.is_suspended() {
            return false;
        }
        if state.transport.is_open() {
            return true;
        }
        self.reconnect(state)
    }

    fn reconnect(&self, state: &mut PortState) -> bool {
        let result = if state.transport.is_empty() {
            TransportHandle::build(&self.id, &self.options).map(|transport| {
                state.transport = transport;
            })
        } else {
            if let Err(e) = state.transport.close() {
                tracing::debug!(port = %self.id, kind = %e.kind(), error = %e, "Close before reopen failed");
            }
            state.transport.open()
        };

        match result {
            Ok(()) => {
                state.suspension.clear();
                tracing::info!(port = %self.id, transport = %state.transport.kind(), "Port connected");
                true
            }
            Err(e) => {
                self.fail(state, "connect", &e);
                false
            }
        }
    }

    /// Record a failure: start a suspension window and log it.
    fn fail(&self, state: &mut PortState, operation: &'static str, err: &PortError) {
        let started = state.suspension.suspend();
        if !started {
            tracing::debug!(port = %self.id, operation, error = %err, "Failure during suspension");
            return;
        }

        let delay = state.suspension.delay();
        match err.kind() {
            FailureKind::Configuration => {
                tracing::error!(port = %self.id, operation, error = %err, ?delay, "Port misconfigured, suspended");
            }
            kind => {
                tracing::warn!(port = %self.id, operation, %kind, error = %err, ?delay, "Port suspended");
            }
        }
    }

    pub fn read(&self, max: usize) -> Vec<u8> {
        self.with_state(|state| {
            if !self.ready_locked(state) {
                return Vec::new();
            }
            let result = state.transport.read(max);
            match result {
                Ok(data) => data,
                Err(e) => {
                    self.fail(state, "read", &e);
                    Vec::new()
                }
            }
        })
    }

    /// Read until the transport has nothing more or `limit` bytes were collected.
    pub fn read_available(&self, limit: usize) -> Vec<u8> {
        const CHUNK: usize = 256;

        self.with_state(|state| {
            let mut collected = Vec::new();
            while collected.len() < limit && self.ready_locked(state) {
                let want = CHUNK.min(limit - collected.len());
                let result = state.transport.read(want);
                match result {
                    Ok(chunk) if chunk.is_empty() => break,
                    Ok(chunk) => collected.extend(chunk),
                    Err(e) => {
                        self.fail(state, "read", &e);
                        break;
                    }
                }
            }
            collected
        })
    }

    pub fn write(&self, data: &[u8]) -> WriteOutcome {
        self.with_state(|state| {
            if !self.ready_locked(state) {
                return WriteOutcome::NotReady;
            }
            let result = state.transport.write(data);
            match result {
                Ok(n) => {
                    if n < data.len() {
                        tracing::debug!(port = %self.id, written = n, offered = data.len(), "Partial write");
                    }
                    WriteOutcome::Written(n)
                }
                Err(e) => {
                    self.fail(state, "write", &e);
                    WriteOutcome::Failed
                }
            }
        })
    }

    /// Discard unread input. Vacuously `true` when the port is not ready.
    pub fn reset_input_buffer(&self) -> bool {
        self.reset_with("reset_input_buffer", |t| t.reset_input_buffer())
    }

    /// Discard unsent output. Vacuously `true` when the port is not ready.
    pub fn reset_output_buffer(&self) -> bool {
        self.reset_with("reset_output_buffer", |t| t.reset_output_buffer())
    }

    fn reset_with(
        &self,
        operation: &'static str,
        reset: impl FnOnce(&mut TransportHandle) -> Result<(), PortError>,
    ) -> bool {
        self.with_state(|state| {
            if !self.ready_locked(state) {
                return true;
            }
            match reset(&mut state.transport) {
                Ok(()) => true,
                Err(e) => {
                    self.fail(state, operation, &e);
                    false
                }
            }
        })
    }

    /// Bytes waiting to be read, 0 when not ready or on failure.
    pub fn in_waiting(&self) -> usize {
        self.with_state(|state| {
            if !self.ready_locked(state) {
                return 0;
            }
            let result = state.transport.bytes_available();
            match result {
                Ok(n) => n,
                Err(e) => {
                    self.fail(state, "in_waiting", &e);
                    0
                }
            }
        })
    }

    pub fn is_suspended(&self) -> bool {
        self.with_state(|state| state.suspension.is_suspended())
    }

    /// Time until the suspension window ends.
    pub fn suspension_remaining(&self) -> Duration {
        self.with_state(|state| state.suspension.remaining())
    }

    /// Transport currently held (`Empty` until constructed or after teardown).
    pub fn transport_kind(&self) -> TransportKind {
        self.with_state(|state| state.transport.kind())
    }

    pub fn current_address(&self) -> i32 {
        self.with_state(|state| state.current_address)
    }

    pub fn set_current_address(&self, address: i32) {
        self.with_state(|state| state.current_address = address);
    }

    /// Close the transport once the last reference is gone.
    ///
    /// Re-checks the count under the access lock: a client that re-acquired
    /// the port in the meantime keeps the open transport.
    pub(crate) fn teardown(&self) -> bool {
        self.with_state(|state| {
            if !self.is_closed() {
                tracing::debug!(port = %self.id, "Port re-acquired before teardown");
                return true;
            }

            let result = state.transport.close();
            state.transport = TransportHandle::empty(&self.id);
            state.suspension.clear();
            state.current_address = NO_ADDRESS;

            match result {
                Ok(()) => {
                    tracing::debug!(port = %self.id, "Port closed");
                    true
                }
                Err(e) => {
                    tracing::warn!(port = %self.id, kind = %e.kind(), error = %e, "Port close failed");
                    false
                }
            }
        })
    }

    /// Run `f` with the access lock held.
    fn locked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.state.lock();
        f()
    }
}

impl fmt::Debug for SharedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPort")
            .field("id", &self.id)
            .field("refs", &self.reference_count())
            .finish_non_exhaustive()
    }
}

/// A client's reference to a shared port.
///
/// Dropping the handle (or calling [`PortHandle::release`]) gives the
/// reference back to the registry; the last one closes the transport.
/// Cloning a handle counts as another open.
pub struct PortHandle {
    port: Arc<SharedPort>,
    registry: Registry,
    released: bool,
}

impl PortHandle {
    pub(crate) fn new(port: Arc<SharedPort>, registry: Registry) -> Self {
        Self {
            port,
            registry,
            released: false,
        }
    }

    pub fn id(&self) -> &PortId {
        self.port.id()
    }

    /// Transport selected by the identifier.
    pub fn kind(&self) -> TransportKind {
        self.port.id().kind()
    }

    /// The shared port behind this handle.
    pub fn port(&self) -> &Arc<SharedPort> {
        &self.port
    }

    /// Whether both handles refer to the same shared port.
    pub fn shares_port_with(&self, other: &PortHandle) -> bool {
        Arc::ptr_eq(&self.port, &other.port)
    }

    pub fn reference_count(&self) -> usize {
        self.port.reference_count()
    }

    pub fn is_closed(&self) -> bool {
        self.port.is_closed()
    }

    /// Probe the connection, reconnecting if the suspension window allows.
    pub fn ready(&self) -> bool {
        self.port.ready()
    }

    /// Read up to `max` available bytes. Empty when not ready or on failure.
    pub fn read(&self, max: usize) -> Vec<u8> {
        self.port.read(max)
    }

    /// Read everything immediately available, up to `limit` bytes.
    pub fn read_available(&self, limit: usize) -> Vec<u8> {
        self.port.read_available(limit)
    }

    /// Write `data`, returning the accepted byte count (0 when not ready or on failure).
    pub fn write(&self, data: &[u8]) -> usize {
        self.port.write(data).bytes()
    }

    /// Write `data`, distinguishing "not ready" from "failed" and partial writes.
    pub fn write_outcome(&self, data: &[u8]) -> WriteOutcome {
        self.port.write(data)
    }

    pub fn reset_input_buffer(&self) -> bool {
        self.port.reset_input_buffer()
    }

    pub fn reset_output_buffer(&self) -> bool {
        self.port.reset_output_buffer()
    }

    pub fn in_waiting(&self) -> usize {
        self.port.in_waiting()
    }

    pub fn is_suspended(&self) -> bool {
        self.port.is_suspended()
    }

    pub fn current_address(&self) -> i32 {
        self.port.current_address()
    }

    pub fn set_current_address(&self, address: i32) {
        self.port.set_current_address(address)
    }

    /// Hold the port's access lock across several operations.
    ///
    /// Operations on `self` inside `f` re-enter the same lock, so other
    /// clients cannot interleave between, e.g., selecting an RS-485 address,
    /// writing a request and reading its reply.
    pub fn exclusive<R>(&self, f: impl FnOnce(&PortHandle) -> R) -> R {
        self.port.locked(|| f(self))
    }

    /// Give the reference back. Returns `false` if closing the transport failed.
    pub fn release(mut self) -> bool {
        self.released = true;
        self.registry.release_port(&self.port)
    }
}

impl Clone for PortHandle {
    fn clone(&self) -> Self {
        self.registry.retain_port(&self.port);
        Self::new(Arc::clone(&self.port), self.registry.clone())
    }
}

impl Drop for PortHandle {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.release_port(&self.port);
        }
    }
}

impl fmt::Debug for PortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortHandle")
            .field("id", self.port.id())
            .field("refs", &self.port.reference_count())
            .finish()
    }
}
