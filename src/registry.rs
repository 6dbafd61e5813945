//! Port registry.
//!
//! Maps normalized identifiers to shared ports and counts references, so
//! every client that opens the same identifier shares one transport and one
//! access lock. The registry lock only guards the map and the counts; it is
//! never held while a transport is opened, read or closed.

use crate::identifier::PortId;
use crate::port::{PortError, PortOptions};
use crate::shared::{PortHandle, SharedPort};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

type PortMap = HashMap<PortId, Arc<SharedPort>>;

/// Registry of shared ports. Clones refer to the same registry.
#[derive(Clone, Default)]
pub struct Registry {
    ports: Arc<Mutex<PortMap>>,
}

impl Registry {
    /// Create an independent registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Open a shared port.
    ///
    /// The first acquire of an identifier constructs the transport from
    /// `options`; later acquires reuse it and ignore their options. Transport
    /// failures never surface here: the port comes back suspended instead.
    pub fn acquire(&self, id: &PortId, options: &PortOptions) -> PortHandle {
        let (port, first) = {
            let mut ports = self.ports.lock();
            let port = Arc::clone(
                ports
                    .entry(id.clone())
                    .or_insert_with(|| Arc::new(SharedPort::new(id.clone(), options.clone()))),
            );
            let previous = port.retain();
            (port, previous == 0)
        };

        if first {
            tracing::debug!(port = %id, "Initializing port");
            port.ready();
        } else {
            tracing::debug!(port = %id, refs = port.reference_count(), "Using existing port");
        }

        PortHandle::new(port, self.clone())
    }

    /// Parse `identifier` and open the port it names.
    ///
    /// Fails only when the identifier is blank.
    pub fn acquire_str(&self, identifier: &str, options: &PortOptions) -> Result<PortHandle, PortError> {
        let id = identifier.parse::<PortId>().map_err(|e| {
            tracing::error!(identifier, error = %e, "Rejected port identifier");
            e
        })?;
        Ok(self.acquire(&id, options))
    }

    /// Give back a handle. Same as [`PortHandle::release`].
    ///
    /// Release is by handle rather than by identifier, so a client can only
    /// give back references it holds. Dropping the handle has the same effect.
    pub fn release(&self, handle: PortHandle) -> bool {
        handle.release()
    }

    pub(crate) fn retain_port(&self, port: &SharedPort) {
        let _ports = self.ports.lock();
        port.retain();
    }

    pub(crate) fn release_port(&self, port: &SharedPort) -> bool {
        let remaining = {
            let _ports = self.ports.lock();
            port.unretain()
        };

        match remaining {
            None => {
                tracing::warn!(port = %port.id(), "Release of a port with no references");
                true
            }
            Some(0) => port.teardown(),
            Some(refs) => {
                tracing::debug!(port = %port.id(), refs, "Port still in use");
                true
            }
        }
    }

    /// Number of registered ports, including closed ones.
    pub fn len(&self) -> usize {
        self.ports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.lock().is_empty()
    }

    pub fn contains(&self, id: &PortId) -> bool {
        self.ports.lock().contains_key(id)
    }

    /// Outstanding opens of `id`, 0 when unknown or closed.
    pub fn reference_count(&self, id: &PortId) -> usize {
        self.ports
            .lock()
            .get(id)
            .map(|port| port.reference_count())
            .unwrap_or(0)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<PortId> {
        let mut ids: Vec<PortId> = self.ports.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("ports", &self.identifiers())
            .finish()
    }
}
