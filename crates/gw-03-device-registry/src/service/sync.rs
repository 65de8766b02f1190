//! # Registry Synchronisation
//!
//! Keeps the registry in step with adapter events on the bus.
//!
//! | Event | Effect |
//! |-------|--------|
//! | `DEVICE_JOINED` / `DEVICE_ANNOUNCED` | add or readdress node; a `LEFT` node returns to `NEW` |
//! | `DEVICE_LEFT` | state `LEFT` |
//! | `ATTRIBUTE_REPORT` | store value under endpoint / cluster, mark seen |
//!
//! Handling runs on the dispatch fibre. Failures are logged and the event
//! is dropped; the bus never sees a handler error.

use crate::domain::{AttrValue, ClusterDirection, NodeState, Registry, RegistryError};
use gw_04_persistence::KeyBlobStore;
use parking_lot::Mutex;
use shared_bus::{
    AttributeReport, BusError, DeviceAddress, DeviceLeft, Envelope, EventBus, EventFilter,
    EventHandler, EventType,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// Registry handle shared between the bus handler and its readers.
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Home Automation profile, assumed for endpoints first seen in a report.
pub const DEFAULT_PROFILE_ID: u16 = 0x0104;

/// Bus handler applying adapter events to a registry.
pub struct RegistrySync {
    registry: SharedRegistry,
    dirty: AtomicBool,
}

impl RegistrySync {
    pub fn new(registry: SharedRegistry) -> Arc<Self> {
        Arc::new(Self {
            registry,
            dirty: AtomicBool::new(false),
        })
    }

    /// Subscribes `sync` to the Zigbee event family on `bus`.
    ///
    /// # Errors
    ///
    /// `TableFull` when the bus has no free subscription slot.
    pub fn subscribe(sync: &Arc<Self>, bus: &EventBus) -> Result<(), BusError> {
        bus.subscribe(EventFilter::ZIGBEE, sync.clone())
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// `true` when the node set or a node's identity data changed since the
    /// last successful [`persist_if_dirty`](Self::persist_if_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Persists the registry when it changed. Returns the number of nodes
    /// written, or 0 when nothing changed.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the registry stays dirty.
    pub fn persist_if_dirty(&self, store: &dyn KeyBlobStore) -> Result<usize, RegistryError> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(0);
        }
        let result = self.registry.lock().persist(store);
        if result.is_err() {
            self.dirty.store(true, Ordering::Release);
        }
        result
    }

    fn apply(&self, envelope: &Envelope) -> Result<(), RegistryError> {
        let mut registry = self.registry.lock();
        match envelope.kind {
            EventType::DEVICE_JOINED | EventType::DEVICE_ANNOUNCED => {
                let device: DeviceAddress = decode(envelope)?;
                let node = registry.add_node(device.identity, device.net_addr)?;
                if node.state == NodeState::Left {
                    node.state = NodeState::New;
                }
                self.mark_dirty();
            }
            EventType::DEVICE_LEFT => {
                let left: DeviceLeft = decode(envelope)?;
                registry.set_state(left.identity, NodeState::Left)?;
                self.mark_dirty();
            }
            EventType::ATTRIBUTE_REPORT => {
                let report: AttributeReport = decode(envelope)?;
                let now = registry.now();
                let node = registry
                    .find_node_mut(report.identity)
                    .ok_or(RegistryError::NodeNotFound(report.identity))?;
                let known_layout = node
                    .endpoint(report.endpoint)
                    .and_then(|ep| ep.cluster(report.cluster))
                    .is_some();
                node.add_endpoint(report.endpoint, DEFAULT_PROFILE_ID, 0)?
                    .add_cluster(report.cluster, ClusterDirection::Server)?
                    .update_attribute(
                        report.attribute,
                        AttrValue::from_zcl(report.data_type, &report.value),
                        now,
                    )?;
                node.last_seen = now;
                if !known_layout {
                    self.mark_dirty();
                }
            }
            other => trace!(kind = %other, "Event ignored by registry"),
        }
        Ok(())
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

fn decode<P: shared_bus::PayloadCodec>(envelope: &Envelope) -> Result<P, RegistryError> {
    envelope
        .decode()
        .map_err(|err| RegistryError::Codec(format!("{}: {err}", envelope.kind)))
}

impl EventHandler for RegistrySync {
    fn handle(&self, envelope: &Envelope) {
        if let Err(err) = self.apply(envelope) {
            warn!(kind = %envelope.kind, error = %err, "Registry update failed");
        }
    }
}

impl std::fmt::Debug for RegistrySync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySync")
            .field("nodes", &self.registry.lock().node_count())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
