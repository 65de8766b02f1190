//! # Gateway Runtime
//!
//! ## Startup Sequence
//!
//! 1. Build the services ([`GatewayContainer`])
//! 2. Subscribe the network watch
//! 3. Create the service fibres
//! 4. Emit `Boot`
//! 5. [`run`](GatewayRuntime::run): start the tick source and the scheduler

use crate::config::{ConfigError, GatewayConfig};
use crate::container::{GatewayContainer, GatewayStore};
use crate::services::{self, NetworkWatch};
use gw_01_fibre_scheduler::{FibreError, FibreId, Scheduler, TickSource};
use gw_02_zigbee_adapter::{RadioStack, ZigbeeAdapter};
use gw_03_device_registry::{RegistryError, SharedRegistry};
use gw_04_persistence::PersistError;
use shared_bus::{BusError, EventBus, EventPublisher, EventType};
use shared_types::ErrorKind;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scheduler: {0}")]
    Fibre(#[from] FibreError),

    #[error("persistence: {0}")]
    Persist(#[from] PersistError),

    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("event bus: {0}")]
    Bus(#[from] BusError),

    #[error("tick source: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::InvalidArgument,
            Self::Fibre(err) => err.kind(),
            Self::Persist(err) => err.kind(),
            Self::Registry(err) => err.kind(),
            Self::Bus(err) => err.kind(),
            Self::Io(_) => ErrorKind::Hardware,
        }
    }
}

/// A wired gateway.
pub struct GatewayRuntime<R: RadioStack> {
    container: GatewayContainer<R>,
    network: Arc<NetworkWatch>,
    fibres: Vec<FibreId>,
}

impl<R: RadioStack> GatewayRuntime<R> {
    /// Builds and wires every service and emits `Boot`.
    ///
    /// # Errors
    ///
    /// Any failure while building the container or creating fibres.
    pub fn new(config: GatewayConfig, radio: R) -> Result<Self, RuntimeError> {
        config.validate()?;
        let container = GatewayContainer::new(config, radio)?;
        let network = NetworkWatch::subscribe(&container.bus)?;
        let fibres = services::spawn_all(&container, &network)?;

        if let Err(err) = container.bus.emit(EventType::BOOT, &[]) {
            warn!(error = %err, "Boot event dropped");
        }
        info!(fibres = fibres.len() + 1, "Gateway wired");
        Ok(Self {
            container,
            network,
            fibres,
        })
    }

    /// Starts the tick source and runs the scheduler. Does not return
    /// unless the scheduler fails to start.
    ///
    /// # Errors
    ///
    /// `Io` when the tick thread cannot be spawned, `Fibre` when the
    /// scheduler is already running.
    pub fn run(&self) -> Result<Infallible, RuntimeError> {
        let period = Duration::from_millis(u64::from(
            self.container.config.scheduler.tick_period_ms,
        ));
        let _ticker = TickSource::spawn(self.container.scheduler.clone(), period)?;
        info!("===========================================");
        info!("  Zigbee Gateway v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        Ok(self.container.scheduler.start()?)
    }

    /// Stops the radio thread and writes everything buffered.
    pub fn shutdown(&self) {
        info!("Initiating shutdown...");
        self.container.adapter.shutdown();
        if let Err(err) = self.container.registry_sync.persist_if_dirty(&self.container.store) {
            warn!(error = %err, "Registry not persisted");
        }
        if let Err(err) = self.container.store.flush() {
            warn!(error = %err, "Final flush incomplete");
        }
        info!("Shutdown complete");
    }

    pub fn container(&self) -> &GatewayContainer<R> {
        &self.container
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.container.scheduler
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.container.bus
    }

    pub fn adapter(&self) -> &ZigbeeAdapter<R> {
        &self.container.adapter
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.container.registry
    }

    pub fn store(&self) -> &GatewayStore {
        &self.container.store
    }

    /// Whether `NetworkUp` has been dispatched since the last `NetworkDown`.
    pub fn network_up(&self) -> bool {
        self.network.is_up()
    }

    /// Service fibre ids in creation order.
    pub fn fibres(&self) -> &[FibreId] {
        &self.fibres
    }
}
