//! # Service Container
//!
//! Builds every gateway service in dependency order and owns the handles.
//!
//! ```text
//! Scheduler (clock) ─▶ EventBus ─▶ BufferedStore ─▶ Registry (+restore)
//!                                                      │
//!                                  RegistrySync ◀──────┘ subscribed to ZIGBEE
//!                                  ZigbeeAdapter ─▶ publishes into EventBus
//! ```
//!
//! The scheduler's tick counter is the clock of every service, so all
//! timestamps on the bus, in the registry and in the pending table agree.

use crate::config::GatewayConfig;
use crate::runtime::RuntimeError;
use gw_01_fibre_scheduler::Scheduler;
use gw_02_zigbee_adapter::{RadioStack, ZigbeeAdapter};
use gw_03_device_registry::{Registry, RegistrySync, SharedRegistry};
use gw_04_persistence::{open_backend, BufferedStore, StorageBackend};
use parking_lot::Mutex;
use shared_bus::{EventBus, EventPublisher};
use shared_types::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The persistence store as wired by the runtime.
pub type GatewayStore = BufferedStore<Box<dyn StorageBackend>>;

/// Every service handle of a running gateway.
pub struct GatewayContainer<R: RadioStack> {
    pub config: GatewayConfig,
    pub scheduler: Scheduler,
    pub bus: Arc<EventBus>,
    pub store: GatewayStore,
    pub registry: SharedRegistry,
    pub registry_sync: Arc<RegistrySync>,
    pub adapter: ZigbeeAdapter<R>,
}

impl<R: RadioStack> GatewayContainer<R> {
    /// Builds the services. Nothing runs until fibres are created and the
    /// scheduler is started.
    ///
    /// # Errors
    ///
    /// Scheduler, storage and bus subscription failures. A failed registry
    /// restore is logged and the registry starts empty.
    pub fn new(config: GatewayConfig, radio: R) -> Result<Self, RuntimeError> {
        let scheduler = Scheduler::new(config.scheduler.clone())?;
        let clock: Arc<dyn Clock> = Arc::new(scheduler.clone());

        let bus = Arc::new(EventBus::new(Arc::clone(&clock)));
        let publisher: Arc<dyn EventPublisher> = bus.clone();

        let backend = open_backend(&config.persist)?;
        let store = BufferedStore::builder(backend, Arc::clone(&clock))?
            .with_bus(Arc::clone(&publisher))
            .with_flush_interval(Duration::from_millis(u64::from(
                config.persist.flush_interval_ms,
            )))
            .build();

        let mut registry = Registry::new(Arc::clone(&clock));
        if config.service.restore_registry {
            match registry.restore(&store) {
                Ok(restored) => info!(restored, "Registry restored"),
                Err(err) => {
                    warn!(error = %err, "Registry restore failed, starting empty");
                    registry.clear();
                }
            }
        }
        let registry: SharedRegistry = Arc::new(Mutex::new(registry));
        let registry_sync = RegistrySync::new(Arc::clone(&registry));
        RegistrySync::subscribe(&registry_sync, &bus)?;

        let adapter = ZigbeeAdapter::new(config.zigbee.clone(), radio, publisher, clock);

        info!(
            backend = %config.scheduler.backend,
            storage = ?config.persist.dir,
            "Gateway services created"
        );
        Ok(Self {
            config,
            scheduler,
            bus,
            store,
            registry,
            registry_sync,
            adapter,
        })
    }
}
