//! # Service Fibres
//!
//! | Fibre | Body |
//! |-------|------|
//! | `dispatch` | `dispatch(batch)`, then sleep one tick |
//! | `zb-expiry` | command timeout sweep |
//! | `persist` | periodic store flush |
//! | `registry` | persist the registry when it changed |
//! | `zb-start` | bring the coordinator up, open permit-join once the network is up |
//! | `zb-poll` | drive the radio when no poll thread is used |
//!
//! Each body runs inside a `fibre` span carrying its name.

use crate::container::{GatewayContainer, GatewayStore};
use gateway_telemetry::fibre_span;
use gw_01_fibre_scheduler::{FibreContext, FibreError, FibreId, Scheduler};
use gw_02_zigbee_adapter::{AdapterState, RadioStack, ZigbeeAdapter};
use gw_03_device_registry::RegistrySync;
use shared_bus::{BusError, Envelope, EventBus, EventFilter, EventHandler, EventType};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};

/// Poll period of `zb-start` while waiting for the network.
const NETWORK_WAIT: Duration = Duration::from_millis(10);

/// Tracks `NetworkUp` / `NetworkDown` as seen on the bus.
#[derive(Debug, Default)]
pub struct NetworkWatch {
    up: AtomicBool,
}

impl NetworkWatch {
    /// Subscribes a new watch to the network events of `bus`.
    ///
    /// # Errors
    ///
    /// `TableFull` when the bus has no free subscription slot.
    pub fn subscribe(bus: &EventBus) -> Result<Arc<Self>, BusError> {
        let watch = Arc::new(Self::default());
        bus.subscribe(
            EventFilter::range(EventType::NETWORK_UP, EventType::NETWORK_DOWN),
            watch.clone(),
        )?;
        Ok(watch)
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }
}

impl EventHandler for NetworkWatch {
    fn handle(&self, envelope: &Envelope) {
        let up = envelope.kind == EventType::NETWORK_UP;
        self.up.store(up, Ordering::Release);
    }
}

fn spawn<F, Fut>(scheduler: &Scheduler, name: &'static str, body: F) -> Result<FibreId, FibreError>
where
    F: FnOnce(FibreContext) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    scheduler.create(name, 0, move |ctx| body(ctx).instrument(fibre_span!(name)))
}

/// Creates every service fibre. Returns their ids in creation order.
///
/// # Errors
///
/// `TableFull` / `StackAllocation` from the scheduler.
pub fn spawn_all<R: RadioStack>(
    container: &GatewayContainer<R>,
    network: &Arc<NetworkWatch>,
) -> Result<Vec<FibreId>, FibreError> {
    let scheduler = &container.scheduler;
    let mut ids = Vec::with_capacity(container.config.fibres_required());

    let bus = Arc::clone(&container.bus);
    let batch = container.config.bus.dispatch_batch;
    ids.push(spawn(scheduler, "dispatch", move |ctx| run_dispatch(bus, batch, ctx))?);

    let adapter = container.adapter.clone();
    ids.push(spawn(scheduler, "zb-expiry", move |ctx| adapter.run_expiry_sweep(ctx))?);

    let store = container.store.clone();
    ids.push(spawn(scheduler, "persist", move |ctx| store.run_flush_loop(ctx))?);

    let sync = Arc::clone(&container.registry_sync);
    let store = container.store.clone();
    let period = Duration::from_millis(u64::from(container.config.service.registry_persist_ms));
    ids.push(spawn(scheduler, "registry", move |ctx| {
        run_registry_persist(sync, store, period, ctx)
    })?);

    let adapter = container.adapter.clone();
    let watch = Arc::clone(network);
    ids.push(spawn(scheduler, "zb-start", move |ctx| run_zigbee_start(adapter, watch, ctx))?);

    if !container.config.zigbee.background_poll {
        let adapter = container.adapter.clone();
        ids.push(spawn(scheduler, "zb-poll", move |ctx| adapter.run_radio_poll(ctx))?);
    }

    info!(fibres = ids.len(), "Service fibres created");
    Ok(ids)
}

async fn run_dispatch(bus: Arc<EventBus>, batch: usize, ctx: FibreContext) {
    debug!("Dispatch running");
    loop {
        bus.dispatch(batch);
        ctx.sleep_ticks(1).await;
    }
}

async fn run_registry_persist(
    sync: Arc<RegistrySync>,
    store: GatewayStore,
    period: Duration,
    ctx: FibreContext,
) {
    loop {
        ctx.sleep(period).await;
        match sync.persist_if_dirty(&store) {
            Ok(0) => {}
            Ok(nodes) => debug!(nodes, "Registry persisted"),
            Err(err) => warn!(error = %err, "Registry persist failed"),
        }
    }
}

async fn run_zigbee_start<R: RadioStack>(
    adapter: ZigbeeAdapter<R>,
    network: Arc<NetworkWatch>,
    ctx: FibreContext,
) {
    if let Err(err) = adapter.initialize() {
        error!(error = %err, "Zigbee adapter failed to initialize");
        return;
    }
    if let Err(err) = adapter.start_coordinator() {
        error!(error = %err, "Coordinator start failed");
        return;
    }

    while !network.is_up() {
        if adapter.state() == AdapterState::Error {
            error!("Network formation failed");
            return;
        }
        ctx.sleep(NETWORK_WAIT).await;
    }

    let seconds = adapter.config().permit_join_s;
    if seconds == 0 {
        info!("Network up, permit-join left closed");
        return;
    }
    match adapter.set_permit_join(u16::from(seconds)) {
        Ok(()) => info!(seconds, "Network up, permit-join opened"),
        Err(err) => warn!(error = %err, "Permit-join failed"),
    }
}
