use super::worker::PollWorker;
use crate::domain::{
    AddressCache, AdapterState, CacheEntry, Lifecycle, PendingTable, ZigbeeConfig, ZigbeeError,
};
use crate::ports::{RadioConfig, RadioStack};
use parking_lot::Mutex;
use shared_bus::{BusError, Envelope, EventPublisher, EventType, PayloadCodec};
use shared_types::{Clock, CorrelationId, Eui64, NetAddr, Tick};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Envelope `source` stamped on every event the adapter emits.
pub const ADAPTER_SOURCE_ID: u8 = 1;

/// Snapshot of adapter counters and table occupancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterStats {
    pub state: AdapterState,
    /// Events the bus refused with `QueueFull`.
    pub events_dropped: u64,
    pub commands_sent: u64,
    pub commands_confirmed: u64,
    pub commands_failed: u64,
    pub commands_timed_out: u64,
    pub reports_forwarded: u64,
    /// Reports from a network address with no cache entry.
    pub reports_unknown: u64,
    pub cache_entries: usize,
    pub pending_commands: usize,
}

#[derive(Debug, Default)]
pub(super) struct Counters {
    pub(super) events_dropped: AtomicU64,
    pub(super) commands_sent: AtomicU64,
    pub(super) commands_confirmed: AtomicU64,
    pub(super) commands_failed: AtomicU64,
    pub(super) commands_timed_out: AtomicU64,
    pub(super) reports_forwarded: AtomicU64,
    pub(super) reports_unknown: AtomicU64,
}

/// State shared between fibres and the radio callbacks.
pub(crate) struct AdapterCore {
    pub(super) config: ZigbeeConfig,
    pub(super) lifecycle: Lifecycle,
    pub(super) cache: Mutex<AddressCache>,
    pub(super) pending: Mutex<PendingTable>,
    pub(super) bus: Arc<dyn EventPublisher>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) counters: Counters,
    pub(super) init_tick: AtomicU32,
}

impl AdapterCore {
    pub(super) fn now(&self) -> Tick {
        self.clock.now()
    }

    pub(super) fn ensure_ready(&self) -> Result<(), ZigbeeError> {
        match self.lifecycle.state() {
            AdapterState::Ready => Ok(()),
            state => Err(ZigbeeError::NotReady { state }),
        }
    }

    /// Publishes from any context. A full queue is counted, never retried.
    pub(super) fn publish(&self, envelope: Envelope) {
        let kind = envelope.kind;
        if let Err(err) = self.bus.publish(envelope.from_source(ADAPTER_SOURCE_ID)) {
            let total = self.counters.events_dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if matches!(err, BusError::QueueFull) {
                warn!(event = %kind, dropped = total, "Event dropped");
            } else {
                warn!(event = %kind, error = %err, dropped = total, "Event not published");
            }
        }
    }

    pub(super) fn emit<P: PayloadCodec>(&self, kind: EventType, payload: &P) {
        self.publish(Envelope::with_payload(kind, payload));
    }

    pub(super) fn emit_correlated<P: PayloadCodec>(
        &self,
        kind: EventType,
        correlation_id: CorrelationId,
        payload: &P,
    ) {
        self.publish(Envelope::with_payload(kind, payload).correlated(correlation_id));
    }

    /// Moves to the terminal `Error` state and announces the network is down.
    pub(super) fn fail(&self, reason: &str) {
        error!(reason, "Zigbee adapter failed");
        if self.lifecycle.transition(AdapterState::Error).is_ok() {
            self.publish(Envelope::new(EventType::NETWORK_DOWN));
        }
    }
}

/// Handle to the Zigbee coordinator adapter.
///
/// Cloning yields another handle to the same adapter.
pub struct ZigbeeAdapter<R: RadioStack> {
    pub(super) core: Arc<AdapterCore>,
    pub(super) radio: Arc<Mutex<R>>,
    worker: Arc<Mutex<Option<PollWorker>>>,
}

impl<R: RadioStack> Clone for ZigbeeAdapter<R> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            radio: Arc::clone(&self.radio),
            worker: Arc::clone(&self.worker),
        }
    }
}

impl<R: RadioStack> ZigbeeAdapter<R> {
    pub fn new(
        config: ZigbeeConfig,
        radio: R,
        bus: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            core: Arc::new(AdapterCore {
                config,
                lifecycle: Lifecycle::new(),
                cache: Mutex::new(AddressCache::new()),
                pending: Mutex::new(PendingTable::new()),
                bus,
                clock,
                counters: Counters::default(),
                init_tick: AtomicU32::new(0),
            }),
            radio: Arc::new(Mutex::new(radio)),
            worker: Arc::new(Mutex::new(None)),
        }
    }

    /// Brings the radio stack up and moves to `Initializing`.
    ///
    /// The transition to `Ready` happens later, when the stack reports a
    /// formed network from inside [`poll_radio`](Self::poll_radio).
    ///
    /// # Errors
    ///
    /// - `AlreadyInitialized` outside `Uninitialized`.
    /// - `Radio` when the stack fails to init or start; the adapter is then
    ///   in `Error` and `NetworkDown` has been emitted.
    pub fn initialize(&self) -> Result<(), ZigbeeError> {
        self.core
            .lifecycle
            .transition(AdapterState::Initializing)
            .map_err(|state| ZigbeeError::AlreadyInitialized { state })?;

        self.core.init_tick.store(self.core.now(), Ordering::Relaxed);
        self.core.cache.lock().clear();
        self.core.pending.lock().clear();

        let radio_config = RadioConfig {
            pan_id: self.core.config.pan_id,
            channel: self.core.config.channel,
            max_children: self.core.config.max_children,
        };
        let started = {
            let mut radio = self.radio.lock();
            radio.init(radio_config).and_then(|()| radio.start())
        };
        if let Err(err) = started {
            self.core.fail("radio stack failed to start");
            return Err(ZigbeeError::Radio(err.to_string()));
        }

        if self.core.config.background_poll {
            let interval = Duration::from_millis(self.core.config.poll_interval_ms);
            match PollWorker::spawn(Arc::clone(&self.core), Arc::clone(&self.radio), interval) {
                Ok(worker) => *self.worker.lock() = Some(worker),
                Err(err) => {
                    self.core.fail("radio poll thread failed to spawn");
                    return Err(ZigbeeError::Radio(err.to_string()));
                }
            }
        }

        info!(
            pan_id = self.core.config.pan_id,
            channel = self.core.config.channel,
            "Zigbee adapter initialized"
        );
        Ok(())
    }

    /// Confirms coordinator start-up is under way or complete.
    ///
    /// # Errors
    ///
    /// `NotReady` unless the adapter is `Initializing` or `Ready`.
    pub fn start_coordinator(&self) -> Result<(), ZigbeeError> {
        match self.core.lifecycle.state() {
            AdapterState::Ready | AdapterState::Initializing => Ok(()),
            state => Err(ZigbeeError::NotReady { state }),
        }
    }

    /// Runs the radio stack's loop once, delivering queued callbacks.
    ///
    /// Returns the number of callbacks delivered. With `background_poll`
    /// enabled the poll thread does this on its own.
    pub fn poll_radio(&self) -> usize {
        self.radio.lock().poll(self.core.as_ref())
    }

    /// Stops the background poll thread, if any.
    pub fn shutdown(&self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.stop();
            info!("Zigbee radio poll thread stopped");
        }
    }

    pub fn state(&self) -> AdapterState {
        self.core.lifecycle.state()
    }

    pub fn config(&self) -> &ZigbeeConfig {
        &self.core.config
    }

    pub fn lookup(&self, identity: Eui64) -> Option<CacheEntry> {
        self.core.cache.lock().find_by_identity(identity)
    }

    pub fn lookup_net_addr(&self, net_addr: NetAddr) -> Option<CacheEntry> {
        self.core.cache.lock().find_by_net_addr(net_addr)
    }

    pub fn pending_count(&self) -> usize {
        self.core.pending.lock().len()
    }

    pub fn stats(&self) -> AdapterStats {
        let counters = &self.core.counters;
        AdapterStats {
            state: self.core.lifecycle.state(),
            events_dropped: counters.events_dropped.load(Ordering::Relaxed),
            commands_sent: counters.commands_sent.load(Ordering::Relaxed),
            commands_confirmed: counters.commands_confirmed.load(Ordering::Relaxed),
            commands_failed: counters.commands_failed.load(Ordering::Relaxed),
            commands_timed_out: counters.commands_timed_out.load(Ordering::Relaxed),
            reports_forwarded: counters.reports_forwarded.load(Ordering::Relaxed),
            reports_unknown: counters.reports_unknown.load(Ordering::Relaxed),
            cache_entries: self.core.cache.lock().len(),
            pending_commands: self.core.pending.lock().len(),
        }
    }
}

impl<R: RadioStack> std::fmt::Debug for ZigbeeAdapter<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZigbeeAdapter")
            .field("state", &self.core.lifecycle.state())
            .field("config", &self.core.config)
            .finish_non_exhaustive()
    }
}
