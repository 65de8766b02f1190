//! # Zigbee Adapter
//!
//! Bridges an opaque, single-threaded radio stack to the event bus without
//! ever running domain logic inside a radio callback.
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`AddressCache`] | EUI64 ↔ network address, two indices over one store |
//! | [`PendingTable`] | correlation id ↔ TSN for in-flight commands |
//! | [`Lifecycle`] | `Uninitialized → Initializing → Ready → Error` |
//! | [`ZigbeeAdapter`] | command surface, callbacks, timeout sweep |
//! | [`RadioStack`] | port to the vendor stack |
//! | [`SimulatedRadio`] | host implementation of the port |
//!
//! ## Completion
//!
//! A command sent with a non-zero correlation id resolves to exactly one
//! of `CommandConfirmed`, `CommandFailed{status}` or
//! `CommandFailed{TIMEOUT}`. Id zero is fire and forget.
//!
//! ## Example
//!
//! ```rust,ignore
//! let adapter = ZigbeeAdapter::new(config, SimulatedRadio::new(), bus, clock);
//! adapter.initialize()?;
//! adapter.send_onoff(identity, 1, true, bus.new_correlation_id())?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{SentFrame, SimulatedRadio, SimulatedRadioControl};
pub use domain::{
    AdapterState, AddressCache, CacheEntry, Lifecycle, PendingTable, ReportingConfig, ZclCommand,
    ZigbeeConfig, ZigbeeError,
};
pub use ports::{RadioCallbacks, RadioConfig, RadioError, RadioSignal, RadioStack, STATUS_OK};
pub use service::{AdapterStats, ZigbeeAdapter, ADAPTER_SOURCE_ID};
