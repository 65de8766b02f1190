//! Domain layer: the adapter's concurrency-sensitive state.

pub mod cache;
pub mod command;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod pending;

pub use cache::{AddressCache, CacheEntry, Upsert};
pub use command::{ReportingConfig, ZclCommand};
pub use config::ZigbeeConfig;
pub use errors::{CacheError, PendingError, ZigbeeError};
pub use lifecycle::{AdapterState, Lifecycle};
pub use pending::{PendingCommand, PendingTable, SlotId};
