//! Domain layer: fibre records, the fibre table, configuration and errors.

pub mod config;
pub mod errors;
pub mod fibre;
pub mod table;

pub use config::{FibreBackend, SchedulerConfig};
pub use errors::FibreError;
pub use fibre::{FibreId, FibreInfo, FibreName, FibreState, SchedulerStats};
