//! # Gateway Telemetry
//!
//! Logging setup for the gateway binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GW_SERVICE_NAME` | `zigbee-gateway` | Service name in log lines |
//! | `GW_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `GW_CONSOLE_OUTPUT` | `true` | Console output |
//! | `GW_JSON_LOGS` | `false` | JSON formatted lines |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Opens a span tagged with the gateway service a fibre belongs to.
///
/// ```rust,ignore
/// let _span = fibre_span!("zb-start", channel = 15).entered();
/// ```
#[macro_export]
macro_rules! fibre_span {
    ($fibre:expr $(, $($field:tt)*)?) => {
        tracing::info_span!("fibre", fibre = $fibre $(, $($field)*)?)
    };
}
