//! Structured logging.
//!
//! Every line carries the level, the target crate and the structured
//! fields of the event. JSON lines use the `tracing-subscriber` JSON layout
//! so a log shipper can parse them without a custom grammar:
//!
//! ```text
//! {"timestamp":"…","level":"WARN","fields":{"message":"Command timed out","correlation_id":"7"},"target":"gw_02_zigbee_adapter::service::maintenance"}
//! ```

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Builds the filter from `config.log_level`.
///
/// # Errors
///
/// `Filter` when the directive does not parse.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Filter(format!("{}: {e}", config.log_level)))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// `Filter` for a bad directive, `AlreadyInitialized` when another global
/// subscriber is installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    let console = if !config.console_output {
        None
    } else if config.json_logs {
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_names(true)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .boxed(),
        )
    } else {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_names(false)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_ansi(true)
                .boxed(),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}
