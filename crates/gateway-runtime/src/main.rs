//! # Zigbee Gateway
//!
//! Entry point: load configuration, install logging, wire the services and
//! hand the thread to the scheduler.

use anyhow::{Context, Result};
use gateway_runtime::{GatewayConfig, GatewayRuntime};
use gateway_telemetry::init_logging;
use gw_02_zigbee_adapter::SimulatedRadio;

fn main() -> Result<()> {
    let config = GatewayConfig::load().context("Failed to load configuration")?;
    init_logging(&config.telemetry).context("Failed to initialize logging")?;

    let runtime =
        GatewayRuntime::new(config, SimulatedRadio::new()).context("Failed to wire gateway")?;

    let result = runtime.run();
    runtime.shutdown();
    match result {
        Ok(never) => match never {},
        Err(err) => Err(err).context("Scheduler stopped"),
    }
}
