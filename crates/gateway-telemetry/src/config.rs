//! Telemetry configuration from files and environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration of the logging stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log filter directive (`info`, `gw_02_zigbee_adapter=debug,info`, ...)
    pub log_level: String,

    /// Whether to write anything to the console
    pub console_output: bool,

    /// JSON formatted lines instead of human-readable ones
    pub json_logs: bool,

    /// Include source file and line in each line
    pub source_location: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "zigbee-gateway".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            source_location: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GW_SERVICE_NAME`: Service name (default: zigbee-gateway)
    /// - `GW_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `GW_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `GW_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_with(|var| env::var(var).ok());
        config
    }

    /// Overrides fields from whichever variables `lookup` resolves.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("GW_SERVICE_NAME") {
            self.service_name = name;
        }
        if let Some(level) = lookup("GW_LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            self.log_level = level;
        }
        if let Some(value) = lookup("GW_CONSOLE_OUTPUT") {
            self.console_output = !is_false(&value);
        }
        match lookup("GW_JSON_LOGS") {
            Some(value) => self.json_logs = is_true(&value),
            None if lookup("DOCKER_CONTAINER").is_some() => self.json_logs = true,
            None => {}
        }
    }
}

fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn is_false(value: &str) -> bool {
    value.eq_ignore_ascii_case("false") || value == "0"
}
