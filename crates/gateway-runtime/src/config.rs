//! # Gateway Configuration
//!
//! Unified configuration for every service and runtime parameter.
//!
//! ## Loading Order
//!
//! 1. Built-in defaults (the constants in `shared_types::limits`)
//! 2. JSON file named by `GW_CONFIG`, when set; missing fields keep defaults
//! 3. Environment overrides
//! 4. [`GatewayConfig::validate`]
//!
//! | Variable | Field |
//! |----------|-------|
//! | `GW_LOG_LEVEL` / `RUST_LOG` | `telemetry.log_level` |
//! | `GW_JSON_LOGS` | `telemetry.json_logs` |
//! | `GW_PERSIST_DIR` | `persist.dir` (`memory` keeps data in RAM) |
//! | `GW_CMD_TIMEOUT_MS` | `zigbee.cmd_timeout_ms` |
//! | `GW_FIBRE_BACKEND` | `scheduler.backend` (`polled` / `threaded`) |
//! | `GW_PAN_ID` | `zigbee.pan_id` (decimal or `0x` hex) |
//! | `GW_CHANNEL` | `zigbee.channel` |
//! | `GW_PERMIT_JOIN_S` | `zigbee.permit_join_s` |

use gateway_telemetry::TelemetryConfig;
use gw_01_fibre_scheduler::SchedulerConfig;
use gw_02_zigbee_adapter::ZigbeeConfig;
use gw_04_persistence::PersistConfig;
use serde::{Deserialize, Serialize};
use shared_types::limits::MAX_PERMIT_JOIN_S;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_VAR: &str = "GW_CONFIG";

/// Valid 2.4 GHz Zigbee channels.
pub const CHANNELS: std::ops::RangeInclusive<u8> = 11..=26;

/// Fibres the runtime always creates: dispatch, zb-expiry, persist,
/// zb-start and registry.
pub const SERVICE_FIBRES: usize = 5;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Event bus parameters that are not compile-time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Envelopes the dispatch fibre delivers per turn.
    pub dispatch_batch: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { dispatch_batch: 10 }
    }
}

/// Runtime service parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Period of the registry persistence fibre.
    pub registry_persist_ms: u32,
    /// Restore the registry from storage at boot.
    pub restore_registry: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            registry_persist_ms: 30_000,
            restore_registry: true,
        }
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub scheduler: SchedulerConfig,
    pub bus: BusConfig,
    pub zigbee: ZigbeeConfig,
    pub persist: PersistConfig,
    pub telemetry: TelemetryConfig,
    pub service: ServiceConfig,
}

impl GatewayConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`]; the configuration is validated before return.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// Loads configuration with variables resolved by `lookup`.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`]; the configuration is validated before return.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env_with(&lookup)?;
        config.zigbee.tick_period_ms = config.scheduler.tick_period_ms;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file. Absent sections and fields keep their defaults.
    ///
    /// # Errors
    ///
    /// `Read` or `Parse`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies environment overrides.
    ///
    /// # Errors
    ///
    /// `Env` for a value that does not parse.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        self.telemetry.apply_env_with(&lookup);

        if let Some(dir) = lookup("GW_PERSIST_DIR") {
            self.persist.dir = match dir.as_str() {
                "" | "memory" => None,
                path => Some(PathBuf::from(path)),
            };
        }
        if let Some(value) = lookup("GW_CMD_TIMEOUT_MS") {
            self.zigbee.cmd_timeout_ms = parse("GW_CMD_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("GW_FIBRE_BACKEND") {
            self.scheduler.backend = value.parse().map_err(|_| ConfigError::Env {
                var: "GW_FIBRE_BACKEND",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("GW_PAN_ID") {
            self.zigbee.pan_id = parse_u16("GW_PAN_ID", &value)?;
        }
        if let Some(value) = lookup("GW_CHANNEL") {
            self.zigbee.channel = parse("GW_CHANNEL", &value)?;
        }
        if let Some(value) = lookup("GW_PERMIT_JOIN_S") {
            self.zigbee.permit_join_s = parse("GW_PERMIT_JOIN_S", &value)?;
        }
        Ok(())
    }

    /// Number of fibres the runtime creates, the idle fibre included.
    #[must_use]
    pub fn fibres_required(&self) -> usize {
        let poll = usize::from(!self.zigbee.background_poll);
        1 + SERVICE_FIBRES + poll
    }

    /// Rejects configurations the runtime cannot run with.
    ///
    /// # Errors
    ///
    /// `Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.fibres_required() > self.scheduler.max_fibres {
            return Err(ConfigError::Invalid(format!(
                "scheduler.max_fibres {} is below the {} fibres the gateway runs",
                self.scheduler.max_fibres,
                self.fibres_required()
            )));
        }
        if self.bus.dispatch_batch == 0 {
            return Err(invalid("bus.dispatch_batch must be non-zero"));
        }
        if !CHANNELS.contains(&self.zigbee.channel) {
            return Err(ConfigError::Invalid(format!(
                "zigbee.channel {} outside 11..=26",
                self.zigbee.channel
            )));
        }
        if self.zigbee.cmd_timeout_ms == 0 {
            return Err(invalid("zigbee.cmd_timeout_ms must be non-zero"));
        }
        if self.zigbee.sweep_interval_ms == 0 {
            return Err(invalid("zigbee.sweep_interval_ms must be non-zero"));
        }
        if !self.zigbee.permit_join_in_range() {
            return Err(ConfigError::Invalid(format!(
                "zigbee.permit_join_s {} above {MAX_PERMIT_JOIN_S}",
                self.zigbee.permit_join_s
            )));
        }
        if self.persist.flush_interval_ms == 0 {
            return Err(invalid("persist.flush_interval_ms must be non-zero"));
        }
        if self.service.registry_persist_ms == 0 {
            return Err(invalid("service.registry_persist_ms must be non-zero"));
        }
        Ok(())
    }

    /// Configuration for tests: polled fibres, in-memory storage, no radio
    /// thread, no restore.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            scheduler: SchedulerConfig::for_testing(Default::default()),
            zigbee: ZigbeeConfig::for_testing(),
            persist: PersistConfig::for_testing(),
            service: ServiceConfig {
                restore_registry: false,
                ..ServiceConfig::default()
            },
            ..Self::default()
        }
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}

fn parse_u16(var: &'static str, value: &str) -> Result<u16, ConfigError> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => trimmed.parse().ok(),
    };
    parsed.ok_or_else(|| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}
