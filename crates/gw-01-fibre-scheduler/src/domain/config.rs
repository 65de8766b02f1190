//! Scheduler configuration.

use super::errors::FibreError;
use serde::{Deserialize, Serialize};
use shared_types::limits::{DEFAULT_STACK_SIZE, IDLE_STACK_SIZE, MAX_FIBRES};
use std::fmt;
use std::str::FromStr;

/// How a fibre's saved continuation is represented.
///
/// Both backends run the same fibre bodies with the same scheduling
/// contract; they differ only in where the body's stack lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FibreBackend {
    /// The fibre is a state machine polled on the scheduler's own stack.
    #[default]
    Polled,
    /// Each fibre owns a native thread that is parked whenever it is not
    /// the running fibre.
    Threaded,
}

impl fmt::Display for FibreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polled => f.write_str("polled"),
            Self::Threaded => f.write_str("threaded"),
        }
    }
}

impl FromStr for FibreBackend {
    type Err = FibreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polled" => Ok(Self::Polled),
            "threaded" => Ok(Self::Threaded),
            other => Err(FibreError::InvalidConfig(format!(
                "unknown fibre backend '{other}'"
            ))),
        }
    }
}

/// Configuration for the fibre scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum fibres including the idle fibre. At most 16.
    pub max_fibres: usize,
    /// Stack size used when `create` is given 0.
    pub default_stack_size: u32,
    /// Stack size of the idle fibre.
    pub idle_stack_size: u32,
    /// Milliseconds per tick.
    pub tick_period_ms: u32,
    pub backend: FibreBackend,
    /// How long the idle fibre sleeps when nothing is ready.
    /// 0 yields the OS thread instead of sleeping.
    pub idle_sleep_us: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_fibres: MAX_FIBRES,
            default_stack_size: DEFAULT_STACK_SIZE,
            idle_stack_size: IDLE_STACK_SIZE,
            tick_period_ms: 1,
            backend: FibreBackend::default(),
            idle_sleep_us: 200,
        }
    }
}

impl SchedulerConfig {
    /// Configuration for deterministic tests: the idle fibre never sleeps.
    #[must_use]
    pub fn for_testing(backend: FibreBackend) -> Self {
        Self {
            backend,
            idle_sleep_us: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), FibreError> {
        if self.max_fibres < 2 || self.max_fibres > MAX_FIBRES {
            return Err(FibreError::InvalidConfig(format!(
                "max_fibres must be in 2..={MAX_FIBRES}, got {}",
                self.max_fibres
            )));
        }
        if self.tick_period_ms == 0 {
            return Err(FibreError::InvalidConfig(
                "tick_period_ms must be non-zero".into(),
            ));
        }
        if self.default_stack_size == 0 {
            return Err(FibreError::InvalidConfig(
                "default_stack_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_limits() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_fibres, 16);
        assert_eq!(config.default_stack_size, 2048);
        assert_eq!(config.idle_stack_size, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_oversized_table() {
        let config = SchedulerConfig {
            max_fibres: 17,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FibreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("Threaded".parse::<FibreBackend>(), Ok(FibreBackend::Threaded));
        assert_eq!(" polled ".parse::<FibreBackend>(), Ok(FibreBackend::Polled));
        assert!("green".parse::<FibreBackend>().is_err());
    }

    #[test]
    fn test_backend_serde() {
        let json = serde_json::to_string(&FibreBackend::Threaded).unwrap();
        assert_eq!(json, "\"threaded\"");
    }
}
