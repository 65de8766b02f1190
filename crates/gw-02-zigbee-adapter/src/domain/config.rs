//! Adapter configuration.

use serde::{Deserialize, Serialize};
use shared_types::limits::{CMD_TIMEOUT_MS, MAX_DEVICES, MAX_PERMIT_JOIN_S};
use shared_types::Tick;

/// Configuration for the Zigbee adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZigbeeConfig {
    /// PAN id to form; `0xFFFF` lets the stack choose.
    pub pan_id: u16,
    /// 2.4 GHz channel, 11..=26.
    pub channel: u8,
    /// Maximum direct children accepted by the coordinator.
    pub max_children: u16,
    /// Pending commands older than this are failed with `Timeout`.
    pub cmd_timeout_ms: u32,
    /// Period of the expiry-sweep fibre.
    pub sweep_interval_ms: u32,
    /// Permit-join window opened once the network is up. 0 keeps it closed.
    pub permit_join_s: u8,
    /// Milliseconds per scheduler tick.
    pub tick_period_ms: u32,
    /// Drive the radio from a background thread. When `false` the owner
    /// calls `poll_radio` itself.
    pub background_poll: bool,
    /// Sleep between radio polls on the background thread.
    pub poll_interval_ms: u64,
}

impl Default for ZigbeeConfig {
    fn default() -> Self {
        Self {
            pan_id: 0xFFFF,
            channel: 15,
            max_children: MAX_DEVICES as u16,
            cmd_timeout_ms: CMD_TIMEOUT_MS,
            sweep_interval_ms: 1_000,
            permit_join_s: 180,
            tick_period_ms: 1,
            background_poll: true,
            poll_interval_ms: 5,
        }
    }
}

impl ZigbeeConfig {
    /// Deterministic configuration for tests: no background thread.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            background_poll: false,
            ..Self::default()
        }
    }

    /// The command timeout in ticks, rounded up.
    #[must_use]
    pub fn cmd_timeout_ticks(&self) -> Tick {
        self.cmd_timeout_ms.div_ceil(self.tick_period_ms.max(1))
    }

    /// Whether `permit_join_s` is within the accepted window.
    #[must_use]
    pub const fn permit_join_in_range(&self) -> bool {
        self.permit_join_s <= MAX_PERMIT_JOIN_S
    }
}
