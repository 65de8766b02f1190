//! # Core Domain Entities
//!
//! Identities and time values carried on the event bus and through the
//! adapter command surface.
//!
//! ## Clusters
//!
//! - **Time**: `Tick`, wraparound-safe comparisons, ms conversions
//! - **Identity**: `Eui64`, `NetAddr`
//! - **Correlation**: `CorrelationId`
//! - **Zigbee addressing**: `Endpoint`, `ClusterId`, `AttributeId`, `Tsn`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CLUSTER A: TIME
// =============================================================================

/// Monotonic scheduler tick. Wraps at `u32::MAX`.
pub type Tick = u32;

/// Ticks per millisecond at the default 1 ms tick period.
pub const TICKS_PER_MS: u32 = 1;

/// Converts milliseconds to ticks.
#[must_use]
pub const fn ms_to_ticks(ms: u32) -> Tick {
    ms.saturating_mul(TICKS_PER_MS)
}

/// Converts ticks to milliseconds.
#[must_use]
pub const fn ticks_to_ms(ticks: Tick) -> u32 {
    ticks / TICKS_PER_MS
}

/// Returns `true` once `now` has reached or passed `deadline`.
///
/// Uses the signed difference so a deadline computed just before the
/// counter wraps is still honoured after it wraps.
#[must_use]
pub const fn tick_reached(now: Tick, deadline: Tick) -> bool {
    (deadline.wrapping_sub(now) as i32) <= 0
}

/// Longest distance between `now` and a deadline that [`tick_reached`]
/// can still order correctly.
pub const MAX_TICK_SPAN: Tick = i32::MAX as Tick;

/// Ticks elapsed from `since` to `now`, across a wrap.
#[must_use]
pub const fn ticks_elapsed(since: Tick, now: Tick) -> Tick {
    now.wrapping_sub(since)
}

// =============================================================================
// CLUSTER B: IDENTITY
// =============================================================================

/// Stable 64-bit IEEE device identity.
///
/// Zero is reserved and never identifies a device.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Eui64(pub u64);

impl Eui64 {
    /// The reserved all-zero identity.
    pub const UNSET: Self = Self(0);

    /// A valid identity is any non-zero value.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Little-endian wire bytes, as the radio reports them.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl fmt::Debug for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Eui64({:016X})", self.0)
    }
}

impl From<u64> for Eui64 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Error parsing an [`Eui64`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid EUI64 '{0}': expected up to 16 hex digits")]
pub struct ParseEui64Error(pub String);

impl FromStr for Eui64 {
    type Err = ParseEui64Error;

    /// Accepts `001788010816AE07`, `0x001788010816ae07` and colon-separated
    /// `00:17:88:01:08:16:AE:07`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits: String = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed)
            .chars()
            .filter(|c| *c != ':')
            .collect();
        if digits.is_empty() || digits.len() > 16 {
            return Err(ParseEui64Error(s.to_string()));
        }
        u64::from_str_radix(&digits, 16)
            .map(Self)
            .map_err(|_| ParseEui64Error(s.to_string()))
    }
}

/// Volatile 16-bit network (short) address.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct NetAddr(pub u16);

impl NetAddr {
    /// Sentinel for "no short address known".
    pub const UNASSIGNED: Self = Self(0xFFFF);
    /// The coordinator always owns short address 0.
    pub const COORDINATOR: Self = Self(0x0000);
}

impl fmt::Display for NetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl fmt::Debug for NetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetAddr(0x{:04X})", self.0)
    }
}

// =============================================================================
// CLUSTER C: CORRELATION
// =============================================================================

/// Caller-supplied token linking a command to its completion event.
///
/// `CorrelationId::NONE` (0) means "fire and forget": no completion event
/// is expected.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct CorrelationId(pub u32);

impl CorrelationId {
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationId({})", self.0)
    }
}

impl From<u32> for CorrelationId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// =============================================================================
// CLUSTER D: ZIGBEE ADDRESSING
// =============================================================================

/// Application endpoint number on a device.
pub type Endpoint = u8;

/// ZCL cluster identifier.
pub type ClusterId = u16;

/// ZCL attribute identifier.
pub type AttributeId = u16;

/// Hardware-assigned transaction sequence number.
pub type Tsn = u8;

/// Well-known ZCL clusters used by the core command surface.
pub mod clusters {
    use super::ClusterId;

    pub const BASIC: ClusterId = 0x0000;
    pub const POWER_CONFIG: ClusterId = 0x0001;
    pub const IDENTIFY: ClusterId = 0x0003;
    pub const ON_OFF: ClusterId = 0x0006;
    pub const LEVEL_CONTROL: ClusterId = 0x0008;
    pub const COLOR_CONTROL: ClusterId = 0x0300;
    pub const TEMPERATURE: ClusterId = 0x0402;
    pub const HUMIDITY: ClusterId = 0x0405;
    pub const OCCUPANCY: ClusterId = 0x0406;
}
