//! # Event Types and Filters
//!
//! Event types are small ordinals grouped into ranges so a subscriber can
//! take a whole family with one filter.
//!
//! | Range    | Family                           |
//! |----------|----------------------------------|
//! | 0..=9    | System (boot, log, persistence)  |
//! | 10..=39  | Zigbee adapter                   |
//! | 40..=59  | Capability layer (domain-owned)  |
//! | 100..=255| User-defined                     |

use std::fmt;

/// Event type ordinal carried in every envelope.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EventType(pub u8);

impl EventType {
    // System
    pub const BOOT: Self = Self(0);
    pub const LOG: Self = Self(1);
    pub const PERSIST_FLUSHED: Self = Self(2);

    // Zigbee
    pub const NETWORK_UP: Self = Self(10);
    pub const NETWORK_DOWN: Self = Self(11);
    pub const DEVICE_JOINED: Self = Self(12);
    pub const DEVICE_ANNOUNCED: Self = Self(13);
    pub const DEVICE_LEFT: Self = Self(14);
    pub const ATTRIBUTE_REPORT: Self = Self(15);
    pub const COMMAND_CONFIRMED: Self = Self(16);
    pub const COMMAND_FAILED: Self = Self(17);
    pub const PERMIT_JOIN_CHANGED: Self = Self(18);

    // Capability
    pub const CAPABILITY_STATE_CHANGED: Self = Self(40);
    pub const CAPABILITY_COMMAND: Self = Self(41);

    /// First type available to user services.
    pub const USER_BASE: Self = Self(100);
    pub const MAX: Self = Self(255);

    /// Human-readable name for logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BOOT => "boot",
            Self::LOG => "log",
            Self::PERSIST_FLUSHED => "persist_flushed",
            Self::NETWORK_UP => "network_up",
            Self::NETWORK_DOWN => "network_down",
            Self::DEVICE_JOINED => "device_joined",
            Self::DEVICE_ANNOUNCED => "device_announced",
            Self::DEVICE_LEFT => "device_left",
            Self::ATTRIBUTE_REPORT => "attribute_report",
            Self::COMMAND_CONFIRMED => "command_confirmed",
            Self::COMMAND_FAILED => "command_failed",
            Self::PERMIT_JOIN_CHANGED => "permit_join_changed",
            Self::CAPABILITY_STATE_CHANGED => "capability_state_changed",
            Self::CAPABILITY_COMMAND => "capability_command",
            t if t >= Self::USER_BASE => "user",
            _ => "reserved",
        }
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({}:{})", self.0, self.name())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive type range a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    pub min: EventType,
    pub max: EventType,
}

impl EventFilter {
    /// Every event type.
    pub const ALL: Self = Self::range(EventType(0), EventType::MAX);
    /// The Zigbee adapter family.
    pub const ZIGBEE: Self = Self::range(EventType::NETWORK_UP, EventType(39));
    /// The capability family.
    pub const CAPABILITY: Self = Self::range(EventType::CAPABILITY_STATE_CHANGED, EventType(59));

    #[must_use]
    pub const fn range(min: EventType, max: EventType) -> Self {
        Self { min, max }
    }

    /// A filter matching exactly one type.
    #[must_use]
    pub const fn only(kind: EventType) -> Self {
        Self::range(kind, kind)
    }

    /// `true` iff `min <= kind <= max`. An inverted range matches nothing.
    #[must_use]
    pub const fn matches(&self, kind: EventType) -> bool {
        self.min.0 <= kind.0 && kind.0 <= self.max.0
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_inclusive_bounds() {
        let filter = EventFilter::range(EventType(10), EventType(12));
        assert!(!filter.matches(EventType(9)));
        assert!(filter.matches(EventType(10)));
        assert!(filter.matches(EventType(12)));
        assert!(!filter.matches(EventType(13)));
    }

    #[test]
    fn test_single_type_filter() {
        let filter = EventFilter::only(EventType::DEVICE_JOINED);
        assert!(filter.matches(EventType::DEVICE_JOINED));
        assert!(!filter.matches(EventType::DEVICE_ANNOUNCED));
    }

    #[test]
    fn test_family_filters() {
        assert!(EventFilter::ALL.matches(EventType::MAX));
        assert!(EventFilter::ZIGBEE.matches(EventType::COMMAND_FAILED));
        assert!(!EventFilter::ZIGBEE.matches(EventType::BOOT));
        assert!(EventFilter::CAPABILITY.matches(EventType::CAPABILITY_COMMAND));
        assert!(!EventFilter::CAPABILITY.matches(EventType::USER_BASE));
    }

    #[test]
    fn test_inverted_range_matches_nothing() {
        let filter = EventFilter::range(EventType(20), EventType(10));
        assert!((0..=255u8).all(|t| !filter.matches(EventType(t))));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventType::ATTRIBUTE_REPORT.name(), "attribute_report");
        assert_eq!(EventType(120).name(), "user");
        assert_eq!(EventType(70).name(), "reserved");
    }
}
