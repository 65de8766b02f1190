//! # Adapter Lifecycle
//!
//! ```text
//! Uninitialized ──initialize()──▶ Initializing ──formation ok──▶ Ready
//!       │                              │                          │
//!       └──────── radio init failed ───┴──── formation failed ────┴──▶ Error (terminal)
//! ```
//!
//! Transitions are validated with a compare-and-swap, so the radio thread
//! and fibres can race on them safely. An invalid transition is logged and
//! leaves the state unchanged.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdapterState {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
    Error = 3,
}

impl AdapterState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Ready,
            _ => Self::Error,
        }
    }

    /// Whether `self → to` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Uninitialized, Self::Initializing)
                | (Self::Uninitialized, Self::Error)
                | (Self::Initializing, Self::Ready)
                | (Self::Initializing, Self::Error)
                | (Self::Ready, Self::Error)
        )
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Process-wide adapter state.
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(AdapterState::Uninitialized as u8),
        }
    }

    pub fn state(&self) -> AdapterState {
        AdapterState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == AdapterState::Ready
    }

    /// Moves to `to` if that is legal from the current state.
    ///
    /// Returns the previous state, or the unchanged current state on
    /// rejection.
    pub fn transition(&self, to: AdapterState) -> Result<AdapterState, AdapterState> {
        let mut current = self.state();
        loop {
            if !current.can_transition_to(to) {
                error!(from = %current, to = %to, "Rejected adapter state transition");
                return Err(current);
            }
            match self.state.compare_exchange(
                current as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    info!(from = %current, to = %to, "Adapter state changed");
                    return Ok(current);
                }
                Err(actual) => current = AdapterState::from_u8(actual),
            }
        }
    }
}
