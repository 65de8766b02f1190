//! Clock port.
//!
//! Abstracted so the bus, the adapter and the persistence layer read the
//! scheduler tick without depending on the scheduler crate, and so tests can
//! drive time deterministically.

use crate::entities::Tick;
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of the monotonic gateway tick.
pub trait Clock: Send + Sync {
    /// Returns the current tick.
    fn now(&self) -> Tick;
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    tick: AtomicU32,
}

impl ManualClock {
    #[must_use]
    pub fn new(initial: Tick) -> Self {
        Self {
            tick: AtomicU32::new(initial),
        }
    }

    pub fn advance(&self, ticks: Tick) {
        self.tick.fetch_add(ticks, Ordering::SeqCst);
    }

    pub fn set(&self, tick: Tick) {
        self.tick.store(tick, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        self.tick.load(Ordering::SeqCst)
    }
}
