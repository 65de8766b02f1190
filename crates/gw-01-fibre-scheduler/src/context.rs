//! # Fibre Context
//!
//! Handed to every fibre body. `yield_now` and `sleep` are the only
//! suspension points in the system:
//!
//! ```ignore
//! scheduler.create("blink", 0, |ctx| async move {
//!     loop {
//!         toggle_led();
//!         ctx.sleep(Duration::from_millis(500)).await;
//!     }
//! })?;
//! ```
//!
//! Awaiting anything other than a [`Suspend`] is treated as a yield: the
//! fibre is polled again on its next turn.

use crate::domain::fibre::{FibreId, FibreName};
use crate::tick::TickCounter;
use parking_lot::Mutex;
use shared_types::Tick;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Why a fibre handed control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SuspendReason {
    Yield,
    Sleep(Tick),
}

/// Mailbox the suspension future writes its reason into.
#[derive(Debug, Default)]
pub(crate) struct SuspendSignal {
    reason: Mutex<Option<SuspendReason>>,
}

impl SuspendSignal {
    fn record(&self, reason: SuspendReason) {
        *self.reason.lock() = Some(reason);
    }

    pub(crate) fn take(&self) -> Option<SuspendReason> {
        self.reason.lock().take()
    }
}

/// Per-fibre handle to the scheduler's suspension points.
#[derive(Clone)]
pub struct FibreContext {
    id: FibreId,
    name: FibreName,
    signal: Arc<SuspendSignal>,
    ticks: Arc<TickCounter>,
    tick_period_ms: u32,
}

impl FibreContext {
    pub(crate) fn new(
        id: FibreId,
        name: FibreName,
        signal: Arc<SuspendSignal>,
        ticks: Arc<TickCounter>,
        tick_period_ms: u32,
    ) -> Self {
        Self {
            id,
            name,
            signal,
            ticks,
            tick_period_ms,
        }
    }

    pub fn id(&self) -> FibreId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Current scheduler tick.
    pub fn now(&self) -> Tick {
        self.ticks.now()
    }

    /// Hands control back; the fibre stays Ready.
    pub fn yield_now(&self) -> Suspend {
        Suspend::new(SuspendReason::Yield, Arc::clone(&self.signal))
    }

    /// Sleeps for at least `duration`, rounded up to whole ticks and capped
    /// at `u32::MAX` ticks. A zero duration is a yield.
    pub fn sleep(&self, duration: Duration) -> Suspend {
        let period = u128::from(self.tick_period_ms.max(1));
        let ticks = duration.as_millis().div_ceil(period);
        self.sleep_ticks(u32::try_from(ticks).unwrap_or(u32::MAX))
    }

    /// Sleeps for `ticks` ticks. Zero is a yield.
    pub fn sleep_ticks(&self, ticks: Tick) -> Suspend {
        let reason = if ticks == 0 {
            SuspendReason::Yield
        } else {
            SuspendReason::Sleep(ticks)
        };
        Suspend::new(reason, Arc::clone(&self.signal))
    }
}

impl std::fmt::Debug for FibreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FibreContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Future returned by the suspension points.
///
/// Pending on its first poll (after recording why), ready on the next,
/// which only happens once the scheduler resumes the fibre.
#[must_use = "suspension only happens when the future is awaited"]
pub struct Suspend {
    reason: Option<SuspendReason>,
    signal: Arc<SuspendSignal>,
}

impl Suspend {
    fn new(reason: SuspendReason, signal: Arc<SuspendSignal>) -> Self {
        Self {
            reason: Some(reason),
            signal,
        }
    }
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        match self.reason.take() {
            Some(reason) => {
                self.signal.record(reason);
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}
