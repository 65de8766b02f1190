//! # Tick Source
//!
//! The monotonic tick counter and the host timer thread that advances it.

use crate::scheduler::Scheduler;
use shared_types::Tick;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Wrapping tick counter shared by the scheduler and every fibre context.
#[derive(Debug, Default)]
pub(crate) struct TickCounter(AtomicU32);

impl TickCounter {
    pub(crate) fn new(initial: Tick) -> Self {
        Self(AtomicU32::new(initial))
    }

    pub(crate) fn now(&self) -> Tick {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn advance(&self, ticks: Tick) -> Tick {
        self.0.fetch_add(ticks, Ordering::AcqRel).wrapping_add(ticks)
    }
}

/// Platform timer: a thread calling [`Scheduler::tick_advance`] once per
/// period. Stops when dropped.
pub struct TickSource {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TickSource {
    /// Starts ticking `scheduler` every `period`.
    pub fn spawn(scheduler: Scheduler, period: Duration) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("tick".into())
            .spawn(move || {
                let mut next = Instant::now() + period;
                while !flag.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    }
                    scheduler.tick_advance();
                    next += period;
                }
                debug!("Tick source stopped");
            })?;
        info!(period_ms = period.as_millis() as u64, "Tick source started");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TickSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_wraps() {
        let counter = TickCounter::new(u32::MAX);
        assert_eq!(counter.advance(1), 0);
        assert_eq!(counter.now(), 0);
    }
}
