//! # Scheduler
//!
//! Process-wide executor owning the fibre table and the tick counter.
//! [`Scheduler`] is a cheap cloneable handle; clones share one table.
//!
//! ## Scheduling pass
//!
//! 1. Wake every sleeper whose wake tick has been reached.
//! 2. Scan forward from the slot after the last fibre run, wrapping and
//!    skipping the idle fibre, for the first Ready fibre.
//! 3. Fall back to the idle fibre.
//! 4. Resume the chosen continuation with the table unlocked, then record
//!    how it suspended.
//!
//! A fibre that never yields starves every other fibre. There is no
//! preemption.

use crate::backend::{Continuation, Entry};
use crate::context::{FibreContext, SuspendSignal};
use crate::domain::fibre::bounded_name;
use crate::domain::table::{FibreTable, Step};
use crate::domain::{FibreError, FibreId, FibreInfo, FibreState, SchedulerConfig, SchedulerStats};
use crate::tick::TickCounter;
use futures::FutureExt;
use parking_lot::Mutex;
use shared_types::{Clock, Tick};
use std::convert::Infallible;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Name of the reserved idle fibre.
pub const IDLE_FIBRE_NAME: &str = "idle";

struct Inner {
    config: SchedulerConfig,
    ticks: Arc<TickCounter>,
    table: Mutex<FibreTable<Continuation>>,
    running: AtomicBool,
    passes: AtomicU64,
    idle_passes: AtomicU64,
}

/// Handle to the cooperative fibre scheduler.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Creates the scheduler and its idle fibre.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a rejected configuration, `StackAllocation` when
    /// the idle fibre cannot be created.
    pub fn new(config: SchedulerConfig) -> Result<Self, FibreError> {
        config.validate()?;
        let idle_sleep = Duration::from_micros(config.idle_sleep_us);
        let idle_stack = config.idle_stack_size;

        let scheduler = Self {
            inner: Arc::new(Inner {
                ticks: Arc::new(TickCounter::new(0)),
                table: Mutex::new(FibreTable::new(config.max_fibres)),
                running: AtomicBool::new(false),
                passes: AtomicU64::new(0),
                idle_passes: AtomicU64::new(0),
                config,
            }),
        };

        let id = scheduler.create(IDLE_FIBRE_NAME, idle_stack, move |ctx| async move {
            loop {
                if idle_sleep.is_zero() {
                    thread::yield_now();
                } else {
                    thread::sleep(idle_sleep);
                }
                ctx.yield_now().await;
            }
        })?;
        debug_assert!(id.is_idle());

        info!(
            backend = %scheduler.inner.config.backend,
            max_fibres = scheduler.inner.config.max_fibres,
            "Scheduler initialized"
        );
        Ok(scheduler)
    }

    /// Registers a fibre. It becomes Ready immediately; `entry` is first
    /// called when the fibre is first scheduled.
    ///
    /// The name is truncated to 15 bytes. A `stack_size` of 0 selects the
    /// configured default.
    ///
    /// # Errors
    ///
    /// `TableFull` or `StackAllocation`, both of kind `ResourceExhausted`.
    pub fn create<F, Fut>(
        &self,
        name: &str,
        stack_size: u32,
        entry: F,
    ) -> Result<FibreId, FibreError>
    where
        F: FnOnce(FibreContext) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let config = &self.inner.config;
        let stack_size = if stack_size == 0 {
            config.default_stack_size
        } else {
            stack_size
        };
        let name = bounded_name(name);
        let entry: Entry = Box::new(move |ctx| entry(ctx).boxed());

        let mut table = self.inner.table.lock();
        let id = table.reserve().inspect_err(|_| {
            warn!(fibre = %name, "Fibre table full");
        })?;

        let signal = Arc::new(SuspendSignal::default());
        let context = FibreContext::new(
            id,
            name.clone(),
            Arc::clone(&signal),
            Arc::clone(&self.inner.ticks),
            config.tick_period_ms,
        );
        let continuation =
            Continuation::new(config.backend, &name, stack_size, context, signal, entry).map_err(
                |e| FibreError::StackAllocation {
                    name: name.to_string(),
                    stack_size,
                    reason: e.to_string(),
                },
            )?;

        let id = table.insert(name.clone(), stack_size, continuation)?;
        info!(fibre = %name, id = %id, stack_size, "Fibre created");
        Ok(id)
    }

    /// Performs one scheduling pass and returns the fibre that ran.
    pub fn run_pass(&self) -> FibreId {
        let started = self.now();
        let (index, id, mut continuation) = {
            let mut table = self.inner.table.lock();
            table.wake_sleepers(started);
            let index = table.select_next();
            let (id, continuation) = table.begin(index, started);
            (index, id, continuation)
        };

        let step = continuation
            .as_mut()
            .map_or(Step::Finished, Continuation::resume);

        let ended = self.now();
        let finished = {
            let mut table = self.inner.table.lock();
            if step == Step::Finished {
                info!(fibre = %table.name_of(index), id = %id, "Fibre finished");
            }
            table.complete(index, step, started, ended, continuation)
        };
        // Dropped outside the lock: a body may own scheduler handles.
        drop(finished);

        self.inner.passes.fetch_add(1, Ordering::Relaxed);
        if id.is_idle() {
            self.inner.idle_passes.fetch_add(1, Ordering::Relaxed);
        }
        id
    }

    /// Runs `count` scheduling passes.
    pub fn run_passes(&self, count: usize) {
        for _ in 0..count {
            self.run_pass();
        }
    }

    /// Enters the scheduling loop. Never returns on success.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if another caller already entered the loop.
    pub fn start(&self) -> Result<Infallible, FibreError> {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return Err(FibreError::AlreadyRunning);
        }
        info!(fibres = self.count(), "Scheduler started");
        loop {
            self.run_pass();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Advances the tick by one. Safe to call from the timer thread.
    pub fn tick_advance(&self) -> Tick {
        self.inner.ticks.advance(1)
    }

    pub fn tick_advance_by(&self, ticks: Tick) -> Tick {
        self.inner.ticks.advance(ticks)
    }

    pub fn now(&self) -> Tick {
        self.inner.ticks.now()
    }

    /// The fibre being resumed, if a pass is in progress.
    pub fn current(&self) -> Option<FibreId> {
        self.inner.table.lock().current()
    }

    pub fn info(&self, id: FibreId) -> Option<FibreInfo> {
        self.inner.table.lock().info(id)
    }

    /// Every fibre in creation order, the idle fibre first.
    pub fn fibres(&self) -> Vec<FibreInfo> {
        self.inner.table.lock().infos()
    }

    /// Number of fibres, the idle fibre included.
    pub fn count(&self) -> usize {
        self.inner.table.lock().len()
    }

    pub fn stats(&self) -> SchedulerStats {
        let table = self.inner.table.lock();
        SchedulerStats {
            ticks: self.now(),
            passes: self.inner.passes.load(Ordering::Relaxed),
            idle_passes: self.inner.idle_passes.load(Ordering::Relaxed),
            fibre_count: table.len(),
            ready_count: table.count_in(FibreState::Ready),
            sleeping_count: table.count_in(FibreState::Sleeping),
            dead_count: table.count_in(FibreState::Dead),
        }
    }

    /// Time since start at the configured tick period. Wraps with the tick.
    pub fn uptime(&self) -> Duration {
        Duration::from_millis(u64::from(self.now()) * u64::from(self.inner.config.tick_period_ms))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }
}

impl Clock for Scheduler {
    fn now(&self) -> Tick {
        Scheduler::now(self)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("backend", &self.inner.config.backend)
            .field("ticks", &self.now())
            .finish_non_exhaustive()
    }
}
