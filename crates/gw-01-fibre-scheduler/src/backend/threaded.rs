//! Thread-backed continuation.
//!
//! Each fibre owns a native thread with its own stack. The thread and the
//! scheduler pass a baton back and forth, so at most one of them runs at a
//! time and scheduling stays cooperative even though the OS could preempt.
//!
//! ```text
//!   scheduler                         fibre thread
//!   ─────────                         ────────────
//!   resume(): baton = Run  ────────▶  wakes, polls body
//!             waits                   body suspends
//!             ◀──────────────────────  baton = Suspended(step), parks
//!   baton = Parked, returns step
//! ```

use super::{poll_step, Entry, THREAD_STACK_FLOOR};
use crate::context::{FibreContext, SuspendSignal};
use crate::domain::table::Step;
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Baton {
    /// Held by the scheduler; the fibre thread is parked.
    Parked,
    /// Handed to the fibre thread.
    Run,
    /// Handed back with the outcome of the last resume.
    Suspended(Step),
    /// The continuation was dropped; the fibre thread must exit.
    Cancelled,
}

#[derive(Debug)]
struct Handoff {
    baton: Mutex<Baton>,
    cv: Condvar,
}

impl Handoff {
    /// Blocks the fibre thread until it is resumed. `false` on cancel.
    fn wait_for_run(&self) -> bool {
        let mut baton = self.baton.lock();
        loop {
            match *baton {
                Baton::Run => return true,
                Baton::Cancelled => return false,
                Baton::Parked | Baton::Suspended(_) => self.cv.wait(&mut baton),
            }
        }
    }

    fn hand_back(&self, step: Step) {
        let mut baton = self.baton.lock();
        if *baton != Baton::Cancelled {
            *baton = Baton::Suspended(step);
        }
        self.cv.notify_all();
    }
}

/// Reports a panicking body as finished so the scheduler is not left
/// waiting for a baton that never comes back.
struct PanicGuard(Arc<Handoff>);

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("Fibre body panicked");
            self.0.hand_back(Step::Finished);
        }
    }
}

pub(crate) struct ThreadedFibre {
    handoff: Arc<Handoff>,
}

impl ThreadedFibre {
    pub(crate) fn spawn(
        name: &str,
        stack_size: u32,
        context: FibreContext,
        signal: Arc<SuspendSignal>,
        entry: Entry,
    ) -> io::Result<Self> {
        let handoff = Arc::new(Handoff {
            baton: Mutex::new(Baton::Parked),
            cv: Condvar::new(),
        });
        let thread_handoff = Arc::clone(&handoff);

        thread::Builder::new()
            .name(format!("fibre-{name}"))
            .stack_size((stack_size as usize).max(THREAD_STACK_FLOOR))
            .spawn(move || {
                let _guard = PanicGuard(Arc::clone(&thread_handoff));
                if !thread_handoff.wait_for_run() {
                    return;
                }
                let mut future = entry(context);
                loop {
                    let step = poll_step(&mut future, &signal);
                    thread_handoff.hand_back(step);
                    if step == Step::Finished || !thread_handoff.wait_for_run() {
                        break;
                    }
                }
                debug!("Fibre thread exiting");
            })?;

        Ok(Self { handoff })
    }

    pub(crate) fn resume(&mut self) -> Step {
        let mut baton = self.handoff.baton.lock();
        *baton = Baton::Run;
        self.handoff.cv.notify_all();
        loop {
            match *baton {
                Baton::Suspended(step) => {
                    *baton = Baton::Parked;
                    return step;
                }
                Baton::Cancelled => return Step::Finished,
                Baton::Run | Baton::Parked => self.handoff.cv.wait(&mut baton),
            }
        }
    }
}

impl Drop for ThreadedFibre {
    fn drop(&mut self) {
        *self.handoff.baton.lock() = Baton::Cancelled;
        self.handoff.cv.notify_all();
    }
}
