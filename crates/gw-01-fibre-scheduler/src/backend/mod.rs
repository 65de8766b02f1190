//! # Continuation Backends
//!
//! A fibre's saved continuation is a closed set of variants:
//!
//! | Backend    | Where the body runs               | Suspension                         |
//! |------------|-----------------------------------|------------------------------------|
//! | `Polled`   | scheduler thread                  | the body's future returns Pending  |
//! | `Threaded` | a dedicated native thread         | the thread parks on a baton        |
//!
//! Both drive the body with [`poll_step`], so a body observes identical
//! scheduling under either backend.

mod polled;
mod threaded;

use crate::context::{FibreContext, SuspendReason, SuspendSignal};
use crate::domain::table::Step;
use crate::domain::FibreBackend;
use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use std::io;
use std::sync::Arc;
use std::task::{Context, Poll};

pub(crate) use polled::PolledFibre;
pub(crate) use threaded::ThreadedFibre;

/// Type-erased fibre entry point.
pub(crate) type Entry = Box<dyn FnOnce(FibreContext) -> BoxFuture<'static, ()> + Send>;

/// Host threads never get less than this, whatever the logical stack size.
pub(crate) const THREAD_STACK_FLOOR: usize = 64 * 1024;

pub(crate) enum Continuation {
    Polled(PolledFibre),
    Threaded(ThreadedFibre),
}

impl Continuation {
    pub(crate) fn new(
        backend: FibreBackend,
        name: &str,
        stack_size: u32,
        context: FibreContext,
        signal: Arc<SuspendSignal>,
        entry: Entry,
    ) -> io::Result<Self> {
        match backend {
            FibreBackend::Polled => Ok(Self::Polled(PolledFibre::new(context, signal, entry))),
            FibreBackend::Threaded => {
                ThreadedFibre::spawn(name, stack_size, context, signal, entry).map(Self::Threaded)
            }
        }
    }

    /// Runs the fibre until its next suspension point or until it returns.
    pub(crate) fn resume(&mut self) -> Step {
        match self {
            Self::Polled(fibre) => fibre.resume(),
            Self::Threaded(fibre) => fibre.resume(),
        }
    }
}

/// Polls a fibre body once and classifies the outcome.
pub(crate) fn poll_step(future: &mut BoxFuture<'static, ()>, signal: &SuspendSignal) -> Step {
    let mut cx = Context::from_waker(noop_waker_ref());
    match future.as_mut().poll(&mut cx) {
        Poll::Ready(()) => Step::Finished,
        Poll::Pending => match signal.take() {
            Some(SuspendReason::Sleep(ticks)) => Step::Sleep(ticks),
            Some(SuspendReason::Yield) | None => Step::Yield,
        },
    }
}
