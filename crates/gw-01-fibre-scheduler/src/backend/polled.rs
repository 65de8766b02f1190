//! Polled continuation: the fibre body is a state machine resumed on the
//! scheduler's own stack.

use super::{poll_step, Entry};
use crate::context::{FibreContext, SuspendSignal};
use crate::domain::table::Step;
use futures::future::BoxFuture;
use std::sync::Arc;

pub(crate) struct PolledFibre {
    state: PolledState,
    signal: Arc<SuspendSignal>,
}

enum PolledState {
    /// Not yet started: the entry is called on the first resume.
    Fresh(Option<(Entry, FibreContext)>),
    Suspended(BoxFuture<'static, ()>),
    Done,
}

impl PolledFibre {
    pub(crate) fn new(context: FibreContext, signal: Arc<SuspendSignal>, entry: Entry) -> Self {
        Self {
            state: PolledState::Fresh(Some((entry, context))),
            signal,
        }
    }

    pub(crate) fn resume(&mut self) -> Step {
        if let PolledState::Fresh(start) = &mut self.state {
            match start.take() {
                Some((entry, context)) => self.state = PolledState::Suspended(entry(context)),
                None => self.state = PolledState::Done,
            }
        }

        let step = match &mut self.state {
            PolledState::Suspended(future) => poll_step(future, &self.signal),
            PolledState::Fresh(_) | PolledState::Done => Step::Finished,
        };
        if step == Step::Finished {
            self.state = PolledState::Done;
        }
        step
    }
}
