//! # Fibre Table
//!
//! Bounded table of fibre slots in creation order. Slot 0 is the idle
//! fibre. Selection is round-robin from the slot after the last one run,
//! skipping the idle fibre, falling back to it when nothing is ready.
//!
//! The table is generic over the continuation so the selection rules can
//! be exercised without running any fibre body.

use super::errors::FibreError;
use super::fibre::{FibreId, FibreInfo, FibreName, FibreState};
use shared_types::limits::MAX_FIBRES;
use shared_types::{tick_reached, ticks_elapsed, Tick, MAX_TICK_SPAN};

/// What a fibre did when it last handed control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Yield,
    /// Sleep for this many ticks (always > 0).
    Sleep(Tick),
    Finished,
}

pub(crate) struct FibreSlot<C> {
    pub(crate) id: FibreId,
    pub(crate) name: FibreName,
    pub(crate) state: FibreState,
    pub(crate) stack_size: u32,
    pub(crate) wake_tick: Tick,
    /// Sleep still owed once `wake_tick` is reached.
    pub(crate) sleep_remaining: Tick,
    pub(crate) run_count: u32,
    pub(crate) last_run_tick: Tick,
    pub(crate) total_run_ticks: u32,
    pub(crate) continuation: Option<C>,
}

impl<C> FibreSlot<C> {
    fn info(&self) -> FibreInfo {
        FibreInfo {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            stack_size: self.stack_size,
            run_count: self.run_count,
            last_run_tick: self.last_run_tick,
            total_run_ticks: self.total_run_ticks,
            wake_tick: self.wake_tick,
        }
    }
}

pub(crate) struct FibreTable<C> {
    slots: heapless::Vec<FibreSlot<C>, MAX_FIBRES>,
    capacity: usize,
    /// Index of the fibre that ran last.
    cursor: usize,
    current: Option<FibreId>,
}

impl<C> FibreTable<C> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: heapless::Vec::new(),
            capacity: capacity.min(MAX_FIBRES),
            cursor: 0,
            current: None,
        }
    }

    /// The id the next inserted fibre will receive.
    pub(crate) fn reserve(&self) -> Result<FibreId, FibreError> {
        if self.slots.len() >= self.capacity {
            return Err(FibreError::TableFull {
                max: self.capacity,
            });
        }
        Ok(FibreId(self.slots.len() as u8))
    }

    pub(crate) fn insert(
        &mut self,
        name: FibreName,
        stack_size: u32,
        continuation: C,
    ) -> Result<FibreId, FibreError> {
        let id = self.reserve()?;
        let slot = FibreSlot {
            id,
            name,
            state: FibreState::Ready,
            stack_size,
            wake_tick: 0,
            sleep_remaining: 0,
            run_count: 0,
            last_run_tick: 0,
            total_run_ticks: 0,
            continuation: Some(continuation),
        };
        self.slots
            .push(slot)
            .map_err(|_| FibreError::TableFull { max: self.capacity })?;
        Ok(id)
    }

    /// Moves every sleeper whose wake tick has been reached to Ready.
    /// A sleep longer than [`MAX_TICK_SPAN`] is re-armed in segments.
    pub(crate) fn wake_sleepers(&mut self, now: Tick) -> usize {
        let mut woken = 0;
        for slot in self
            .slots
            .iter_mut()
            .filter(|s| s.state == FibreState::Sleeping)
        {
            while slot.sleep_remaining > 0 && tick_reached(now, slot.wake_tick) {
                let segment = slot.sleep_remaining.min(MAX_TICK_SPAN);
                slot.sleep_remaining -= segment;
                slot.wake_tick = slot.wake_tick.wrapping_add(segment);
            }
            if slot.sleep_remaining == 0 && tick_reached(now, slot.wake_tick) {
                slot.state = FibreState::Ready;
                woken += 1;
            }
        }
        woken
    }

    /// Index of the next fibre to run.
    pub(crate) fn select_next(&self) -> usize {
        let len = self.slots.len();
        (1..=len)
            .map(|offset| (self.cursor + offset) % len)
            .filter(|&index| index != FibreId::IDLE.index())
            .find(|&index| self.slots[index].state == FibreState::Ready)
            .unwrap_or(FibreId::IDLE.index())
    }

    /// Marks `index` Running and hands out its continuation.
    pub(crate) fn begin(&mut self, index: usize, now: Tick) -> (FibreId, Option<C>) {
        self.cursor = index;
        let slot = &mut self.slots[index];
        slot.state = FibreState::Running;
        slot.run_count = slot.run_count.wrapping_add(1);
        slot.last_run_tick = now;
        self.current = Some(slot.id);
        (slot.id, slot.continuation.take())
    }

    /// Applies the outcome of a resume. A finished fibre's continuation is
    /// returned so the caller can drop it outside the table lock.
    pub(crate) fn complete(
        &mut self,
        index: usize,
        step: Step,
        started: Tick,
        ended: Tick,
        continuation: Option<C>,
    ) -> Option<C> {
        self.current = None;
        let slot = &mut self.slots[index];
        slot.total_run_ticks = slot
            .total_run_ticks
            .wrapping_add(ticks_elapsed(started, ended));
        match step {
            Step::Yield => {
                slot.state = FibreState::Ready;
                slot.continuation = continuation;
                None
            }
            Step::Sleep(ticks) => {
                slot.state = FibreState::Sleeping;
                let segment = ticks.min(MAX_TICK_SPAN);
                slot.wake_tick = ended.wrapping_add(segment);
                slot.sleep_remaining = ticks - segment;
                slot.continuation = continuation;
                None
            }
            Step::Finished => {
                slot.state = FibreState::Dead;
                continuation
            }
        }
    }

    pub(crate) fn current(&self) -> Option<FibreId> {
        self.current
    }

    pub(crate) fn info(&self, id: FibreId) -> Option<FibreInfo> {
        self.slots.get(id.index()).map(FibreSlot::info)
    }

    pub(crate) fn infos(&self) -> Vec<FibreInfo> {
        self.slots.iter().map(FibreSlot::info).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn count_in(&self, state: FibreState) -> usize {
        self.slots.iter().filter(|s| s.state == state).count()
    }

    pub(crate) fn name_of(&self, index: usize) -> &str {
        self.slots[index].name.as_str()
    }
}
