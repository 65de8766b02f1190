//! # Pending-Command Table
//!
//! Correlates commands issued to the radio with the caller's correlation
//! id. A slot is allocated before the radio call and the hardware sequence
//! number (TSN) is attached once the call returns it. Completion callbacks
//! find the slot by TSN only.
//!
//! Allocation and free are O(1) through a free list; TSN lookup is O(1)
//! through a 256-entry index. If the 8-bit TSN wraps onto a slot that is
//! still outstanding, the index follows the newer slot and the older one
//! completes through the timeout sweep.

use super::errors::PendingError;
use heapless::Vec as HeaplessVec;
use shared_types::limits::MAX_PENDING;
use shared_types::{ticks_elapsed, ClusterId, CorrelationId, Tick, Tsn};

/// Handle to an allocated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u8);

impl SlotId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    pub correlation_id: CorrelationId,
    /// Hardware sequence number; `None` until attached.
    pub tsn: Option<Tsn>,
    pub cluster: ClusterId,
    pub command: u8,
    pub issued_at: Tick,
}

/// Bounded table of outstanding commands.
pub struct PendingTable<const N: usize = MAX_PENDING> {
    slots: [Option<PendingCommand>; N],
    free: HeaplessVec<u8, N>,
    /// `by_tsn[tsn]` is `slot index + 1`, or 0 when unused.
    by_tsn: [u8; 256],
}

impl<const N: usize> Default for PendingTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PendingTable<N> {
    #[must_use]
    pub fn new() -> Self {
        let mut free = HeaplessVec::new();
        for index in (0..N).rev() {
            let _ = free.push(index as u8);
        }
        Self {
            slots: [None; N],
            free,
            by_tsn: [0; 256],
        }
    }

    /// Reserves a slot for `correlation_id`.
    ///
    /// # Errors
    ///
    /// `Full` when every slot is outstanding.
    pub fn allocate(
        &mut self,
        correlation_id: CorrelationId,
        cluster: ClusterId,
        command: u8,
        now: Tick,
    ) -> Result<SlotId, PendingError> {
        let index = self.free.pop().ok_or(PendingError::Full { capacity: N })?;
        self.slots[index as usize] = Some(PendingCommand {
            correlation_id,
            tsn: None,
            cluster,
            command,
            issued_at: now,
        });
        Ok(SlotId(index))
    }

    /// Records the hardware sequence number for `slot`.
    pub fn attach(&mut self, slot: SlotId, tsn: Tsn) {
        let Some(command) = self.slots[slot.index()].as_mut() else {
            return;
        };
        if let Some(old) = command.tsn.replace(tsn) {
            self.unindex(old, slot);
        }
        self.by_tsn[tsn as usize] = slot.0 + 1;
    }

    pub fn find_by_tsn(&self, tsn: Tsn) -> Option<(SlotId, PendingCommand)> {
        let raw = self.by_tsn[tsn as usize];
        if raw == 0 {
            return None;
        }
        let slot = SlotId(raw - 1);
        self.slots[slot.index()].map(|command| (slot, command))
    }

    /// Frees `slot`, returning what it held.
    pub fn free(&mut self, slot: SlotId) -> Option<PendingCommand> {
        let command = self.slots[slot.index()].take()?;
        if let Some(tsn) = command.tsn {
            self.unindex(tsn, slot);
        }
        let _ = self.free.push(slot.0);
        Some(command)
    }

    /// Finds and frees the slot matching `tsn` in one step.
    pub fn complete(&mut self, tsn: Tsn) -> Option<PendingCommand> {
        let (slot, _) = self.find_by_tsn(tsn)?;
        self.free(slot)
    }

    /// Frees every slot older than `timeout` ticks and returns their
    /// correlation ids. A slot exactly `timeout` old is kept.
    pub fn purge_expired(&mut self, now: Tick, timeout: Tick) -> HeaplessVec<CorrelationId, N> {
        let mut expired = HeaplessVec::new();
        for index in 0..N {
            let is_expired = self.slots[index]
                .is_some_and(|command| ticks_elapsed(command.issued_at, now) > timeout);
            if is_expired {
                if let Some(command) = self.free(SlotId(index as u8)) {
                    let _ = expired.push(command.correlation_id);
                }
            }
        }
        expired
    }

    pub fn len(&self) -> usize {
        N - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingCommand> {
        self.slots.iter().flatten()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn unindex(&mut self, tsn: Tsn, slot: SlotId) {
        if self.by_tsn[tsn as usize] == slot.0 + 1 {
            self.by_tsn[tsn as usize] = 0;
        }
    }
}
