//! # Address Cache
//!
//! Maps a device's stable EUI64 to its volatile network address.
//!
//! One dense backing store with a free list, indexed twice:
//!
//! ```text
//!   by_identity: Eui64   ──┐
//!                          ├──▶ entries[idx] = { identity, net_addr }
//!   by_net:      NetAddr ──┘
//! ```
//!
//! Neither index points into the other. When a device re-announces with a
//! new network address, only the `by_net` key moves. If a second device
//! claims an address still indexed for another entry, the index is
//! reassigned to the newcomer and the older entry is reachable by identity
//! only.

use super::errors::CacheError;
use heapless::{FnvIndexMap, Vec as HeaplessVec};
use shared_types::limits::MAX_DEVICES;
use shared_types::{Eui64, NetAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub identity: Eui64,
    pub net_addr: NetAddr,
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The identity was not cached before.
    Inserted(CacheEntry),
    /// The identity was cached; its network address is now `entry.net_addr`.
    Updated { entry: CacheEntry, previous: NetAddr },
}

impl Upsert {
    #[must_use]
    pub const fn entry(&self) -> CacheEntry {
        match self {
            Self::Inserted(entry) | Self::Updated { entry, .. } => *entry,
        }
    }

    #[must_use]
    pub const fn is_new(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Bounded EUI64 ↔ network address cache. `N` must be a power of two.
pub struct AddressCache<const N: usize = MAX_DEVICES> {
    entries: [Option<CacheEntry>; N],
    free: HeaplessVec<u8, N>,
    by_identity: FnvIndexMap<Eui64, u8, N>,
    by_net: FnvIndexMap<NetAddr, u8, N>,
}

impl<const N: usize> Default for AddressCache<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AddressCache<N> {
    #[must_use]
    pub fn new() -> Self {
        let mut free = HeaplessVec::new();
        // Reversed so slot 0 is handed out first.
        for index in (0..N).rev() {
            let _ = free.push(index as u8);
        }
        Self {
            entries: [None; N],
            free,
            by_identity: FnvIndexMap::new(),
            by_net: FnvIndexMap::new(),
        }
    }

    /// Inserts `identity`, or updates its network address in place.
    ///
    /// # Errors
    ///
    /// `InvalidIdentity` for identity 0, `Full` when a new identity does
    /// not fit. Existing entries are never evicted.
    pub fn insert(&mut self, identity: Eui64, net_addr: NetAddr) -> Result<Upsert, CacheError> {
        if !identity.is_valid() {
            return Err(CacheError::InvalidIdentity);
        }

        if let Some(&index) = self.by_identity.get(&identity) {
            let entry = self.entries[index as usize]
                .as_mut()
                .ok_or(CacheError::Full { capacity: N })?;
            let previous = entry.net_addr;
            entry.net_addr = net_addr;
            let entry = *entry;
            if previous != net_addr {
                self.unindex_net(previous, index);
            }
            self.index_net(net_addr, index);
            return Ok(Upsert::Updated { entry, previous });
        }

        let index = self.free.pop().ok_or(CacheError::Full { capacity: N })?;
        let entry = CacheEntry { identity, net_addr };
        self.entries[index as usize] = Some(entry);
        // Both maps hold at most one key per live entry, so neither overflows.
        let _ = self.by_identity.insert(identity, index);
        self.index_net(net_addr, index);
        Ok(Upsert::Inserted(entry))
    }

    pub fn find_by_identity(&self, identity: Eui64) -> Option<CacheEntry> {
        let index = *self.by_identity.get(&identity)?;
        self.entries[index as usize]
    }

    /// Reverse lookup used by the attribute-report path.
    pub fn find_by_net_addr(&self, net_addr: NetAddr) -> Option<CacheEntry> {
        let index = *self.by_net.get(&net_addr)?;
        self.entries[index as usize]
    }

    /// Removes `identity`, returning the removed entry.
    pub fn remove(&mut self, identity: Eui64) -> Option<CacheEntry> {
        let index = self.by_identity.remove(&identity)?;
        let entry = self.entries[index as usize].take()?;
        self.unindex_net(entry.net_addr, index);
        let _ = self.free.push(index);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter().flatten()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn index_net(&mut self, net_addr: NetAddr, index: u8) {
        let _ = self.by_net.insert(net_addr, index);
    }

    /// Drops the `by_net` key only if it still points at `index`.
    fn unindex_net(&mut self, net_addr: NetAddr, index: u8) {
        if self.by_net.get(&net_addr) == Some(&index) {
            self.by_net.remove(&net_addr);
        }
    }
}
