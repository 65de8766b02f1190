//! # Buffered Store
//!
//! ```text
//!  put ──▶ [ write buffer: 16 × (key, ≤512 B) ] ──flush──▶ StorageBackend
//!                 ▲                                           │
//!  get ───────────┴── buffer first, then backend ◀────────────┘
//! ```
//!
//! A put for a key already buffered overwrites it in place. A put that
//! finds the buffer full flushes first. `flush` emits `PersistFlushed` with
//! the number of entries written; entries that fail to write stay buffered.

use crate::domain::{validate_key, PersistError, PersistKey, SCHEMA_KEY};
use crate::ports::{KeyBlobStore, StorageBackend};
use gw_01_fibre_scheduler::FibreContext;
use heapless::Vec as HeaplessVec;
use parking_lot::Mutex;
use serde::Serialize;
use shared_bus::{Envelope, EventPublisher, EventType, PersistFlushed};
use shared_types::limits::{PERSIST_VALUE_MAX, PERSIST_WRITE_BUFFER};
use shared_types::{Clock, ErrorKind, Tick};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Envelope `source` stamped on `PersistFlushed`.
pub const PERSIST_SOURCE_ID: u8 = 2;

/// Store counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistStats {
    /// Entries currently waiting in the buffer.
    pub writes_buffered: usize,
    /// Entries written through to the backend.
    pub total_writes: u64,
    pub total_reads: u64,
    pub last_flush_tick: Tick,
    pub last_error: Option<ErrorKind>,
}

struct BufferedWrite {
    key: PersistKey,
    value: HeaplessVec<u8, PERSIST_VALUE_MAX>,
}

struct StoreState<B> {
    backend: B,
    buffer: HeaplessVec<BufferedWrite, PERSIST_WRITE_BUFFER>,
    stats: PersistStats,
    schema_version: u32,
}

impl<B: StorageBackend> StoreState<B> {
    fn buffered(&self, key: &str) -> Option<usize> {
        self.buffer.iter().position(|w| w.key.as_str() == key)
    }

    /// Writes every buffered entry; failures stay buffered.
    fn flush(&mut self, now: Tick) -> (usize, Option<PersistError>) {
        let mut written = 0;
        let mut failure = None;
        let mut index = 0;
        while index < self.buffer.len() {
            let entry = &self.buffer[index];
            match self.backend.write(&entry.key, &entry.value) {
                Ok(()) => {
                    self.buffer.swap_remove(index);
                    written += 1;
                }
                Err(err) => {
                    error!(key = %entry.key, error = %err, "Failed to flush");
                    self.stats.last_error = Some(err.kind());
                    failure = Some(err);
                    index += 1;
                }
            }
        }
        self.stats.total_writes += written as u64;
        self.stats.writes_buffered = self.buffer.len();
        if written > 0 {
            self.stats.last_flush_tick = now;
        }
        (written, failure)
    }
}

struct Shared<B> {
    state: Mutex<StoreState<B>>,
    clock: Arc<dyn Clock>,
    bus: Option<Arc<dyn EventPublisher>>,
    flush_interval: Duration,
}

/// Buffered key/blob store over a [`StorageBackend`].
///
/// Cloning yields another handle to the same store.
pub struct BufferedStore<B> {
    shared: Arc<Shared<B>>,
}

impl<B> Clone for BufferedStore<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Configures a [`BufferedStore`] before any handle to it exists.
pub struct StoreBuilder<B> {
    shared: Shared<B>,
}

impl<B: StorageBackend> StoreBuilder<B> {
    /// Announces flushes on `bus`.
    #[must_use]
    pub fn with_bus(mut self, bus: Arc<dyn EventPublisher>) -> Self {
        self.shared.bus = Some(bus);
        self
    }

    /// Sets the flush fibre period.
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.shared.flush_interval = interval;
        self
    }

    pub fn build(self) -> BufferedStore<B> {
        BufferedStore {
            shared: Arc::new(self.shared),
        }
    }
}

impl<B: StorageBackend> BufferedStore<B> {
    /// Loads the schema version and returns a builder for the store.
    ///
    /// # Errors
    ///
    /// `Io` when the backend cannot be read.
    pub fn builder(
        backend: B,
        clock: Arc<dyn Clock>,
    ) -> Result<StoreBuilder<B>, PersistError> {
        let schema_version = backend
            .read(SCHEMA_KEY)?
            .and_then(|bytes| bytes.get(..4).and_then(|b| b.try_into().ok()))
            .map_or(0, u32::from_le_bytes);
        info!(schema_version, "Persistence initialized");
        Ok(StoreBuilder {
            shared: Shared {
                state: Mutex::new(StoreState {
                    backend,
                    buffer: HeaplessVec::new(),
                    stats: PersistStats::default(),
                    schema_version,
                }),
                clock,
                bus: None,
                flush_interval: Duration::from_millis(u64::from(
                    shared_types::limits::PERSIST_FLUSH_MS,
                )),
            },
        })
    }

    /// Opens a store with no bus and the default flush interval.
    ///
    /// # Errors
    ///
    /// `Io` when the backend cannot be read.
    pub fn open(backend: B, clock: Arc<dyn Clock>) -> Result<Self, PersistError> {
        Ok(Self::builder(backend, clock)?.build())
    }

    pub fn flush_interval(&self) -> Duration {
        self.shared.flush_interval
    }

    pub fn put(&self, key: &str, value: &[u8]) -> Result<(), PersistError> {
        let key = validate_key(key)?;
        let value: HeaplessVec<u8, PERSIST_VALUE_MAX> =
            HeaplessVec::from_slice(value).map_err(|()| PersistError::ValueTooLarge {
                key: key.to_string(),
                len: value.len(),
                max: PERSIST_VALUE_MAX,
            })?;

        let mut flushed = 0;
        {
            let mut state = self.shared.state.lock();
            if let Some(index) = state.buffered(&key) {
                state.buffer[index].value = value;
                trace!(key = %key, "Buffered write replaced");
                return Ok(());
            }
            if state.buffer.is_full() {
                debug!("Write buffer full, flushing");
                let (written, failure) = state.flush(self.shared.clock.now());
                flushed = written;
                if state.buffer.is_full() {
                    return Err(failure.unwrap_or(PersistError::BufferFull {
                        capacity: PERSIST_WRITE_BUFFER,
                    }));
                }
            }
            let len = value.len();
            if state.buffer.push(BufferedWrite { key, value }).is_err() {
                return Err(PersistError::BufferFull {
                    capacity: PERSIST_WRITE_BUFFER,
                });
            }
            state.stats.writes_buffered = state.buffer.len();
            trace!(bytes = len, "Buffered write");
        }
        self.announce(flushed);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Vec<u8>, PersistError> {
        let key = validate_key(key)?;
        let mut state = self.shared.state.lock();
        state.stats.total_reads += 1;
        if let Some(index) = state.buffered(&key) {
            return Ok(state.buffer[index].value.to_vec());
        }
        state
            .backend
            .read(&key)?
            .ok_or_else(|| PersistError::NotFound(key.to_string()))
    }

    /// Removes `key` from the buffer and the backend.
    pub fn delete(&self, key: &str) -> Result<(), PersistError> {
        let key = validate_key(key)?;
        let mut state = self.shared.state.lock();
        if let Some(index) = state.buffered(&key) {
            state.buffer.swap_remove(index);
            state.stats.writes_buffered = state.buffer.len();
        }
        state.backend.remove(&key)
    }

    pub fn exists(&self, key: &str) -> bool {
        let Ok(key) = validate_key(key) else {
            return false;
        };
        let state = self.shared.state.lock();
        state.buffered(&key).is_some() || state.backend.contains(&key).unwrap_or(false)
    }

    /// Writes the buffer through and emits `PersistFlushed{count}`.
    ///
    /// # Errors
    ///
    /// The last write error; the entries that failed stay buffered.
    pub fn flush(&self) -> Result<usize, PersistError> {
        let (written, failure) = self.shared.state.lock().flush(self.shared.clock.now());
        self.announce(written);
        match failure {
            Some(err) => Err(err),
            None => Ok(written),
        }
    }

    /// Drops the buffer and every stored key, the schema version included.
    pub fn erase_all(&self) -> Result<(), PersistError> {
        let mut state = self.shared.state.lock();
        state.buffer.clear();
        state.stats.writes_buffered = 0;
        state.schema_version = 0;
        state.backend.clear()?;
        warn!("Persistent storage erased");
        Ok(())
    }

    pub fn schema_version(&self) -> u32 {
        self.shared.state.lock().schema_version
    }

    pub fn set_schema_version(&self, version: u32) -> Result<(), PersistError> {
        self.put(SCHEMA_KEY, &version.to_le_bytes())?;
        self.shared.state.lock().schema_version = version;
        info!(version, "Schema version set");
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    pub fn stats(&self) -> PersistStats {
        self.shared.state.lock().stats.clone()
    }

    fn announce(&self, written: usize) {
        if written == 0 {
            return;
        }
        debug!(written, "Flushed writes");
        let Some(bus) = &self.shared.bus else {
            return;
        };
        let payload = PersistFlushed {
            count: u16::try_from(written).unwrap_or(u16::MAX),
        };
        let envelope = Envelope::with_payload(EventType::PERSIST_FLUSHED, &payload)
            .from_source(PERSIST_SOURCE_ID);
        if bus.publish(envelope).is_err() {
            warn!("PersistFlushed event dropped");
        }
    }
}

impl<B: StorageBackend + 'static> BufferedStore<B> {
    /// Fibre body: flushes buffered writes every flush interval.
    pub async fn run_flush_loop(self, ctx: FibreContext) {
        let interval = self.shared.flush_interval;
        debug!(fibre = ctx.name(), ?interval, "Flush loop running");
        loop {
            ctx.sleep(interval).await;
            if self.pending() > 0 {
                if let Err(err) = self.flush() {
                    warn!(error = %err, "Periodic flush incomplete");
                }
            }
        }
    }
}

impl<B: StorageBackend> KeyBlobStore for BufferedStore<B> {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), PersistError> {
        Self::put(self, key, value)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, PersistError> {
        Self::get(self, key)
    }

    fn delete(&self, key: &str) -> Result<(), PersistError> {
        Self::delete(self, key)
    }

    fn exists(&self, key: &str) -> bool {
        Self::exists(self, key)
    }

    fn flush(&self) -> Result<usize, PersistError> {
        Self::flush(self)
    }
}

impl<B> std::fmt::Debug for BufferedStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedStore").finish_non_exhaustive()
    }
}
