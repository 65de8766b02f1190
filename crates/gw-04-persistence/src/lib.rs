//! # Persistence
//!
//! Best-effort key/blob storage for the gateway: writes are buffered in a
//! bounded table and written through by a periodic flush fibre.
//!
//! | Limit | Value |
//! |-------|-------|
//! | key length | 32 bytes |
//! | value size | 512 bytes |
//! | write buffer | 16 entries |
//! | flush period | 5 000 ms |
//!
//! Backends: [`FileBackend`] (one `<key>.bin` per key) and
//! [`MemoryBackend`].

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FileBackend, MemoryBackend};
pub use domain::{validate_key, PersistConfig, PersistError, SCHEMA_KEY};
pub use ports::{KeyBlobStore, StorageBackend};
pub use service::{BufferedStore, PersistStats, StoreBuilder, PERSIST_SOURCE_ID};

/// Opens the backend selected by `config`.
///
/// # Errors
///
/// `Io` when the configured directory cannot be created.
pub fn open_backend(config: &PersistConfig) -> Result<Box<dyn StorageBackend>, PersistError> {
    Ok(match &config.dir {
        Some(dir) => Box::new(FileBackend::open(dir)?),
        None => Box::new(MemoryBackend::new()),
    })
}
