use serde::{Deserialize, Serialize};
use shared_types::limits::PERSIST_FLUSH_MS;
use std::path::PathBuf;

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Directory of `<key>.bin` files. `None` keeps everything in memory.
    pub dir: Option<PathBuf>,
    /// Period of the flush fibre.
    pub flush_interval_ms: u32,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from("/tmp/bridge_persist")),
            flush_interval_ms: PERSIST_FLUSH_MS,
        }
    }
}

impl PersistConfig {
    /// In-memory storage.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            dir: None,
            ..Self::default()
        }
    }
}
