use crate::domain::PersistError;
use crate::ports::StorageBackend;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory backend.
///
/// Clones share the same map, so a test can keep one to observe what a
/// store flushed.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), PersistError> {
        self.data.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        self.data.lock().remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.data.lock().contains_key(key))
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        self.data.lock().clear();
        Ok(())
    }
}
