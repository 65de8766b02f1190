use crate::domain::PersistError;

/// Best-effort key/blob persistence.
///
/// Writes are buffered and reach the backend on `flush`. Nothing here is
/// transactional.
pub trait KeyBlobStore: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), PersistError>;

    /// # Errors
    ///
    /// `NotFound` when neither the buffer nor the backend hold `key`.
    fn get(&self, key: &str) -> Result<Vec<u8>, PersistError>;

    fn delete(&self, key: &str) -> Result<(), PersistError>;

    fn exists(&self, key: &str) -> bool;

    /// Writes buffered entries through. Returns how many were written.
    fn flush(&self) -> Result<usize, PersistError>;
}
