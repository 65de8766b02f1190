use crate::domain::PersistError;

/// Durable medium behind the write buffer.
///
/// Keys reaching a backend are already validated.
pub trait StorageBackend: Send {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError>;

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), PersistError>;

    /// Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), PersistError>;

    fn contains(&self, key: &str) -> Result<bool, PersistError>;

    /// Removes every stored key.
    fn clear(&mut self) -> Result<(), PersistError>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), PersistError> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        (**self).remove(key)
    }

    fn contains(&self, key: &str) -> Result<bool, PersistError> {
        (**self).contains(key)
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        (**self).clear()
    }
}
