use shared_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("value for {key} is {len} bytes (max {max})")]
    ValueTooLarge { key: String, len: usize, max: usize },

    #[error("key {0} not found")]
    NotFound(String),

    /// The write buffer is full and a flush could not drain it.
    #[error("write buffer full ({capacity} entries)")]
    BufferFull { capacity: usize },

    #[error("storage I/O failed for {key}: {message}")]
    Io { key: String, message: String },
}

impl PersistError {
    pub(crate) fn io(key: &str, err: &std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKey { .. } | Self::ValueTooLarge { .. } => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BufferFull { .. } => ErrorKind::ResourceExhausted,
            Self::Io { .. } => ErrorKind::Hardware,
        }
    }
}
