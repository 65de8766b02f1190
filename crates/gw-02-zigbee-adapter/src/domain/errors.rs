//! Error types for the Zigbee adapter.

use super::lifecycle::AdapterState;
use shared_types::{ErrorKind, Eui64};
use thiserror::Error;

/// Errors returned by the adapter command surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZigbeeError {
    /// The lifecycle state forbids the operation.
    #[error("adapter not ready (state: {state})")]
    NotReady { state: AdapterState },

    /// `initialize` was called outside `Uninitialized`.
    #[error("adapter already initialized (state: {state})")]
    AlreadyInitialized { state: AdapterState },

    /// No address-cache entry for the identity.
    #[error("device {0} not in address cache")]
    DeviceNotFound(Eui64),

    /// Every pending-command slot is in use.
    #[error("pending command table full ({capacity} outstanding)")]
    PendingFull { capacity: usize },

    /// Address cache full.
    #[error("address cache full ({capacity} entries)")]
    CacheFull { capacity: usize },

    /// Malformed or out-of-range input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The radio stack rejected the call.
    #[error("radio error: {0}")]
    Radio(String),
}

impl ZigbeeError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotReady { .. } => ErrorKind::NotReady,
            Self::AlreadyInitialized { .. } => ErrorKind::AlreadyInitialized,
            Self::DeviceNotFound(_) => ErrorKind::NotFound,
            Self::PendingFull { .. } | Self::CacheFull { .. } => ErrorKind::ResourceExhausted,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Radio(_) => ErrorKind::Hardware,
        }
    }
}

/// Address-cache errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("identity 0 is not a valid device")]
    InvalidIdentity,
    #[error("address cache full ({capacity} entries)")]
    Full { capacity: usize },
}

impl From<CacheError> for ZigbeeError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidIdentity => Self::InvalidArgument(err.to_string()),
            CacheError::Full { capacity } => Self::CacheFull { capacity },
        }
    }
}

/// Pending-command table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PendingError {
    #[error("pending command table full ({capacity} outstanding)")]
    Full { capacity: usize },
}

impl From<PendingError> for ZigbeeError {
    fn from(err: PendingError) -> Self {
        match err {
            PendingError::Full { capacity } => Self::PendingFull { capacity },
        }
    }
}
