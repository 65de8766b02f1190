//! Scheduler error types.

use shared_types::ErrorKind;
use thiserror::Error;

/// Scheduler errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FibreError {
    /// The fibre table holds its maximum number of fibres.
    #[error("fibre table full ({max} fibres)")]
    TableFull { max: usize },

    /// The backing stack for a fibre could not be allocated.
    #[error("stack allocation of {stack_size} bytes failed for fibre '{name}': {reason}")]
    StackAllocation {
        name: String,
        stack_size: u32,
        reason: String,
    },

    /// `start` was called while the scheduler loop is already running.
    #[error("scheduler already running")]
    AlreadyRunning,

    /// Unknown fibre id.
    #[error("fibre {0} not found")]
    NotFound(u8),

    /// Configuration rejected.
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}

impl FibreError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::TableFull { .. } | Self::StackAllocation { .. } => ErrorKind::ResourceExhausted,
            Self::AlreadyRunning => ErrorKind::AlreadyInitialized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidConfig(_) => ErrorKind::InvalidArgument,
        }
    }
}
