//! # Error Kinds
//!
//! The error taxonomy shared by every gateway crate. Each crate keeps its
//! own `thiserror` enum and maps it onto one of these kinds, so callers can
//! react to the *kind* of failure without depending on the crate that
//! produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of failure, independent of which crate reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ErrorKind {
    /// A fixed-capacity table is full (fibres, subscriptions, cache, pending).
    #[error("resource exhausted")]
    ResourceExhausted,

    /// Unknown identity, network address, handler or key.
    #[error("not found")]
    NotFound,

    /// The adapter lifecycle state forbids the operation.
    #[error("not ready")]
    NotReady,

    /// Malformed or out-of-range input.
    #[error("invalid argument")]
    InvalidArgument,

    /// A pending command expired with no hardware response.
    #[error("timeout")]
    Timeout,

    /// The event bus is at capacity; the envelope was dropped.
    #[error("queue full")]
    QueueFull,

    /// A one-shot initialisation was attempted twice.
    #[error("already initialized")]
    AlreadyInitialized,

    /// The radio stack or storage medium rejected the call.
    #[error("hardware failure")]
    Hardware,
}
