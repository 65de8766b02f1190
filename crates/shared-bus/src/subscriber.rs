//! # Event Subscriber
//!
//! Defines the consuming side of the event bus.

use crate::envelope::Envelope;
use crate::events::EventFilter;
use shared_types::ErrorKind;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by bus operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The ring buffer is full; the envelope was dropped and counted.
    #[error("event queue full")]
    QueueFull,

    /// Every subscription slot is in use.
    #[error("subscription table full")]
    TableFull,

    /// No subscription uses the given handler.
    #[error("handler not subscribed")]
    HandlerNotFound,
}

impl BusError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::QueueFull => ErrorKind::QueueFull,
            Self::TableFull => ErrorKind::ResourceExhausted,
            Self::HandlerNotFound => ErrorKind::NotFound,
        }
    }
}

/// Receives dispatched envelopes.
///
/// Handlers run synchronously inside `dispatch` on the dispatching fibre.
/// A handler may publish, subscribe or unsubscribe; it must not call
/// `dispatch` itself.
pub trait EventHandler: Send + Sync {
    fn handle(&self, envelope: &Envelope);
}

impl<F> EventHandler for F
where
    F: Fn(&Envelope) + Send + Sync,
{
    fn handle(&self, envelope: &Envelope) {
        self(envelope);
    }
}

/// One subscription table slot.
#[derive(Clone)]
pub(crate) struct Subscription {
    pub(crate) filter: EventFilter,
    pub(crate) handler: Arc<dyn EventHandler>,
}

impl Subscription {
    /// Handler identity is the address of the shared handler value.
    pub(crate) fn uses(&self, handler: &Arc<dyn EventHandler>) -> bool {
        same_handler(&self.handler, handler)
    }
}

pub(crate) fn same_handler(a: &Arc<dyn EventHandler>, b: &Arc<dyn EventHandler>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}
